// src/sink.rs

use crate::domain::Listing;
use csv::WriterBuilder;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const HEADER: [&str; 4] = ["name", "price", "location", "url"];

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Tab-separated log of every listing we accepted.
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    /// Truncates `path` and writes the header row.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let path = path.into();
        let file = File::create(&path).map_err(|source| io_err(&path, source))?;

        let mut writer = WriterBuilder::new().delimiter(b'\t').from_writer(file);
        writer.write_record(HEADER)?;
        writer.flush().map_err(|source| io_err(&path, source))?;

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// One row per listing: name, price, neighborhood, url.
    pub fn append(&self, listings: &[Listing]) -> Result<(), SinkError> {
        if listings.is_empty() {
            return Ok(());
        }

        let file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|source| io_err(&self.path, source))?;

        let mut writer = WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .from_writer(file);

        for apt in listings {
            writer.write_record([
                apt.name.as_str(),
                apt.display_price().as_str(),
                apt.neighborhood_label.as_str(),
                apt.url.as_str(),
            ])?;
        }
        writer.flush().map_err(|source| io_err(&self.path, source))?;
        Ok(())
    }
}

fn io_err(path: &Path, source: std::io::Error) -> SinkError {
    SinkError::Io {
        path: path.display().to_string(),
        source,
    }
}
