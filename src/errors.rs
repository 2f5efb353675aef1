// errors.rs
use crate::notify::NotifyError;
use crate::scraper::ScraperError;
use crate::sink::SinkError;
use thiserror::Error;

/// Anything that can cut a poll cycle short. None of these stop the loop.
#[derive(Debug, Error)]
pub enum FinderError {
    #[error("Fetching listings failed: {0}")]
    Source(#[from] ScraperError),
    #[error("Notification failed: {0}")]
    Notify(#[from] NotifyError),
    #[error("Writing listings failed: {0}")]
    Sink(#[from] SinkError),
}
