// src/config.rs

use crate::domain::GeoPoint;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_RUN_INTERVAL_MINUTES: u64 = 30;
pub const DEFAULT_RESULT_LIMIT: usize = 1000;
pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// A named rectangle given as two `[lon, lat]` corners.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingBox {
    pub name: String,
    pub corners: [[f64; 2]; 2],
}

impl BoundingBox {
    pub fn new(name: impl Into<String>, corners: [[f64; 2]; 2]) -> Self {
        Self {
            name: name.into(),
            corners,
        }
    }

    /// Corner axis 0 is longitude, axis 1 is latitude. Bounds are inclusive.
    pub fn contains(&self, point: &GeoPoint) -> bool {
        let [low, high] = self.corners;
        (low[0] <= point.lon && point.lon <= high[0]) && (low[1] <= point.lat && point.lat <= high[1])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transport {
    Pushover {
        api_token: String,
        user_key: String,
    },
    Email {
        from_email: String,
        password: String,
        to_email: Vec<String>,
        smtp_host: String,
        smtp_port: u16,
    },
}

/// Search criteria and credentials. Built once at startup and never changed.
#[derive(Debug, Clone)]
pub struct Config {
    pub bed: u32,
    pub min_price: Option<f64>,
    pub max_price: f64,
    /// Kept in the order the file declares them; the first match wins.
    pub bounding_boxes: Vec<BoundingBox>,
    pub craigslist_site: String,
    pub craigslist_area: Option<String>,
    pub run_interval: Duration,
    pub result_limit: usize,
    pub transport: Option<Transport>,
}

// On-disk shape. Key names follow the config files people already have.
#[derive(Debug, Deserialize)]
struct RawConfig {
    bed: u32,
    max_price: f64,
    min_price: Option<f64>,
    #[serde(default)]
    bounding_boxes: Map<String, Value>,
    craigslist_site: String,
    craigslist_area: Option<String>,
    run_interval: Option<u64>,
    result_limit: Option<usize>,

    #[serde(rename = "pushover_API_token")]
    pushover_api_token: Option<String>,
    pushover_user_key: Option<String>,

    from_email: Option<String>,
    password: Option<String>,
    #[serde(default)]
    to_email: Vec<String>,
    smtp_host: Option<String>,
    smtp_port: Option<u16>,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(text)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        if let Some(min) = raw.min_price {
            if min > raw.max_price {
                return Err(ConfigError::Invalid(format!(
                    "min_price ({min}) is greater than max_price ({})",
                    raw.max_price
                )));
            }
        }

        if raw.craigslist_site.trim().is_empty() {
            return Err(ConfigError::Invalid("craigslist_site is empty".into()));
        }

        let minutes = raw.run_interval.unwrap_or(DEFAULT_RUN_INTERVAL_MINUTES);
        if minutes == 0 {
            return Err(ConfigError::Invalid("run_interval must be at least 1 minute".into()));
        }
        let run_interval = minutes
            .checked_mul(60)
            .map(Duration::from_secs)
            .ok_or_else(|| ConfigError::Invalid(format!("run_interval of {minutes} minutes is too long")))?;

        let result_limit = raw.result_limit.unwrap_or(DEFAULT_RESULT_LIMIT);
        if result_limit == 0 {
            return Err(ConfigError::Invalid("result_limit must be positive".into()));
        }

        let mut bounding_boxes = Vec::with_capacity(raw.bounding_boxes.len());
        for (name, coords) in raw.bounding_boxes {
            let corners: [[f64; 2]; 2] = serde_json::from_value(coords).map_err(|e| {
                ConfigError::Invalid(format!(
                    "bounding box '{name}' must be [[lon, lat], [lon, lat]]: {e}"
                ))
            })?;
            bounding_boxes.push(BoundingBox::new(name, corners));
        }

        let transport = Self::transport_from_raw(
            raw.pushover_api_token,
            raw.pushover_user_key,
            raw.from_email,
            raw.password,
            raw.to_email,
            raw.smtp_host,
            raw.smtp_port,
        )?;

        Ok(Self {
            bed: raw.bed,
            min_price: raw.min_price,
            max_price: raw.max_price,
            bounding_boxes,
            craigslist_site: raw.craigslist_site,
            craigslist_area: raw.craigslist_area.filter(|a| !a.trim().is_empty()),
            run_interval,
            result_limit,
            transport,
        })
    }

    /// Pushover wins when both sets of credentials are present.
    #[allow(clippy::too_many_arguments)]
    fn transport_from_raw(
        api_token: Option<String>,
        user_key: Option<String>,
        from_email: Option<String>,
        password: Option<String>,
        to_email: Vec<String>,
        smtp_host: Option<String>,
        smtp_port: Option<u16>,
    ) -> Result<Option<Transport>, ConfigError> {
        match (api_token, user_key) {
            (Some(api_token), Some(user_key)) => {
                return Ok(Some(Transport::Pushover { api_token, user_key }));
            }
            (Some(_), None) | (None, Some(_)) => {
                return Err(ConfigError::Invalid(
                    "pushover_API_token and pushover_user_key must be set together".into(),
                ));
            }
            (None, None) => {}
        }

        match (from_email, password) {
            (Some(from_email), Some(password)) => {
                if to_email.is_empty() {
                    return Err(ConfigError::Invalid(
                        "to_email needs at least one recipient".into(),
                    ));
                }
                Ok(Some(Transport::Email {
                    from_email,
                    password,
                    to_email,
                    smtp_host: smtp_host.unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string()),
                    smtp_port: smtp_port.unwrap_or(DEFAULT_SMTP_PORT),
                }))
            }
            (Some(_), None) | (None, Some(_)) => Err(ConfigError::Invalid(
                "from_email and password must be set together".into(),
            )),
            (None, None) => Ok(None),
        }
    }
}
