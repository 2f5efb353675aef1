use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },
    #[error("Blocked by site: {0}")]
    Blocked(String),
    #[error("HTML parse error: {0}")]
    HtmlParse(String),
    #[error("Bad search parameters: {0}")]
    Query(String),
}
