mod email;
mod pushover;
pub mod templates;

pub use email::EmailNotifier;
pub use pushover::PushoverNotifier;

use crate::config::Transport;
use crate::domain::Listing;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum NotifyError {
    /// Could not reach the service at all. Ends the current poll cycle.
    #[error("Connection failed: {0}")]
    Connection(String),
    /// The service answered but turned the message away entirely: bad
    /// credentials, session refused, every recipient refused. Ends the cycle.
    #[error("Not delivered: {0}")]
    Undelivered(String),
    /// Some recipients were refused, at least one got the message.
    #[error("Rejected: {0}")]
    Rejected(String),
    #[error("Notifier config error: {0}")]
    Config(String),
}

impl NotifyError {
    /// True when the listing reached someone and may be marked seen.
    pub fn is_partial(&self) -> bool {
        matches!(self, NotifyError::Rejected(_))
    }
}

pub trait Notifier {
    fn notify(&self, listing: &Listing) -> Result<(), NotifyError>;
    fn name(&self) -> &str;
}

/// Writes notifications to the log instead of sending them.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, listing: &Listing) -> Result<(), NotifyError> {
        info!("[dry run] {}", templates::listing_line(listing).into_string());
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

/// Builds the notifier for the configured transport.
pub fn from_transport(transport: &Transport) -> Result<Box<dyn Notifier>, NotifyError> {
    match transport {
        Transport::Pushover { api_token, user_key } => Ok(Box::new(PushoverNotifier::new(
            api_token.clone(),
            user_key.clone(),
        )?)),
        Transport::Email {
            from_email,
            password,
            to_email,
            smtp_host,
            smtp_port,
        } => Ok(Box::new(EmailNotifier::new(
            from_email,
            password,
            to_email,
            smtp_host,
            *smtp_port,
        )?)),
    }
}
