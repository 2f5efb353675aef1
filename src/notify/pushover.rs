// src/notify/pushover.rs

use crate::domain::Listing;
use crate::notify::{templates, Notifier, NotifyError};
use reqwest::blocking::Client;
use std::time::Duration;

const PUSHOVER_URL: &str = "https://api.pushover.net/1/messages.json";

pub struct PushoverNotifier {
    api_token: String,
    user_key: String,
    endpoint: String,
    client: Client,
}

impl PushoverNotifier {
    pub fn new(api_token: String, user_key: String) -> Result<Self, NotifyError> {
        Self::with_endpoint(api_token, user_key, PUSHOVER_URL)
    }

    pub fn with_endpoint(
        api_token: String,
        user_key: String,
        endpoint: impl Into<String>,
    ) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| NotifyError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_token,
            user_key,
            endpoint: endpoint.into(),
            client,
        })
    }

    fn form<'a>(&'a self, message: &'a str) -> [(&'static str, &'a str); 5] {
        [
            ("token", self.api_token.as_str()),
            ("user", self.user_key.as_str()),
            ("title", templates::TITLE),
            ("message", message),
            ("html", "1"),
        ]
    }
}

impl Notifier for PushoverNotifier {
    fn notify(&self, listing: &Listing) -> Result<(), NotifyError> {
        let message = templates::listing_line(listing).into_string();

        let resp = self
            .client
            .post(&self.endpoint)
            .form(&self.form(&message))
            .send()
            .map_err(|e| NotifyError::Connection(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().unwrap_or_else(|_| "(no body)".to_string());
            return Err(NotifyError::Undelivered(format!(
                "Pushover API error: {status} - {body}"
            )));
        }

        Ok(())
    }

    fn name(&self) -> &str {
        "pushover"
    }
}
