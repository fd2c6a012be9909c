//! Webhook forwarding of inbound email events
//!
//! One JSON POST per event, no retry and no delivery confirmation. The
//! inbound path treats a failed forward as log-and-move-on.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

/// Flat record describing one inbound email, POSTed to the webhook
#[derive(Debug, Clone, Serialize)]
pub struct InboundEmailEvent {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub date: DateTime<Utc>,
    pub raw: String,
}

/// Webhook delivery error, consumed only by the watcher's logger
#[derive(Error, Debug)]
pub enum ForwardError {
    #[error("webhook request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webhook returned status {0}")]
    Status(reqwest::StatusCode),
}

/// Posts inbound email events to the configured automation webhook
#[derive(Debug, Clone)]
pub struct WebhookForwarder {
    client: reqwest::Client,
    url: String,
}

impl WebhookForwarder {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    /// Serialize the event and POST it once.
    ///
    /// Never panics; transport errors and non-2xx statuses come back as
    /// [`ForwardError`] for the caller to log.
    pub async fn forward(&self, event: &InboundEmailEvent) -> Result<(), ForwardError> {
        let response = self.client.post(&self.url).json(event).send().await?;

        if !response.status().is_success() {
            return Err(ForwardError::Status(response.status()));
        }

        debug!("Forwarded inbound email: {}", event.subject);
        Ok(())
    }
}
