use super::{Envelope, NotificationSink};
use crate::error::{Result, WatchError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;

/// Slack incoming-webhook sink.
///
/// POSTs the envelope as JSON. Slack answers 200 with body `ok` on
/// success; any other status is a delivery failure.
pub struct SlackWebhook {
    webhook_url: String,
    http_client: Client,
}

impl SlackWebhook {
    pub fn new(webhook_url: String) -> Self {
        Self {
            webhook_url,
            http_client: Client::new(),
        }
    }
}

#[async_trait]
impl NotificationSink for SlackWebhook {
    fn name(&self) -> &str {
        "slack"
    }

    async fn deliver(&self, envelope: &Envelope) -> Result<()> {
        let response = self
            .http_client
            .post(&self.webhook_url)
            .header("Content-Type", "application/json")
            .json(envelope)
            .send()
            .await
            .map_err(|e| WatchError::DeliveryError {
                status: None,
                body: format!("Failed to send webhook request: {}", e),
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read body>".to_string());
            return Err(WatchError::DeliveryError {
                status: Some(status.as_u16()),
                body,
            });
        }

        debug!(blocks = envelope.blocks.len(), channel = %envelope.channel, "Sent message to Slack");
        Ok(())
    }
}
