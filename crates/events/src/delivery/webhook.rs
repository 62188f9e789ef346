//! IM bot webhook delivery with exponential-backoff retry.
//!
//! [`WebhookNotifier`] posts each [`Notification`] as an interactive card
//! to a chat bot endpoint. Failed attempts are retried with backoff
//! (1 s, 2 s, 4 s by default) before a final attempt.

use std::time::Duration;

use async_trait::async_trait;
use hrflow_core::error::CoreError;
use hrflow_core::workflow::sink::{Notification, NotificationSink};

const DEFAULT_RETRY_DELAYS: [Duration; 3] = [
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(4),
];

/// HTTP request timeout for a single delivery attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote server returned a non-2xx status code.
    #[error("Webhook returned HTTP {0}")]
    HttpStatus(u16),
}

// ---------------------------------------------------------------------------
// Card payload
// ---------------------------------------------------------------------------

/// Interactive card body understood by common IM bot webhooks.
pub fn card_payload(notification: &Notification) -> serde_json::Value {
    serde_json::json!({
        "msg_type": "interactive",
        "card": {
            "header": {
                "title": { "tag": "plain_text", "content": notification.title },
            },
            "elements": [
                { "tag": "markdown", "content": notification.body },
                {
                    "tag": "note",
                    "elements": [{
                        "tag": "plain_text",
                        "content": format!(
                            "{} #{}",
                            notification.workflow_name, notification.workflow_instance_id
                        ),
                    }],
                },
            ],
        },
        "recipient_id": notification.recipient_id,
        "step_id": notification.step_id,
    })
}

// ---------------------------------------------------------------------------
// WebhookNotifier
// ---------------------------------------------------------------------------

pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
    retry_delays: Vec<Duration>,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Result<Self, WebhookError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
            retry_delays: DEFAULT_RETRY_DELAYS.to_vec(),
        })
    }

    /// Override the backoff schedule. An empty schedule means a single attempt.
    pub fn with_retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.retry_delays = delays;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Deliver with retry. Returns `Ok(())` on the first successful attempt.
    pub async fn deliver(&self, notification: &Notification) -> Result<(), WebhookError> {
        let payload = card_payload(notification);

        for (attempt, delay) in self.retry_delays.iter().enumerate() {
            match self.try_send(&payload).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        url = %self.url,
                        error = %e,
                        "Webhook delivery attempt failed, retrying"
                    );
                    tokio::time::sleep(*delay).await;
                }
            }
        }

        match self.try_send(&payload).await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::error!(url = %self.url, error = %e, "Webhook delivery failed after all retries");
                Err(e)
            }
        }
    }

    async fn try_send(&self, payload: &serde_json::Value) -> Result<(), WebhookError> {
        let response = self.client.post(&self.url).json(payload).send().await?;
        if !response.status().is_success() {
            return Err(WebhookError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for WebhookNotifier {
    async fn notify(&self, notification: Notification) -> Result<(), CoreError> {
        self.deliver(&notification)
            .await
            .map_err(|e| CoreError::Internal(format!("Notification delivery failed: {e}")))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
