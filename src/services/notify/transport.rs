//! Notification delivery transports
//!
//! A transport takes one claimed outbox message and pushes it to the
//! outside world. The webhook transport posts the message to a
//! configured endpoint; the log transport is the fallback when no
//! endpoint is configured.

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;
use ureq::Agent;

use crate::errors::AfflinkError;
use crate::storage::OutboxMessage;

/// Webhook delivery timeout
const WEBHOOK_TIMEOUT_SECS: u64 = 5;

static HTTP_AGENT: OnceLock<Agent> = OnceLock::new();

fn get_agent() -> &'static Agent {
    HTTP_AGENT.get_or_init(|| {
        Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(WEBHOOK_TIMEOUT_SECS)))
            .build()
            .into()
    })
}

/// Delivery channel for outbox messages
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    /// Deliver one message; an error schedules a retry
    async fn deliver(&self, message: &OutboxMessage) -> Result<(), AfflinkError>;

    /// Transport name for logs
    fn name(&self) -> &'static str;
}

/// Posts each message as JSON to a webhook endpoint
pub struct WebhookTransport {
    webhook_url: String,
}

impl WebhookTransport {
    pub fn new(webhook_url: &str) -> Self {
        Self {
            webhook_url: webhook_url.to_string(),
        }
    }

    /// Blocking POST, runs inside spawn_blocking
    fn post_sync(url: String, body: serde_json::Value) -> Result<(), AfflinkError> {
        let agent = get_agent();
        agent
            .post(&url)
            .send_json(&body)
            .map_err(|e| AfflinkError::external_service(format!("webhook delivery failed: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl NotificationTransport for WebhookTransport {
    async fn deliver(&self, message: &OutboxMessage) -> Result<(), AfflinkError> {
        let url = self.webhook_url.clone();
        let body = serde_json::to_value(message).map_err(|e| {
            AfflinkError::external_service(format!("notification serialization failed: {}", e))
        })?;

        tokio::task::spawn_blocking(move || Self::post_sync(url, body))
            .await
            .map_err(|e| {
                AfflinkError::external_service(format!("webhook task join failed: {}", e))
            })?
    }

    fn name(&self) -> &'static str {
        "Webhook"
    }
}

/// Logs each message instead of delivering it anywhere
pub struct LogTransport;

#[async_trait]
impl NotificationTransport for LogTransport {
    async fn deliver(&self, message: &OutboxMessage) -> Result<(), AfflinkError> {
        info!(
            "Notification for {}: {} {}",
            message.recipient_user_id, message.kind, message.payload
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "Log"
    }
}
