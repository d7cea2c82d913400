//! Outbox dispatcher
//!
//! Polls the notification outbox for due messages and hands them to a
//! transport. Failed deliveries are rescheduled with exponential
//! backoff until the attempt cap, then parked permanently.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::transport::NotificationTransport;
use crate::config::get_config;
use crate::storage::SeaOrmStorage;

/// Background dispatcher for the notification outbox
pub struct OutboxDispatcher {
    storage: Arc<SeaOrmStorage>,
    transport: Arc<dyn NotificationTransport>,
    poll_interval: Duration,
    batch_size: u64,
    max_attempts: i32,
    retry_base_secs: i64,
}

impl OutboxDispatcher {
    pub fn new(storage: Arc<SeaOrmStorage>, transport: Arc<dyn NotificationTransport>) -> Self {
        let notify = &get_config().notify;
        Self {
            storage,
            transport,
            poll_interval: Duration::from_secs(notify.poll_interval_secs),
            batch_size: notify.batch_size,
            max_attempts: notify.max_attempts,
            retry_base_secs: notify.retry_base_secs,
        }
    }

    /// Poll loop, runs until the task is dropped at shutdown
    pub async fn run(&self) {
        info!(
            "OutboxDispatcher: started with {} transport (poll every {:?})",
            self.transport.name(),
            self.poll_interval
        );
        loop {
            tokio::time::sleep(self.poll_interval).await;
            self.dispatch_once().await;
        }
    }

    /// Deliver one batch of due messages; returns how many were delivered
    pub async fn dispatch_once(&self) -> usize {
        let now = Utc::now();
        let messages = match self.storage.claim_due_messages(now, self.batch_size).await {
            Ok(messages) => messages,
            Err(e) => {
                warn!("OutboxDispatcher: failed to claim messages: {}", e);
                return 0;
            }
        };
        if messages.is_empty() {
            return 0;
        }

        debug!("OutboxDispatcher: claimed {} due messages", messages.len());
        let mut delivered = 0;

        for message in &messages {
            match self.transport.deliver(message).await {
                Ok(()) => {
                    if let Err(e) = self.storage.mark_delivered(message.id).await {
                        warn!(
                            "OutboxDispatcher: delivered message {} but could not mark it: {}",
                            message.id, e
                        );
                    } else {
                        delivered += 1;
                    }
                }
                Err(e) => {
                    let give_up = message.attempts + 1 >= self.max_attempts;
                    let backoff_secs = self
                        .retry_base_secs
                        .saturating_mul(1i64 << message.attempts.clamp(0, 32));
                    let next_attempt_at = now + chrono::Duration::seconds(backoff_secs);

                    if give_up {
                        warn!(
                            "OutboxDispatcher: message {} failed permanently after {} attempts: {}",
                            message.id,
                            message.attempts + 1,
                            e
                        );
                    } else {
                        debug!(
                            "OutboxDispatcher: message {} failed, retrying in {}s: {}",
                            message.id, backoff_secs, e
                        );
                    }

                    if let Err(mark_err) = self
                        .storage
                        .mark_failed(message.id, &e.to_string(), next_attempt_at, give_up)
                        .await
                    {
                        warn!(
                            "OutboxDispatcher: could not record failure for message {}: {}",
                            message.id, mark_err
                        );
                    }
                }
            }
        }

        delivered
    }
}
