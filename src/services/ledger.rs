//! Order status event service
//!
//! Drives the commission state machine off upstream order lifecycle
//! events and fans out buyer/affiliate notifications through the outbox.

use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};

use crate::errors::AfflinkError;
use crate::storage::{CancelOutcome, CommissionStatus, OrderStatus, OutboxIntent, SeaOrmStorage};

/// Upstream order status change event
#[derive(Debug, Clone)]
pub struct OrderStatusEvent {
    pub order_id: String,
    pub old_status: Option<String>,
    pub new_status: String,
    pub buyer_user_id: String,
    pub listing_title: Option<String>,
}

/// Result of applying an order status event
#[derive(Debug, Clone)]
pub struct OrderStatusResult {
    pub order_id: String,
    pub new_status: OrderStatus,
    pub notifications_sent: u32,
}

/// Service for order lifecycle events
pub struct OrderEventService {
    storage: Arc<SeaOrmStorage>,
}

impl OrderEventService {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self { storage }
    }

    /// Apply an order status change
    ///
    /// approved confirms the pending commission, canceled reverses the
    /// credit. Every event notifies the buyer; ledger-affecting events
    /// additionally notify the affiliate.
    pub async fn apply_order_status(
        &self,
        event: OrderStatusEvent,
    ) -> Result<OrderStatusResult, AfflinkError> {
        if event.order_id.is_empty() || event.buyer_user_id.is_empty() {
            return Err(AfflinkError::validation(
                "order_id and buyer_user_id are required",
            ));
        }

        let new_status: OrderStatus = event.new_status.parse().map_err(|_| {
            AfflinkError::validation(format!("unknown order status: {}", event.new_status))
        })?;

        self.storage
            .update_order_status(&event.order_id, new_status)
            .await?;

        let mut notifications_sent: u32 = 0;

        match new_status {
            OrderStatus::Approved => {
                if self.confirm_commission(&event.order_id).await? {
                    notifications_sent += 1;
                }
            }
            OrderStatus::Canceled => {
                if self.cancel_commission(&event.order_id).await? {
                    notifications_sent += 1;
                }
            }
            _ => {}
        }

        // The buyer hears about every status change
        let buyer_notice = OutboxIntent::new(
            "order_status",
            &event.buyer_user_id,
            json!({
                "order_id": event.order_id,
                "old_status": event.old_status,
                "new_status": new_status,
                "listing_title": event.listing_title,
            }),
        );
        self.storage.enqueue_notification(&buyer_notice).await?;
        notifications_sent += 1;

        info!(
            "OrderEventService: {} -> {} ({} notifications)",
            event.order_id, new_status, notifications_sent
        );
        Ok(OrderStatusResult {
            order_id: event.order_id,
            new_status,
            notifications_sent,
        })
    }

    /// Confirm the order's pending commission, if any. Returns true when a
    /// notification was written.
    async fn confirm_commission(&self, order_id: &str) -> Result<bool, AfflinkError> {
        let Some(commission) = self.storage.find_commission_by_order(order_id).await? else {
            return Ok(false);
        };
        if commission.status != CommissionStatus::Pending {
            return Ok(false);
        }

        let affiliate = self
            .storage
            .get_affiliate(&commission.affiliate_id)
            .await?
            .ok_or_else(|| {
                AfflinkError::not_found(format!(
                    "affiliate not found: {}",
                    commission.affiliate_id
                ))
            })?;

        let notice = OutboxIntent::new(
            "commission_confirmed",
            &affiliate.user_id,
            json!({
                "order_id": order_id,
                "commission_amount": commission.commission_amount,
            }),
        )
        .with_idempotency_key(format!("commission_confirmed:{}", order_id));

        Ok(self
            .storage
            .confirm_commission_for_order(order_id, &notice)
            .await?
            .is_some())
    }

    /// Cancel the order's commission and reverse the credit. Returns true
    /// when a notification was written.
    async fn cancel_commission(&self, order_id: &str) -> Result<bool, AfflinkError> {
        let Some(commission) = self.storage.find_commission_by_order(order_id).await? else {
            return Ok(false);
        };
        if commission.status.is_terminal() {
            if commission.status == CommissionStatus::Paid {
                warn!(
                    "OrderEventService: cancel event for paid commission on order {}",
                    order_id
                );
            }
            return Ok(false);
        }

        let affiliate = self
            .storage
            .get_affiliate(&commission.affiliate_id)
            .await?
            .ok_or_else(|| {
                AfflinkError::not_found(format!(
                    "affiliate not found: {}",
                    commission.affiliate_id
                ))
            })?;

        let notice = OutboxIntent::new(
            "commission_canceled",
            &affiliate.user_id,
            json!({
                "order_id": order_id,
                "commission_amount": commission.commission_amount,
            }),
        )
        .with_idempotency_key(format!("commission_canceled:{}", order_id));

        match self
            .storage
            .cancel_commission_for_order(order_id, &notice)
            .await?
        {
            CancelOutcome::Reversed(_) => Ok(true),
            CancelOutcome::Skipped | CancelOutcome::PaidUntouched => Ok(false),
        }
    }
}
