//! Withdrawal request service
//!
//! Validates withdrawal requests, reserves funds at request time and
//! releases them again when an admin rejects the request.

use std::sync::Arc;

use serde_json::json;
use tracing::info;

use crate::config::get_config;
use crate::errors::AfflinkError;
use crate::storage::{OutboxIntent, SeaOrmStorage, Withdrawal};

/// Service for affiliate withdrawal requests
pub struct WithdrawalService {
    storage: Arc<SeaOrmStorage>,
    min_amount: i64,
}

impl WithdrawalService {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        let min_amount = get_config().tracking.min_withdrawal_amount;
        Self {
            storage,
            min_amount,
        }
    }

    /// Request a withdrawal, moving the amount from available to reserved
    ///
    /// The full validation ladder runs before any storage call: amount
    /// must be positive, at least the configured minimum, and a payout
    /// key must be present (from the request or the affiliate profile).
    pub async fn request_withdrawal(
        &self,
        affiliate_id: &str,
        amount: i64,
        pix_key: Option<&str>,
    ) -> Result<Withdrawal, AfflinkError> {
        if affiliate_id.is_empty() {
            return Err(AfflinkError::validation("affiliate_id is required"));
        }
        if amount <= 0 {
            return Err(AfflinkError::invalid_amount(format!(
                "withdrawal amount must be positive, got {}",
                amount
            )));
        }
        if amount < self.min_amount {
            return Err(AfflinkError::below_minimum(format!(
                "withdrawal amount {} is below the minimum {}",
                amount, self.min_amount
            )));
        }

        let affiliate = self
            .storage
            .get_affiliate(affiliate_id)
            .await?
            .ok_or_else(|| {
                AfflinkError::not_found(format!("affiliate not found: {}", affiliate_id))
            })?;

        let pix_key = match pix_key {
            Some(key) if !key.trim().is_empty() => key.trim().to_string(),
            _ => match affiliate.pix_key {
                Some(key) if !key.trim().is_empty() => key.trim().to_string(),
                _ => {
                    return Err(AfflinkError::missing_payout_key(
                        "no payout key on the request or the affiliate profile",
                    ));
                }
            },
        };

        let notice = OutboxIntent::new(
            "withdrawal_requested",
            &affiliate.user_id,
            json!({
                "affiliate_id": affiliate_id,
                "amount": amount,
            }),
        );

        let withdrawal = self
            .storage
            .reserve_and_insert_withdrawal(affiliate_id, amount, &pix_key, &notice)
            .await?;

        info!(
            "WithdrawalService: withdrawal {} requested by {} for {}",
            withdrawal.id, affiliate_id, amount
        );
        Ok(withdrawal)
    }

    /// Reject a pending withdrawal and release the reserved funds
    pub async fn reject_withdrawal(
        &self,
        withdrawal_id: i64,
        admin_notes: Option<&str>,
    ) -> Result<Withdrawal, AfflinkError> {
        let withdrawal = self
            .storage
            .get_withdrawal(withdrawal_id)
            .await?
            .ok_or_else(|| {
                AfflinkError::not_found(format!("withdrawal not found: {}", withdrawal_id))
            })?;

        let affiliate = self
            .storage
            .get_affiliate(&withdrawal.affiliate_id)
            .await?
            .ok_or_else(|| {
                AfflinkError::not_found(format!(
                    "affiliate not found: {}",
                    withdrawal.affiliate_id
                ))
            })?;

        let notice = OutboxIntent::new(
            "withdrawal_rejected",
            &affiliate.user_id,
            json!({
                "withdrawal_id": withdrawal_id,
                "amount": withdrawal.amount,
                "admin_notes": admin_notes,
            }),
        )
        .with_idempotency_key(format!("withdrawal_rejected:{}", withdrawal_id));

        let rejected = self
            .storage
            .reject_withdrawal(withdrawal_id, admin_notes.map(String::from), &notice)
            .await?;

        info!(
            "WithdrawalService: withdrawal {} rejected, {} released for {}",
            withdrawal_id, rejected.amount, rejected.affiliate_id
        );
        Ok(rejected)
    }

    /// List an affiliate's pending withdrawals, oldest first
    pub async fn pending_withdrawals(
        &self,
        affiliate_id: &str,
    ) -> Result<Vec<Withdrawal>, AfflinkError> {
        self.storage
            .pending_withdrawals_for_affiliate(affiliate_id)
            .await
    }
}
