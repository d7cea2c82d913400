//! Payout batch service
//!
//! Walks affiliates with pending withdrawals oldest-first and settles
//! each request, allocating confirmed commissions FIFO as coverage.

use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};

use crate::config::get_config;
use crate::errors::AfflinkError;
use crate::storage::{OutboxIntent, PayoutSummary, SeaOrmStorage};

/// Service for the periodic payout run
pub struct PayoutService {
    storage: Arc<SeaOrmStorage>,
    max_batch_size: u64,
}

impl PayoutService {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        let max_batch_size = get_config().tracking.max_payout_batch_size;
        Self {
            storage,
            max_batch_size,
        }
    }

    /// Settle pending withdrawals for up to `batch_size` affiliates
    ///
    /// Affiliates are picked by their oldest pending request. A failure
    /// on one withdrawal is logged and the run continues; the summary
    /// only counts what actually completed.
    pub async fn process_payouts(
        &self,
        batch_size: Option<u64>,
    ) -> Result<PayoutSummary, AfflinkError> {
        let batch_size = batch_size
            .unwrap_or(self.max_batch_size)
            .clamp(1, self.max_batch_size);

        let affiliate_ids = self
            .storage
            .affiliates_with_pending_withdrawals(batch_size)
            .await?;

        let mut summary = PayoutSummary {
            processed_affiliates: 0,
            completed_withdrawals: 0,
            allocated_amount: 0,
        };

        for affiliate_id in &affiliate_ids {
            let affiliate = match self.storage.get_affiliate(affiliate_id).await? {
                Some(a) => a,
                None => {
                    warn!(
                        "PayoutService: affiliate {} has pending withdrawals but no account",
                        affiliate_id
                    );
                    continue;
                }
            };
            summary.processed_affiliates += 1;

            let withdrawals = self
                .storage
                .pending_withdrawals_for_affiliate(affiliate_id)
                .await?;

            for withdrawal in withdrawals {
                let notice = OutboxIntent::new(
                    "withdrawal_completed",
                    &affiliate.user_id,
                    json!({
                        "withdrawal_id": withdrawal.id,
                        "amount": withdrawal.amount,
                    }),
                )
                .with_idempotency_key(format!("withdrawal_completed:{}", withdrawal.id));

                match self
                    .storage
                    .complete_withdrawal(withdrawal.id, &notice)
                    .await
                {
                    Ok(Some(allocated)) => {
                        summary.completed_withdrawals += 1;
                        summary.allocated_amount += allocated;
                    }
                    Ok(None) => {
                        // Another run claimed it first
                    }
                    Err(e) => {
                        warn!(
                            "PayoutService: withdrawal {} failed to complete: {}",
                            withdrawal.id, e
                        );
                    }
                }
            }
        }

        info!(
            "PayoutService: processed {} affiliates, completed {} withdrawals ({} allocated)",
            summary.processed_affiliates, summary.completed_withdrawals, summary.allocated_amount
        );
        Ok(summary)
    }
}
