//! Conversion attribution service
//!
//! Last-click attribution: the order is tied to the tracking code it
//! carried at checkout. All money math happens here; the storage layer
//! executes the write set atomically.

use std::sync::Arc;

use serde_json::json;
use tracing::info;

use crate::errors::AfflinkError;
use crate::storage::{
    AttributionOutcome, AttributionWrite, CommissionStatus, OutboxIntent, SeaOrmStorage,
};

/// Commission in minor units: floor(order_amount × rate_bp / 10000)
///
/// Truncation toward zero, reproduced exactly for reconciliation.
/// 999 × 250 bp → 24, never 25.
pub fn commission_for(order_amount: i64, rate_bp: i32) -> i64 {
    ((order_amount as i128 * rate_bp as i128) / 10_000) as i64
}

/// Result of an attribution request
#[derive(Debug, Clone)]
pub struct AttributionResult {
    pub order_id: String,
    pub affiliate_id: String,
    pub commission_amount: i64,
    pub commission_status: CommissionStatus,
    /// true when the order had been attributed by an earlier call
    pub already_attributed: bool,
}

/// Service for conversion attribution
pub struct ConversionService {
    storage: Arc<SeaOrmStorage>,
}

impl ConversionService {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self { storage }
    }

    /// Attribute an order to the affiliate behind a tracking code
    ///
    /// Repeat calls for an attributed order are success-equivalent and
    /// return the existing commission with `already_attributed: true`.
    pub async fn attribute(
        &self,
        order_id: &str,
        tracking_code: &str,
    ) -> Result<AttributionResult, AfflinkError> {
        if order_id.is_empty() || tracking_code.is_empty() {
            return Err(AfflinkError::validation(
                "order_id and tracking_code are required",
            ));
        }

        let link = self
            .storage
            .find_link_by_tracking_code(tracking_code)
            .await?
            .ok_or_else(|| {
                AfflinkError::invalid_tracking_code(format!(
                    "unknown tracking code: {}",
                    tracking_code
                ))
            })?;

        let order = self
            .storage
            .get_order(order_id)
            .await?
            .ok_or_else(|| AfflinkError::not_found(format!("order not found: {}", order_id)))?;

        if order.listing_id != link.listing_id {
            return Err(AfflinkError::order_listing_mismatch(format!(
                "order {} is for listing {}, tracking code belongs to {}",
                order_id, order.listing_id, link.listing_id
            )));
        }

        let listing = self
            .storage
            .get_listing(&link.listing_id)
            .await?
            .ok_or_else(|| {
                AfflinkError::not_found(format!("listing not found: {}", link.listing_id))
            })?;

        let affiliate = self
            .storage
            .get_affiliate(&link.affiliate_id)
            .await?
            .ok_or_else(|| {
                AfflinkError::not_found(format!("affiliate not found: {}", link.affiliate_id))
            })?;

        let commission_amount = commission_for(order.amount, listing.commission_rate_bp);

        let notice = OutboxIntent::new(
            "commission_earned",
            &affiliate.user_id,
            json!({
                "order_id": order.id,
                "listing_id": listing.id,
                "commission_amount": commission_amount,
                "order_amount": order.amount,
                "commission_rate_bp": listing.commission_rate_bp,
            }),
        )
        .with_idempotency_key(format!("commission_earned:{}", order.id));

        let write = AttributionWrite {
            order_id: order.id.clone(),
            link_id: link.id,
            affiliate_id: link.affiliate_id.clone(),
            listing_id: link.listing_id.clone(),
            tracking_code: link.tracking_code.clone(),
            order_amount: order.amount,
            commission_rate_bp: listing.commission_rate_bp,
            commission_amount,
        };

        match self.storage.attribute_conversion(&write, &notice).await? {
            AttributionOutcome::Applied(commission) => Ok(AttributionResult {
                order_id: commission.order_id,
                affiliate_id: commission.affiliate_id,
                commission_amount: commission.commission_amount,
                commission_status: commission.status,
                already_attributed: false,
            }),
            AttributionOutcome::AlreadyAttributed => {
                let commission = self
                    .storage
                    .find_commission_by_order(order_id)
                    .await?
                    .ok_or_else(|| {
                        AfflinkError::database_operation(format!(
                            "order {} marked attributed but commission row missing",
                            order_id
                        ))
                    })?;
                info!(
                    "ConversionService: order {} already attributed to {}",
                    order_id, commission.affiliate_id
                );
                Ok(AttributionResult {
                    order_id: commission.order_id,
                    affiliate_id: commission.affiliate_id,
                    commission_amount: commission.commission_amount,
                    commission_status: commission.status,
                    already_attributed: true,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commission_truncates_toward_zero() {
        // 999 * 250 / 10000 = 24.975 → 24
        assert_eq!(commission_for(999, 250), 24);
        // 10000 * 500 / 10000 = 500 exactly
        assert_eq!(commission_for(10_000, 500), 500);
        assert_eq!(commission_for(1, 1), 0);
        assert_eq!(commission_for(0, 9999), 0);
    }

    #[test]
    fn test_commission_no_overflow_on_large_amounts() {
        // i64::MAX × 10000 bp exceeds i64, the i128 widening keeps it exact
        assert_eq!(commission_for(i64::MAX, 10_000), i64::MAX);
        assert_eq!(commission_for(i64::MAX, 1), i64::MAX / 10_000);
    }
}
