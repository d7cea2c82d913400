//! Upstream registry service
//!
//! Keeps the local affiliate, listing and order snapshots in sync with
//! the marketplace that owns them.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use super::codes::TrackingCodeIssuer;
use crate::errors::AfflinkError;
use crate::storage::{AffiliateAccount, Listing, OrderRecord, OrderStatus, SeaOrmStorage};

/// Service for affiliate, listing and order registration
pub struct RegistryService {
    storage: Arc<SeaOrmStorage>,
    issuer: Arc<dyn TrackingCodeIssuer>,
}

impl RegistryService {
    pub fn new(storage: Arc<SeaOrmStorage>, issuer: Arc<dyn TrackingCodeIssuer>) -> Self {
        Self { storage, issuer }
    }

    /// Register a new affiliate with zero balances and a fresh code
    pub async fn register_affiliate(
        &self,
        id: &str,
        user_id: &str,
        pix_key: Option<&str>,
    ) -> Result<AffiliateAccount, AfflinkError> {
        if id.is_empty() || user_id.is_empty() {
            return Err(AfflinkError::validation("id and user_id are required"));
        }

        let affiliate = AffiliateAccount {
            id: id.to_string(),
            user_id: user_id.to_string(),
            affiliate_code: self.issuer.issue_code(),
            pix_key: pix_key
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(String::from),
            total_earnings: 0,
            available_balance: 0,
            reserved_balance: 0,
            created_at: Utc::now(),
        };

        self.storage.insert_affiliate(&affiliate).await?;
        info!("RegistryService: affiliate {} registered", affiliate.id);
        Ok(affiliate)
    }

    /// Fetch an affiliate's balances and code
    pub async fn get_affiliate(&self, id: &str) -> Result<AffiliateAccount, AfflinkError> {
        self.storage
            .get_affiliate(id)
            .await?
            .ok_or_else(|| AfflinkError::not_found(format!("affiliate not found: {}", id)))
    }

    /// Create or refresh a listing snapshot
    pub async fn upsert_listing(
        &self,
        id: &str,
        title: &str,
        commission_rate_bp: i32,
        affiliate_enabled: bool,
    ) -> Result<Listing, AfflinkError> {
        if id.is_empty() {
            return Err(AfflinkError::validation("listing id is required"));
        }
        if !(0..=10_000).contains(&commission_rate_bp) {
            return Err(AfflinkError::validation(format!(
                "commission rate must be 0..=10000 basis points, got {}",
                commission_rate_bp
            )));
        }

        let listing = Listing {
            id: id.to_string(),
            title: title.to_string(),
            commission_rate_bp,
            affiliate_enabled,
            updated_at: Utc::now(),
        };

        self.storage.upsert_listing(&listing).await?;
        info!(
            "RegistryService: listing {} upserted (rate {} bp, enabled {})",
            listing.id, listing.commission_rate_bp, listing.affiliate_enabled
        );
        Ok(listing)
    }

    /// Register an order snapshot from the marketplace
    ///
    /// Orders arrive unattributed; the conversion path fills in the
    /// affiliate fields later.
    pub async fn register_order(
        &self,
        id: &str,
        listing_id: &str,
        amount: i64,
        buyer_user_id: &str,
        status: Option<&str>,
    ) -> Result<OrderRecord, AfflinkError> {
        if id.is_empty() || listing_id.is_empty() || buyer_user_id.is_empty() {
            return Err(AfflinkError::validation(
                "id, listing_id and buyer_user_id are required",
            ));
        }
        if amount <= 0 {
            return Err(AfflinkError::invalid_amount(format!(
                "order amount must be positive, got {}",
                amount
            )));
        }

        self.storage.get_listing(listing_id).await?.ok_or_else(|| {
            AfflinkError::not_found(format!("listing not found: {}", listing_id))
        })?;

        let status = match status {
            Some(s) => s.parse::<OrderStatus>().map_err(|_| {
                AfflinkError::validation(format!("unknown order status: {}", s))
            })?,
            None => OrderStatus::Pending,
        };

        let now = Utc::now();
        let order = OrderRecord {
            id: id.to_string(),
            listing_id: listing_id.to_string(),
            amount,
            buyer_user_id: buyer_user_id.to_string(),
            status,
            affiliate_id: None,
            affiliate_commission: None,
            tracking_code: None,
            created_at: now,
            updated_at: now,
        };

        self.storage.insert_order(&order).await?;
        info!(
            "RegistryService: order {} registered for listing {}",
            order.id, order.listing_id
        );
        Ok(order)
    }

    /// Fetch an order snapshot
    pub async fn get_order(&self, id: &str) -> Result<OrderRecord, AfflinkError> {
        self.storage
            .get_order(id)
            .await?
            .ok_or_else(|| AfflinkError::not_found(format!("order not found: {}", id)))
    }
}
