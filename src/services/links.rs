//! Tracking link issuance service
//!
//! Mints one tracking link per (affiliate, listing) pair. Re-issuing for
//! the same pair returns the existing link unchanged, so affiliates can
//! always recover their code.

use std::num::NonZeroU32;
use std::sync::Arc;

use governor::clock::DefaultClock;
use governor::state::keyed::DashMapStateStore;
use governor::{Quota, RateLimiter};
use tracing::{info, warn};

use crate::config::get_config;
use crate::errors::AfflinkError;
use crate::services::codes::TrackingCodeIssuer;
use crate::storage::{AffiliateLink, SeaOrmStorage};

/// Keyed limiter: one token bucket per affiliate id
type AffiliateRateLimiter = RateLimiter<String, DashMapStateStore<String>, DefaultClock>;

/// Result of link issuance
#[derive(Debug, Clone)]
pub struct LinkIssueResult {
    pub link: AffiliateLink,
    /// false when an existing link for the pair was returned
    pub created: bool,
}

/// Service for tracking link operations
pub struct TrackingLinkService {
    storage: Arc<SeaOrmStorage>,
    issuer: Arc<dyn TrackingCodeIssuer>,
    create_limiter: AffiliateRateLimiter,
}

impl TrackingLinkService {
    /// Create a new TrackingLinkService instance
    pub fn new(storage: Arc<SeaOrmStorage>, issuer: Arc<dyn TrackingCodeIssuer>) -> Self {
        let api = &get_config().api;
        Self {
            storage,
            issuer,
            create_limiter: build_affiliate_limiter(
                api.link_rate_per_minute,
                api.link_rate_burst,
            ),
        }
    }

    /// Issue a tracking link for (affiliate, listing)
    pub async fn issue_link(
        &self,
        affiliate_id: &str,
        listing_id: &str,
    ) -> Result<LinkIssueResult, AfflinkError> {
        if self
            .create_limiter
            .check_key(&affiliate_id.to_string())
            .is_err()
        {
            warn!("LinkService: rate limit hit for affiliate {}", affiliate_id);
            return Err(AfflinkError::rate_limited(format!(
                "link creation limit reached for affiliate {}",
                affiliate_id
            )));
        }

        // Validate both sides of the pair
        self.storage
            .get_affiliate(affiliate_id)
            .await?
            .ok_or_else(|| {
                AfflinkError::not_found(format!("affiliate not found: {}", affiliate_id))
            })?;

        let listing = self
            .storage
            .get_listing(listing_id)
            .await?
            .ok_or_else(|| AfflinkError::not_found(format!("listing not found: {}", listing_id)))?;
        if !listing.affiliate_enabled {
            return Err(AfflinkError::not_found(format!(
                "listing not affiliate-enabled: {}",
                listing_id
            )));
        }

        // Idempotent re-issue: the pair already has a link
        if let Some(existing) = self
            .storage
            .find_link_by_pair(affiliate_id, listing_id)
            .await?
        {
            info!(
                "LinkService: re-issued existing link {} for affiliate {}",
                existing.tracking_code, affiliate_id
            );
            return Ok(LinkIssueResult {
                link: existing,
                created: false,
            });
        }

        let code = self.issuer.issue_code();
        match self
            .storage
            .insert_link(affiliate_id, listing_id, &code)
            .await
        {
            Ok(link) => Ok(LinkIssueResult {
                link,
                created: true,
            }),
            Err(AfflinkError::Conflict(_)) => {
                // Either a concurrent create for the same pair won, or the
                // code collided. Re-check the pair, then retry generation once.
                if let Some(existing) = self
                    .storage
                    .find_link_by_pair(affiliate_id, listing_id)
                    .await?
                {
                    return Ok(LinkIssueResult {
                        link: existing,
                        created: false,
                    });
                }

                let retry_code = self.issuer.issue_code();
                warn!(
                    "LinkService: tracking code collision for affiliate {}, retrying once",
                    affiliate_id
                );
                let link = self
                    .storage
                    .insert_link(affiliate_id, listing_id, &retry_code)
                    .await?;
                Ok(LinkIssueResult {
                    link,
                    created: true,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// List all tracking links of an affiliate, newest first
    pub async fn list_links(
        &self,
        affiliate_id: &str,
    ) -> Result<Vec<AffiliateLink>, AfflinkError> {
        self.storage
            .get_affiliate(affiliate_id)
            .await?
            .ok_or_else(|| {
                AfflinkError::not_found(format!("affiliate not found: {}", affiliate_id))
            })?;

        self.storage.list_links_for_affiliate(affiliate_id).await
    }
}

/// Build the per-affiliate token bucket for link creation
fn build_affiliate_limiter(per_minute: u32, burst: u32) -> AffiliateRateLimiter {
    let quota = Quota::per_minute(NonZeroU32::new(per_minute.max(1)).unwrap_or(NonZeroU32::MIN))
        .allow_burst(NonZeroU32::new(burst.max(1)).unwrap_or(NonZeroU32::MIN));
    RateLimiter::dashmap(quota)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affiliate_limiter_is_keyed() {
        let limiter = build_affiliate_limiter(1, 2);

        let a = "aff_a".to_string();
        let b = "aff_b".to_string();

        // burst of 2 per key
        assert!(limiter.check_key(&a).is_ok());
        assert!(limiter.check_key(&a).is_ok());
        assert!(limiter.check_key(&a).is_err());

        // a different affiliate has its own bucket
        assert!(limiter.check_key(&b).is_ok());
    }
}
