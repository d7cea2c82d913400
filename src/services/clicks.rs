//! Click recording service
//!
//! Records clicks against tracking links with a per-(link, visitor_ip)
//! dedup window. Duplicate clicks return `tracked: false` and leave no
//! trace: no row, no counter bump, no downstream calls.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, info};

use crate::config::get_config;
use crate::errors::AfflinkError;
use crate::storage::SeaOrmStorage;

/// Outcome of a click submission
#[derive(Debug, Clone, Copy)]
pub struct ClickOutcome {
    pub tracked: bool,
}

/// Service for click tracking
pub struct ClickService {
    storage: Arc<SeaOrmStorage>,
}

impl ClickService {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self { storage }
    }

    /// Record a click for a tracking code on a listing
    ///
    /// The code must belong to the listing it is used on; a code from a
    /// different listing is indistinguishable from an unknown one.
    pub async fn record_click(
        &self,
        tracking_code: &str,
        listing_id: &str,
        visitor_ip: &str,
        user_agent: Option<String>,
        referrer: Option<String>,
    ) -> Result<ClickOutcome, AfflinkError> {
        if tracking_code.is_empty() || listing_id.is_empty() {
            return Err(AfflinkError::validation(
                "tracking_code and listing_id are required",
            ));
        }
        if visitor_ip.is_empty() {
            return Err(AfflinkError::validation("visitor ip could not be determined"));
        }

        let link = self
            .storage
            .find_link_for_tracking(tracking_code, listing_id)
            .await?
            .ok_or_else(|| {
                AfflinkError::invalid_tracking_code(format!(
                    "unknown tracking code: {}",
                    tracking_code
                ))
            })?;

        let window_hours = get_config().tracking.dedup_window_hours;
        let since = Utc::now() - Duration::hours(window_hours);

        if self
            .storage
            .has_recent_click(link.id, visitor_ip, since)
            .await?
        {
            debug!(
                "ClickService: duplicate click suppressed (link {}, ip {})",
                link.id, visitor_ip
            );
            return Ok(ClickOutcome { tracked: false });
        }

        self.storage
            .record_click(link.id, visitor_ip, user_agent, referrer)
            .await?;

        info!(
            "ClickService: click recorded (link {}, code {})",
            link.id, tracking_code
        );
        Ok(ClickOutcome { tracked: true })
    }
}
