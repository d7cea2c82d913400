//! 点击复核
//!
//! 按需对某条推广链接的近期点击逐一评分，供管理端展示。
//! 只读监控路径，不影响点击记录本身。

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::debug;

use super::provider::{FraudAssessment, FraudScreen};
use crate::errors::AfflinkError;
use crate::storage::{AffiliateClick, SeaOrmStorage};

/// 单次复核最多评估的点击数
const REVIEW_CLICK_LIMIT: u64 = 200;
/// 复核窗口上限（小时）
const MAX_WINDOW_HOURS: i64 = 720;

/// 点击及其评估结果
#[derive(Debug, Clone, Serialize)]
pub struct ClickAssessment {
    pub click: AffiliateClick,
    pub assessment: FraudAssessment,
}

/// 点击复核服务
pub struct FraudReviewService {
    storage: Arc<SeaOrmStorage>,
    screen: Arc<FraudScreen>,
}

impl FraudReviewService {
    pub fn new(storage: Arc<SeaOrmStorage>, screen: Arc<FraudScreen>) -> Self {
        Self { storage, screen }
    }

    /// 评估某条链接近期的点击
    ///
    /// 窗口按小时计，最长 30 天；逐条调用评分服务（带缓存）
    pub async fn assess_recent_clicks(
        &self,
        affiliate_link_id: i64,
        window_hours: i64,
    ) -> Result<Vec<ClickAssessment>, AfflinkError> {
        let window_hours = window_hours.clamp(1, MAX_WINDOW_HOURS);

        let link = self
            .storage
            .get_link(affiliate_link_id)
            .await?
            .ok_or_else(|| {
                AfflinkError::not_found(format!("affiliate link not found: {}", affiliate_link_id))
            })?;

        let since = Utc::now() - Duration::hours(window_hours);
        let clicks = self
            .storage
            .recent_clicks(link.id, since, REVIEW_CLICK_LIMIT)
            .await?;

        debug!(
            "Fraud: assessing {} clicks on link {} (window {}h)",
            clicks.len(),
            link.id,
            window_hours
        );

        let mut assessments = Vec::with_capacity(clicks.len());
        for click in clicks {
            let assessment = self
                .screen
                .assess(click.affiliate_link_id, &click.visitor_ip, click.user_agent.as_deref())
                .await;
            assessments.push(ClickAssessment { click, assessment });
        }

        Ok(assessments)
    }
}
