//! Affiliate API 欺诈复核端点

use actix_web::{HttpRequest, Responder, Result as ActixResult, web};
use serde_json::json;
use std::sync::Arc;
use tracing::trace;

use crate::services::FraudReviewService;

use super::helpers::{error_from_afflink, success_response};
use super::types::FraudReviewQuery;

/// 默认复核窗口（小时）
const DEFAULT_WINDOW_HOURS: i64 = 24;

/// 对某条链接近期的点击逐一评分
pub async fn review_link_clicks(
    _req: HttpRequest,
    path: web::Path<i64>,
    query: web::Query<FraudReviewQuery>,
    review: web::Data<Arc<FraudReviewService>>,
) -> ActixResult<impl Responder> {
    let link_id = path.into_inner();
    let hours = query.hours.unwrap_or(DEFAULT_WINDOW_HOURS);
    trace!(
        "Affiliate API: fraud review for link {} (window {}h)",
        link_id, hours
    );

    match review.assess_recent_clicks(link_id, hours).await {
        Ok(assessments) => Ok(success_response(json!({ "assessments": assessments }))),
        Err(e) => Ok(error_from_afflink(&e)),
    }
}
