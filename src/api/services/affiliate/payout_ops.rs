//! Affiliate API 打款批处理端点

use actix_web::{HttpRequest, Responder, Result as ActixResult, web};
use std::sync::Arc;
use tracing::trace;

use crate::services::PayoutService;

use super::helpers::{error_from_afflink, success_response};
use super::types::ProcessPayoutsRequest;

/// 结算一批待处理提现
///
/// 按最早申请排序选取推广人，批大小受配置上限约束。
pub async fn process_payouts(
    _req: HttpRequest,
    body: web::Json<ProcessPayoutsRequest>,
    payouts: web::Data<Arc<PayoutService>>,
) -> ActixResult<impl Responder> {
    trace!(
        "Affiliate API: payout batch requested (batch_size {:?})",
        body.batch_size
    );

    match payouts.process_payouts(body.batch_size).await {
        Ok(summary) => Ok(success_response(summary)),
        Err(e) => Ok(error_from_afflink(&e)),
    }
}
