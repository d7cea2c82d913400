//! Affiliate API 提现端点

use actix_web::{HttpRequest, Responder, Result as ActixResult, web};
use std::sync::Arc;
use tracing::trace;

use crate::services::WithdrawalService;

use super::helpers::{error_from_afflink, success_response};
use super::types::{RejectWithdrawalRequest, WithdrawRequest};

/// 发起提现申请
///
/// 金额即刻从可用余额转入预留余额，余额不足返回 4003。
pub async fn request_withdrawal(
    _req: HttpRequest,
    body: web::Json<WithdrawRequest>,
    withdrawals: web::Data<Arc<WithdrawalService>>,
) -> ActixResult<impl Responder> {
    trace!(
        "Affiliate API: withdrawal request from {} for {}",
        body.affiliate_id, body.amount
    );

    match withdrawals
        .request_withdrawal(&body.affiliate_id, body.amount, body.pix_key.as_deref())
        .await
    {
        Ok(withdrawal) => Ok(success_response(withdrawal)),
        Err(e) => Ok(error_from_afflink(&e)),
    }
}

/// 驳回待处理的提现申请并释放预留余额
pub async fn reject_withdrawal(
    _req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<RejectWithdrawalRequest>,
    withdrawals: web::Data<Arc<WithdrawalService>>,
) -> ActixResult<impl Responder> {
    let withdrawal_id = path.into_inner();
    trace!("Affiliate API: reject withdrawal {}", withdrawal_id);

    match withdrawals
        .reject_withdrawal(withdrawal_id, body.admin_notes.as_deref())
        .await
    {
        Ok(withdrawal) => Ok(success_response(withdrawal)),
        Err(e) => Ok(error_from_afflink(&e)),
    }
}
