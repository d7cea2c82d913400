//! Affiliate API 转化归因端点

use actix_web::{HttpRequest, Responder, Result as ActixResult, web};
use std::sync::Arc;
use tracing::{info, trace};

use crate::services::ConversionService;

use super::helpers::{error_from_afflink, success_response};
use super::types::{ConvertRequest, ConvertResponse};

/// 将订单归因到 tracking code 对应的推广人
///
/// 重复调用（webhook 重试）视为成功，返回已存在佣金的信息并带
/// already_attributed 标记。
pub async fn convert_order(
    _req: HttpRequest,
    body: web::Json<ConvertRequest>,
    conversion: web::Data<Arc<ConversionService>>,
) -> ActixResult<impl Responder> {
    trace!(
        "Affiliate API: convert request for order {} with code {}",
        body.order_id, body.tracking_code
    );

    match conversion
        .attribute(&body.order_id, &body.tracking_code)
        .await
    {
        Ok(result) => {
            info!(
                "Affiliate API: order {} attributed to {} for {} ({})",
                result.order_id,
                result.affiliate_id,
                result.commission_amount,
                if result.already_attributed {
                    "repeat"
                } else {
                    "new"
                }
            );
            Ok(success_response(ConvertResponse {
                success: true,
                commission_amount: result.commission_amount,
                affiliate_id: result.affiliate_id,
                already_attributed: result.already_attributed,
            }))
        }
        Err(e) => Ok(error_from_afflink(&e)),
    }
}
