//! Affiliate API 订单状态事件端点

use actix_web::{HttpRequest, Responder, Result as ActixResult, web};
use std::sync::Arc;
use tracing::trace;

use crate::services::{OrderEventService, OrderStatusEvent};

use super::helpers::{error_from_afflink, success_response};
use super::types::{OrderStatusRequest, OrderStatusResponse};

/// 应用上游订单状态变更
///
/// approved 确认佣金，canceled 冲销佣金；每次变更都会给买家写一条
/// 状态通知。
pub async fn apply_order_status(
    _req: HttpRequest,
    body: web::Json<OrderStatusRequest>,
    orders: web::Data<Arc<OrderEventService>>,
) -> ActixResult<impl Responder> {
    trace!(
        "Affiliate API: order status event {} -> {}",
        body.order_id, body.new_status
    );

    let event = OrderStatusEvent {
        order_id: body.order_id.clone(),
        old_status: body.old_status.clone(),
        new_status: body.new_status.clone(),
        buyer_user_id: body.buyer_user_id.clone(),
        listing_title: body.listing_title.clone(),
    };

    match orders.apply_order_status(event).await {
        Ok(result) => Ok(success_response(OrderStatusResponse {
            success: true,
            notifications_sent: result.notifications_sent,
            order_id: result.order_id,
            new_status: result.new_status,
        })),
        Err(e) => Ok(error_from_afflink(&e)),
    }
}
