//! Affiliate API 上游同步端点
//!
//! 推广人注册、商品快照与订单快照由上游市场服务推送。

use actix_web::{HttpRequest, Responder, Result as ActixResult, web};
use std::sync::Arc;
use tracing::trace;

use crate::services::RegistryService;

use super::helpers::{error_from_afflink, success_response};
use super::types::{RegisterAffiliateRequest, RegisterOrderRequest, UpsertListingRequest};

/// 注册推广人（余额清零，生成唯一推广码）
pub async fn register_affiliate(
    _req: HttpRequest,
    body: web::Json<RegisterAffiliateRequest>,
    registry: web::Data<Arc<RegistryService>>,
) -> ActixResult<impl Responder> {
    trace!("Affiliate API: register affiliate {}", body.id);

    match registry
        .register_affiliate(&body.id, &body.user_id, body.pix_key.as_deref())
        .await
    {
        Ok(affiliate) => Ok(success_response(affiliate)),
        Err(e) => Ok(error_from_afflink(&e)),
    }
}

/// 查询推广人余额与推广码
pub async fn get_affiliate(
    _req: HttpRequest,
    path: web::Path<String>,
    registry: web::Data<Arc<RegistryService>>,
) -> ActixResult<impl Responder> {
    let affiliate_id = path.into_inner();
    trace!("Affiliate API: get affiliate {}", affiliate_id);

    match registry.get_affiliate(&affiliate_id).await {
        Ok(affiliate) => Ok(success_response(affiliate)),
        Err(e) => Ok(error_from_afflink(&e)),
    }
}

/// 创建或刷新商品快照
pub async fn upsert_listing(
    _req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<UpsertListingRequest>,
    registry: web::Data<Arc<RegistryService>>,
) -> ActixResult<impl Responder> {
    let listing_id = path.into_inner();
    trace!("Affiliate API: upsert listing {}", listing_id);

    match registry
        .upsert_listing(
            &listing_id,
            &body.title,
            body.commission_rate_bp,
            body.affiliate_enabled,
        )
        .await
    {
        Ok(listing) => Ok(success_response(listing)),
        Err(e) => Ok(error_from_afflink(&e)),
    }
}

/// 登记订单快照（未归因状态）
pub async fn register_order(
    _req: HttpRequest,
    body: web::Json<RegisterOrderRequest>,
    registry: web::Data<Arc<RegistryService>>,
) -> ActixResult<impl Responder> {
    trace!("Affiliate API: register order {}", body.id);

    match registry
        .register_order(
            &body.id,
            &body.listing_id,
            body.amount,
            &body.buyer_user_id,
            body.status.as_deref(),
        )
        .await
    {
        Ok(order) => Ok(success_response(order)),
        Err(e) => Ok(error_from_afflink(&e)),
    }
}
