//! Affiliate API 推广链接端点

use actix_web::{HttpRequest, Responder, Result as ActixResult, web};
use std::sync::Arc;
use tracing::{info, trace};

use crate::services::TrackingLinkService;

use super::helpers::{error_from_afflink, success_response};
use super::types::{CreateLinkRequest, LinksResponse, ListLinksQuery};

/// 为 (推广人, 商品) 创建推广链接
///
/// 幂等：已有链接时原样返回。按推广人限流。
pub async fn create_link(
    _req: HttpRequest,
    body: web::Json<CreateLinkRequest>,
    links: web::Data<Arc<TrackingLinkService>>,
) -> ActixResult<impl Responder> {
    trace!(
        "Affiliate API: create link request for affiliate {} on listing {}",
        body.affiliate_id, body.listing_id
    );

    match links.issue_link(&body.affiliate_id, &body.listing_id).await {
        Ok(result) => {
            info!(
                "Affiliate API: link {} for affiliate {} ({})",
                result.link.tracking_code,
                body.affiliate_id,
                if result.created { "created" } else { "reused" }
            );
            Ok(success_response(result.link))
        }
        Err(e) => Ok(error_from_afflink(&e)),
    }
}

/// 列出推广人的全部链接（新建在前）
pub async fn list_links(
    _req: HttpRequest,
    query: web::Query<ListLinksQuery>,
    links: web::Data<Arc<TrackingLinkService>>,
) -> ActixResult<impl Responder> {
    trace!(
        "Affiliate API: list links request for affiliate {}",
        query.affiliate_id
    );

    match links.list_links(&query.affiliate_id).await {
        Ok(items) => Ok(success_response(LinksResponse { links: items })),
        Err(e) => Ok(error_from_afflink(&e)),
    }
}
