//! Affiliate API 路由配置
//!
//! 公开的点击上报端点带 IP 限流；其余端点挂在 ServiceAuth 后面。

use actix_web::web;

use crate::api::middleware::ServiceAuth;

use super::click_ops::{track_click, track_rate_limiter};
use super::conversion_ops::convert_order;
use super::fraud_ops::review_link_clicks;
use super::link_ops::{create_link, list_links};
use super::order_ops::apply_order_status;
use super::payout_ops::process_payouts;
use super::registry_ops::{get_affiliate, register_affiliate, register_order, upsert_listing};
use super::withdrawal_ops::{reject_withdrawal, request_withdrawal};

/// 公开路由 `/track`
///
/// 仅点击上报，按来源 IP 限流
pub fn track_routes() -> actix_web::Scope {
    web::scope("/track").route(
        "",
        web::post().to(track_click).wrap(track_rate_limiter()),
    )
}

/// 受保护路由
///
/// 包含：
/// - POST /convert - 订单归因
/// - POST /orders/status - 订单状态事件
/// - POST /orders - 订单快照登记
/// - POST/GET /links - 推广链接创建与列表
/// - POST /withdrawals - 提现申请
/// - POST /withdrawals/{id}/reject - 驳回提现
/// - POST /payouts/process - 打款批处理
/// - GET /fraud/links/{id}/clicks - 点击欺诈复核
/// - POST /affiliates, GET /affiliates/{id} - 推广人注册与查询
/// - PUT /listings/{id} - 商品快照
pub fn protected_routes() -> actix_web::Scope<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse<
            actix_web::body::EitherBody<actix_web::body::BoxBody>,
        >,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    web::scope("")
        .wrap(ServiceAuth)
        .route("/convert", web::post().to(convert_order))
        .route("/orders/status", web::post().to(apply_order_status))
        .route("/orders", web::post().to(register_order))
        .route("/links", web::post().to(create_link))
        .route("/links", web::get().to(list_links))
        .route("/withdrawals", web::post().to(request_withdrawal))
        .route(
            "/withdrawals/{id}/reject",
            web::post().to(reject_withdrawal),
        )
        .route("/payouts/process", web::post().to(process_payouts))
        .route(
            "/fraud/links/{id}/clicks",
            web::get().to(review_link_clicks),
        )
        .route("/affiliates", web::post().to(register_affiliate))
        .route("/affiliates/{id}", web::get().to(get_affiliate))
        .route("/listings/{id}", web::put().to(upsert_listing))
}

/// Affiliate API 路由
///
/// 组合所有子模块路由，挂载在配置的 route_prefix 下
pub fn affiliate_api_routes() -> actix_web::Scope {
    let prefix = crate::config::get_config().api.route_prefix.clone();
    web::scope(prefix.trim_end_matches('/'))
        .service(track_routes())
        .service(protected_routes())
}
