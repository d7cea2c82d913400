//! Affiliate API 点击上报端点

use actix_governor::{Governor, GovernorConfigBuilder, KeyExtractor, SimpleKeyExtractionError};
use actix_web::dev::ServiceRequest;
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, Responder, Result as ActixResult, web};
use governor::middleware::NoOpMiddleware;
use std::sync::Arc;
use tracing::{debug, trace, warn};

use crate::config::get_config;
use crate::services::ClickService;
use crate::utils::ip::{extract_client_ip, is_trusted_proxy};

use super::error_code::ErrorCode;
use super::helpers::{error_from_afflink, error_response, success_response};
use super::types::{TrackClickRequest, TrackResponse};

/// 基于 IP 地址的限流 key 提取器（安全版）
///
/// 策略：
/// - 默认使用连接 IP（peer_addr），无法被伪造
/// - 如果连接来自配置的可信代理，则使用 X-Forwarded-For
#[derive(Clone, Copy)]
pub struct TrackKeyExtractor;

impl KeyExtractor for TrackKeyExtractor {
    type Key = String;
    type KeyExtractionError = SimpleKeyExtractionError<&'static str>;

    fn extract(&self, req: &ServiceRequest) -> Result<Self::Key, Self::KeyExtractionError> {
        let conn_info = req.connection_info();

        // 获取连接 IP（TCP peer address，无法伪造）
        let peer_ip = conn_info
            .peer_addr()
            .ok_or_else(|| SimpleKeyExtractionError::new("Unable to extract peer IP"))?;

        let config = get_config();
        let trusted_proxies = &config.api.trusted_proxies;

        if !trusted_proxies.is_empty() && is_trusted_proxy(peer_ip, trusted_proxies) {
            // 来自可信代理，使用 X-Forwarded-For
            let real_ip = conn_info.realip_remote_addr().unwrap_or(peer_ip);
            debug!("Track rate limit key from trusted proxy: {}", real_ip);
            Ok(real_ip.to_string())
        } else {
            // 默认：使用连接 IP
            Ok(peer_ip.to_string())
        }
    }
}

/// 创建点击上报限流器
///
/// 补充速率与突发量来自配置，超限返回 HTTP 429 Too Many Requests
pub fn track_rate_limiter() -> Governor<TrackKeyExtractor, NoOpMiddleware> {
    let api = &get_config().api;
    let config = GovernorConfigBuilder::default()
        .per_second(api.track_rate_per_second.max(1))
        .burst_size(api.track_rate_burst.max(1))
        .key_extractor(TrackKeyExtractor)
        .finish()
        .expect("Invalid rate limit config");

    debug!(
        "Track rate limiter created: {} req/s, burst {}",
        api.track_rate_per_second, api.track_rate_burst
    );
    Governor::new(&config)
}

/// 记录一次推广链接点击
///
/// 公开端点，访客 IP 取自连接地址（或可信代理转发头）。
/// 24 小时内同 (链接, IP) 的重复点击返回 tracked=false。
pub async fn track_click(
    req: HttpRequest,
    body: web::Json<TrackClickRequest>,
    clicks: web::Data<Arc<ClickService>>,
) -> ActixResult<impl Responder> {
    trace!(
        "Affiliate API: track request for code {} on listing {}",
        body.tracking_code, body.listing_id
    );

    let Some(visitor_ip) = extract_client_ip(&req) else {
        warn!("Affiliate API: could not determine visitor IP for track request");
        return Ok(error_response(
            StatusCode::BAD_REQUEST,
            ErrorCode::BadRequest,
            "Unable to determine visitor IP",
        ));
    };

    // body 里的 user_agent 优先，否则取请求头
    let user_agent = body.user_agent.clone().or_else(|| {
        req.headers()
            .get("User-Agent")
            .and_then(|h| h.to_str().ok())
            .map(String::from)
    });

    match clicks
        .record_click(
            &body.tracking_code,
            &body.listing_id,
            &visitor_ip,
            user_agent,
            body.referrer.clone(),
        )
        .await
    {
        Ok(outcome) => Ok(success_response(TrackResponse {
            success: true,
            tracked: outcome.tracked,
        })),
        Err(e) => Ok(error_from_afflink(&e)),
    }
}
