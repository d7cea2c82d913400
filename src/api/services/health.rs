use actix_web::{HttpResponse, Responder, web};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, trace};

use crate::api::services::affiliate::{ApiResponse, ErrorCode};
use crate::storage::SeaOrmStorage;

// 应用启动时间结构体
#[derive(Clone, Debug)]
pub struct AppStartTime {
    pub start_datetime: chrono::DateTime<chrono::Utc>,
}

/// Health Service
///
/// 注意：此 service 直接调用 storage 方法，不经过业务 service。
/// 这是合理的例外，因为：
/// 1. 基础设施，需要简单直接（k8s probes 要求快速响应）
/// 2. Storage 层方法已足够语义化（pending_outbox_count）
/// 3. 健康检查不应依赖复杂的业务逻辑
pub struct HealthService;

impl HealthService {
    pub async fn health_check(
        storage: web::Data<Arc<SeaOrmStorage>>,
        app_start_time: web::Data<AppStartTime>,
    ) -> impl Responder {
        let start_time = Instant::now();
        trace!("Received health check request");

        // 检查存储健康状况（只查 outbox 计数，不加载全表）
        let storage_status = match tokio::time::timeout(
            Duration::from_secs(5),
            storage.pending_outbox_count(),
        )
        .await
        {
            Ok(Ok(pending)) => {
                trace!(
                    "Storage health check passed, {} notifications pending",
                    pending
                );
                json!({
                    "status": "healthy",
                    "pending_notifications": pending,
                    "backend": storage.backend_name(),
                })
            }
            Ok(Err(e)) => {
                error!("Storage health check failed: {}", e);
                json!({
                    "status": "unhealthy",
                    "error": format!("database error: {}", e),
                    "backend": storage.backend_name(),
                })
            }
            Err(_) => {
                error!("Storage health check timeout");
                json!({
                    "status": "unhealthy",
                    "error": "timeout",
                    "backend": storage.backend_name(),
                })
            }
        };

        let now = chrono::Utc::now();

        // 计算运行秒数
        let uptime_seconds = (now - app_start_time.start_datetime).num_seconds().max(0) as u64;

        let is_healthy = storage_status["status"] == "healthy";

        let health_data = json!({
            "status": if is_healthy { "healthy" } else { "unhealthy" },
            "timestamp": now.to_rfc3339(),
            "uptime": uptime_seconds,
            "checks": {
                "storage": storage_status,
            },
            "response_time_ms": start_time.elapsed().as_millis() as u64,
        });

        let health_response = ApiResponse {
            code: if is_healthy {
                ErrorCode::Success as i32
            } else {
                ErrorCode::ServiceUnavailable as i32
            },
            message: if is_healthy {
                "OK".to_string()
            } else {
                "Service Unavailable".to_string()
            },
            data: Some(health_data),
        };

        let response_status = if is_healthy {
            actix_web::http::StatusCode::OK
        } else {
            actix_web::http::StatusCode::SERVICE_UNAVAILABLE
        };

        info!(
            "Health check completed in {:?}, status: {}, uptime: {}s",
            start_time.elapsed(),
            if is_healthy { "healthy" } else { "unhealthy" },
            uptime_seconds
        );

        HttpResponse::build(response_status)
            .append_header(("Content-Type", "application/json; charset=utf-8"))
            .json(health_response)
    }

    // 简单的就绪检查，只返回 200 状态码
    pub async fn readiness_check() -> impl Responder {
        trace!("Received readiness check request");

        HttpResponse::Ok()
            .append_header(("Content-Type", "text/plain"))
            .body("OK")
    }

    // 活跃性检查，检查基本服务可用性
    pub async fn liveness_check() -> impl Responder {
        trace!("Received liveness check request");

        HttpResponse::NoContent().finish()
    }
}

/// Health 路由配置
pub fn health_routes() -> actix_web::Scope {
    web::scope("")
        .route("", web::get().to(HealthService::health_check))
        .route("", web::head().to(HealthService::health_check))
        .route("/ready", web::get().to(HealthService::readiness_check))
        .route("/ready", web::head().to(HealthService::readiness_check))
        .route("/live", web::get().to(HealthService::liveness_check))
        .route("/live", web::head().to(HealthService::liveness_check))
}
