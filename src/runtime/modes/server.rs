//! Server mode
//!
//! This module contains the HTTP server startup logic.
//! It configures and starts the HTTP server with all necessary routes.

use actix_cors::Cors;
use actix_web::{
    App, HttpServer,
    middleware::{Compress, DefaultHeaders},
    web,
};
use anyhow::Result;
use tracing::warn;

use crate::api::middleware::RequestIdMiddleware;
use crate::api::services::{AppStartTime, affiliate_api_routes, health_routes};
use crate::config::CorsConfig;
use crate::runtime::lifetime;

/// Validate CORS configuration at startup (runs once)
fn validate_cors_config(cors_config: &CorsConfig) {
    if !cors_config.enabled {
        return;
    }

    if cors_config.allowed_origins.is_empty() {
        warn!(
            "CORS enabled but allowed_origins is empty. \
            No cross-origin requests will be allowed. \
            Set allowed_origins explicitly or use '[\"*\"]' for any origin."
        );
    }

    let is_any_origin = cors_config.allowed_origins.iter().any(|o| o == "*");
    if is_any_origin && cors_config.allow_credentials {
        tracing::error!(
            "SECURITY WARNING: allow_any_origin + allow_credentials is a dangerous combination! \
            Any website can make authenticated cross-origin requests. \
            Disabling credentials for safety."
        );
    }
}

/// Build CORS middleware from configuration
fn build_cors_middleware(cors_config: &CorsConfig) -> Cors {
    // When CORS is disabled, use browser's default same-origin policy (restrictive)
    if !cors_config.enabled {
        return Cors::default();
    }

    let mut cors = Cors::default();

    let is_any_origin = cors_config.allowed_origins.iter().any(|o| o == "*");

    // Configure allowed origins
    if cors_config.allowed_origins.is_empty() {
        // Empty origins = same-origin only (no cross-origin requests allowed)
    } else if is_any_origin {
        cors = cors.allow_any_origin();
    } else {
        for origin in &cors_config.allowed_origins {
            cors = cors.allowed_origin(origin);
        }
    }

    cors = cors.allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"]);

    for header in &cors_config.allowed_headers {
        cors = cors.allowed_header(header.as_str());
    }

    cors = cors.max_age(cors_config.max_age as usize);

    // Disallow any_origin + credentials combination as it's a security vulnerability
    // (actix-cors echoes Origin header instead of *, which browsers accept)
    if is_any_origin && cors_config.allow_credentials {
        // Force disabled
    } else if cors_config.allow_credentials {
        cors = cors.supports_credentials();
    }

    cors
}

/// Run the HTTP server
///
/// This function:
/// 1. Records startup time
/// 2. Prepares server components (storage, services, dispatcher)
/// 3. Configures and starts the HTTP server
/// 4. Listens for graceful shutdown signals
///
/// **Note**: Logging system must be initialized before calling this function
pub async fn run_server() -> Result<()> {
    // Record application start time
    let app_start_time = AppStartTime {
        start_datetime: chrono::Utc::now(),
    };

    // Prepare server startup (storage, services, outbox dispatcher)
    let startup = lifetime::startup::prepare_server_startup()
        .await
        .map_err(|e| {
            tracing::error!("Server startup failed: {}", e);
            e
        })?;

    let storage = startup.storage.clone();
    let links = startup.links.clone();
    let clicks = startup.clicks.clone();
    let conversion = startup.conversion.clone();
    let orders = startup.orders.clone();
    let withdrawals = startup.withdrawals.clone();
    let payouts = startup.payouts.clone();
    let registry = startup.registry.clone();
    let fraud_review = startup.fraud_review.clone();

    let config = crate::config::get_config();

    if config.api.service_token.as_deref().unwrap_or("").is_empty() {
        warn!("Service token not configured - protected endpoints will return 404");
    }

    let cpu_count = config.server.cpu_count.min(32);
    warn!("Using {} CPU cores for the server", cpu_count);

    // Validate CORS configuration at startup (runs once, not per worker)
    let cors_config = config.api.cors.clone();
    validate_cors_config(&cors_config);

    // Clone for the shutdown branch before moving into the server closure
    let dispatcher_for_shutdown = startup.dispatcher.clone();

    // Configure HTTP server
    let server = HttpServer::new(move || {
        let cors = build_cors_middleware(&cors_config);

        App::new()
            .wrap(RequestIdMiddleware) // 为每个请求生成 request_id
            .wrap(cors)
            .wrap(Compress::default())
            .app_data(web::Data::new(storage.clone()))
            .app_data(web::Data::new(links.clone()))
            .app_data(web::Data::new(clicks.clone()))
            .app_data(web::Data::new(conversion.clone()))
            .app_data(web::Data::new(orders.clone()))
            .app_data(web::Data::new(withdrawals.clone()))
            .app_data(web::Data::new(payouts.clone()))
            .app_data(web::Data::new(registry.clone()))
            .app_data(web::Data::new(fraud_review.clone()))
            .app_data(web::Data::new(app_start_time.clone()))
            .app_data(web::PayloadConfig::new(1024 * 1024))
            .wrap(
                DefaultHeaders::new()
                    .add(("Connection", "keep-alive"))
                    .add(("Keep-Alive", "timeout=30, max=1000"))
                    .add(("Cache-Control", "no-cache, no-store, must-revalidate")),
            )
            .service(web::scope("/health").service(health_routes()))
            .service(affiliate_api_routes())
    })
    .keep_alive(std::time::Duration::from_secs(30))
    .client_request_timeout(std::time::Duration::from_millis(5000))
    .client_disconnect_timeout(std::time::Duration::from_millis(1000))
    .workers(cpu_count);

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    warn!("Starting server at http://{}", bind_address);
    let server = server.bind(bind_address)?.run();

    // Wait for server or shutdown signal
    tokio::select! {
        res = server => {
            res?;
        }
        _ = lifetime::shutdown::listen_for_shutdown(dispatcher_for_shutdown) => {
            warn!("Graceful shutdown: all tasks completed");
        }
    }

    Ok(())
}
