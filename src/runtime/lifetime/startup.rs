//! Server startup preparation
//!
//! Builds the storage facade and every request-facing service, and
//! spawns the outbox dispatcher before the HTTP server starts taking
//! traffic.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

use crate::services::{
    ClickService, ConversionService, FraudReviewService, FraudScreen, LogTransport,
    NotificationTransport, OrderEventService, OutboxDispatcher, PayoutService, RandomCodeIssuer,
    RegistryService, TrackingCodeIssuer, TrackingLinkService, WebhookTransport, WithdrawalService,
};
use crate::storage::{SeaOrmStorage, StorageFactory};

/// Everything the HTTP server needs, wired once at startup
pub struct StartupContext {
    pub storage: Arc<SeaOrmStorage>,
    pub links: Arc<TrackingLinkService>,
    pub clicks: Arc<ClickService>,
    pub conversion: Arc<ConversionService>,
    pub orders: Arc<OrderEventService>,
    pub withdrawals: Arc<WithdrawalService>,
    pub payouts: Arc<PayoutService>,
    pub registry: Arc<RegistryService>,
    pub fraud_review: Arc<FraudReviewService>,
    pub dispatcher: Arc<OutboxDispatcher>,
}

/// 准备服务器启动的上下文
///
/// 包括存储、业务服务与 outbox 分发器
pub async fn prepare_server_startup() -> Result<StartupContext> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|e| anyhow::anyhow!("Failed to install rustls crypto provider: {:?}", e))?;

    let storage = StorageFactory::create()
        .await
        .context("Failed to create storage backend")?;
    info!("Using storage backend: {}", storage.backend_name());

    let config = crate::config::get_config();

    // 跟踪码生成器：链接签发与推广人注册共用
    let issuer: Arc<dyn TrackingCodeIssuer> =
        Arc::new(RandomCodeIssuer::new(config.tracking.tracking_code_bytes));

    // 欺诈评分：未配置 api_url 时为禁用态，始终 fail-open
    let fraud_screen = Arc::new(FraudScreen::new(&config.fraud));
    if fraud_screen.is_enabled() {
        info!("Fraud screening enabled");
    } else {
        debug!("Fraud screening disabled (no api_url configured)");
    }

    let links = Arc::new(TrackingLinkService::new(storage.clone(), issuer.clone()));
    let clicks = Arc::new(ClickService::new(storage.clone()));
    let conversion = Arc::new(ConversionService::new(storage.clone()));
    let orders = Arc::new(OrderEventService::new(storage.clone()));
    let withdrawals = Arc::new(WithdrawalService::new(storage.clone()));
    let payouts = Arc::new(PayoutService::new(storage.clone()));
    let registry = Arc::new(RegistryService::new(storage.clone(), issuer));
    let fraud_review = Arc::new(FraudReviewService::new(storage.clone(), fraud_screen));

    // 通知投递：配置了 webhook 则外发，否则只记日志
    let transport: Arc<dyn NotificationTransport> = match config.notify.webhook_url {
        Some(ref url) if !url.is_empty() => Arc::new(WebhookTransport::new(url)),
        _ => Arc::new(LogTransport),
    };
    let dispatcher = Arc::new(OutboxDispatcher::new(storage.clone(), transport));

    // 后台轮询投递 outbox，随进程退出一起结束
    let dispatcher_for_loop = dispatcher.clone();
    tokio::spawn(async move {
        dispatcher_for_loop.run().await;
    });

    info!(
        "Server startup preparation completed in {:?}",
        start_time.elapsed()
    );

    Ok(StartupContext {
        storage,
        links,
        clicks,
        conversion,
        orders,
        withdrawals,
        payouts,
        registry,
        fraud_review,
        dispatcher,
    })
}
