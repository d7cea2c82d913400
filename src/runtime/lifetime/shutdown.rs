use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::services::OutboxDispatcher;

/// 关闭超时时间（秒）
const SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// 排空通知队列的轮次上限
const DRAIN_MAX_ROUNDS: u32 = 5;

pub async fn listen_for_shutdown(dispatcher: Arc<OutboxDispatcher>) {
    // 等待 Ctrl+C 信号
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received, draining notifications...");
        }
        Err(e) => {
            warn!(
                "Failed to listen for Ctrl+C: {}. Proceeding with shutdown anyway.",
                e
            );
        }
    }

    // 将所有关闭任务包裹在超时内
    let shutdown_result = timeout(
        Duration::from_secs(SHUTDOWN_TIMEOUT_SECS),
        perform_shutdown_tasks(dispatcher),
    )
    .await;

    match shutdown_result {
        Ok(()) => {
            info!("All shutdown tasks completed successfully");
        }
        Err(_) => {
            error!(
                "Shutdown tasks timed out after {} seconds! Forcing exit.",
                SHUTDOWN_TIMEOUT_SECS
            );
            std::process::exit(1);
        }
    }

    info!("Shutting down...");
}

/// 执行所有关闭任务（在超时内调用）
///
/// 排空已到期的通知，批量投递直到队列空或达到轮次上限。
/// 投不完的留在 outbox 里，下次启动的分发器接着投。
async fn perform_shutdown_tasks(dispatcher: Arc<OutboxDispatcher>) {
    let mut total = 0usize;
    for _ in 0..DRAIN_MAX_ROUNDS {
        let delivered = dispatcher.dispatch_once().await;
        if delivered == 0 {
            break;
        }
        total += delivered;
    }

    if total > 0 {
        info!("Drained {} pending notifications on shutdown", total);
    } else {
        info!("No pending notifications to drain");
    }
}
