//! Logging system initialization
//!
//! tracing 初始化：按 logging 配置段选择输出目标（滚动文件、追加文件或
//! stdout）与格式（text / json）。返回的 WorkerGuard 必须存活到进程退出，
//! 否则缓冲中的日志会丢失。

use tracing_appender::rolling;

use crate::config::{LoggingConfig, StaticConfig};

/// 按配置构建日志写入目标
fn build_writer(logging: &LoggingConfig) -> Box<dyn std::io::Write + Send + Sync> {
    let Some(file) = logging.file.as_deref().filter(|f| !f.is_empty()) else {
        return Box::new(std::io::stdout());
    };

    let path = std::path::Path::new(file);

    if logging.enable_rotation {
        let dir = path.parent().unwrap_or(std::path::Path::new("."));
        let prefix = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("afflink.log")
            .trim_end_matches(".log");
        let appender = rolling::Builder::new()
            .rotation(rolling::Rotation::DAILY)
            .filename_prefix(prefix)
            .filename_suffix("log")
            .max_log_files(logging.max_backups as usize)
            .build(dir)
            .expect("Failed to create rolling log appender");
        return Box::new(appender);
    }

    let handle = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .expect("Failed to open log file");
    Box::new(handle)
}

/// Initialize the logging system
///
/// 只能在启动时调用一次（配置加载之后、服务启动之前）。
/// 重复调用会 panic（全局 subscriber 已注册）。
pub fn init_logging(config: &StaticConfig) -> tracing_appender::non_blocking::WorkerGuard {
    let logging = &config.logging;
    // 写文件时关掉 ANSI 颜色
    let to_console = logging.file.as_deref().is_none_or(|f| f.is_empty());

    let (writer, guard) = tracing_appender::non_blocking(build_writer(logging));
    let filter = tracing_subscriber::EnvFilter::new(logging.level.clone());

    let builder = tracing_subscriber::fmt()
        .with_writer(writer)
        .with_env_filter(filter)
        .with_level(true)
        .with_ansi(to_console);

    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }

    guard
}
