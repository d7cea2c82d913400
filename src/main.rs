use std::env;

use afflink::config::args::{filter_config_args, parse_config_path};
use afflink::config::{StaticConfig, get_config, init_config, init_config_from};
use afflink::runtime;
use afflink::system::logging;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();

    let args: Vec<String> = env::args().collect();

    // -c/--config 指定配置文件路径
    match parse_config_path(&args) {
        Some(path) => init_config_from(&path),
        None => init_config(),
    }

    // 工具子命令：生成示例配置后直接退出
    let filtered = filter_config_args(&args);
    if filtered.len() > 1 && filtered[1] == "sample-config" {
        print!("{}", StaticConfig::generate_sample_config());
        return Ok(());
    }

    let config = get_config();

    // guard 必须存活到进程结束，否则缓冲日志会丢
    let _log_guard = logging::init_logging(&config);

    if let Err(e) = runtime::run_server().await {
        tracing::error!("Server exited with error: {}", e);
        return Err(std::io::Error::other(e.to_string()));
    }

    Ok(())
}
