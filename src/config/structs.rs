use serde::{Deserialize, Serialize};

/// 静态配置（从 TOML 加载，启动时使用）
///
/// 包含全部配置段：
/// - server: 服务器地址、端口、CPU 数量
/// - database: 数据库连接配置
/// - api: 路由前缀、服务令牌、CORS、限流
/// - tracking: 归因与提现业务参数
/// - fraud: 外部欺诈评分服务
/// - notify: 通知 outbox 投递
/// - logging: 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub fraud: FraudConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > config.toml > 默认值
    /// ENV 前缀：AFFLINK，分隔符：__
    /// 示例：AFFLINK__SERVER__PORT=9999
    pub fn load() -> Self {
        Self::load_from("config.toml")
    }

    /// 从指定路径加载配置（-c/--config 指定时使用）
    pub fn load_from(path: &str) -> Self {
        use config::{Config, Environment, File};

        let builder = Config::builder()
            // 1. 从 TOML 文件加载（可选）
            .add_source(File::with_name(path).required(false))
            // 2. 从环境变量覆盖，前缀 AFFLINK，分隔符 __
            .add_source(
                Environment::with_prefix("AFFLINK")
                    .separator("__")
                    .try_parsing(true),
            );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<StaticConfig>() {
                Ok(config) => {
                    if std::path::Path::new(path).exists() {
                        eprintln!("[INFO] Configuration loaded from: {}", path);
                    }
                    config
                }
                Err(e) => {
                    eprintln!("[ERROR] Failed to deserialize config: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("[ERROR] Failed to build config: {}", e);
                Self::default()
            }
        }
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config)
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }

    /// 保存配置到 TOML 文件
    pub fn save_to_file<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;

        // Create parent directories if needed
        if let Some(parent) = path.as_ref().parent()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_cpu_count")]
    pub cpu_count: usize,
}

/// 数据库连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_database_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_database_timeout")]
    pub timeout: u64,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

/// API 配置
///
/// service_token 为空时所有受保护端点返回 404（视为未启用）。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_route_prefix")]
    pub route_prefix: String,
    #[serde(default)]
    pub service_token: Option<String>,
    /// 信任代理列表（CIDR 或单个 IP），用于 X-Forwarded-For 解析
    #[serde(default)]
    pub trusted_proxies: Vec<String>,
    #[serde(default)]
    pub cors: CorsConfig,
    /// /api/track 每 IP 每秒限流
    #[serde(default = "default_track_rate_per_second")]
    pub track_rate_per_second: u64,
    #[serde(default = "default_track_rate_burst")]
    pub track_rate_burst: u32,
    /// 每个推广人每分钟可创建的链接数
    #[serde(default = "default_link_rate_per_minute")]
    pub link_rate_per_minute: u32,
    #[serde(default = "default_link_rate_burst")]
    pub link_rate_burst: u32,
}

/// CORS 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    #[serde(default = "default_cors_headers")]
    pub allowed_headers: Vec<String>,
    #[serde(default = "default_cors_max_age")]
    pub max_age: u64,
    #[serde(default)]
    pub allow_credentials: bool,
}

/// 归因与提现业务参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// 点击去重窗口（小时）
    #[serde(default = "default_dedup_window_hours")]
    pub dedup_window_hours: i64,
    /// 生成跟踪码的随机字节数（base64 后约 4/3 倍长）
    #[serde(default = "default_tracking_code_bytes")]
    pub tracking_code_bytes: usize,
    /// 最低提现金额（最小货币单位）
    #[serde(default = "default_min_withdrawal_amount")]
    pub min_withdrawal_amount: i64,
    /// 单次结算批次的推广人数上限
    #[serde(default = "default_max_payout_batch_size")]
    pub max_payout_batch_size: u64,
}

/// 外部欺诈评分服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudConfig {
    /// 评分服务地址，未配置时评分全部走 fail-open 默认值
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default = "default_fraud_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_fraud_cache_ttl")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_fraud_cache_capacity")]
    pub cache_capacity: u64,
}

/// 通知 outbox 投递配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Webhook 地址，未配置时仅记录日志
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default = "default_notify_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_notify_batch_size")]
    pub batch_size: u64,
    #[serde(default = "default_notify_max_attempts")]
    pub max_attempts: i32,
    /// 首次重试延迟（秒），之后按尝试次数指数递增
    #[serde(default = "default_notify_retry_base_secs")]
    pub retry_base_secs: i64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_log_file")]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

// ============================================================
// Default value functions for static config
// ============================================================

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_cpu_count() -> usize {
    num_cpus::get()
}

fn default_database_url() -> String {
    "afflink.db".to_string()
}

fn default_database_pool_size() -> u32 {
    10
}

fn default_database_timeout() -> u64 {
    30
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    100
}

fn default_retry_max_delay_ms() -> u64 {
    2000
}

fn default_route_prefix() -> String {
    "/api".to_string()
}

fn default_track_rate_per_second() -> u64 {
    10
}

fn default_track_rate_burst() -> u32 {
    20
}

fn default_link_rate_per_minute() -> u32 {
    10
}

fn default_link_rate_burst() -> u32 {
    5
}

fn default_cors_headers() -> Vec<String> {
    vec![
        "Content-Type".to_string(),
        "Authorization".to_string(),
        "Accept".to_string(),
    ]
}

fn default_cors_max_age() -> u64 {
    3600
}

fn default_dedup_window_hours() -> i64 {
    24
}

fn default_tracking_code_bytes() -> usize {
    9
}

fn default_min_withdrawal_amount() -> i64 {
    1000
}

fn default_max_payout_batch_size() -> u64 {
    100
}

fn default_fraud_timeout_ms() -> u64 {
    2000
}

fn default_fraud_cache_ttl() -> u64 {
    900
}

fn default_fraud_cache_capacity() -> u64 {
    10_000
}

fn default_notify_poll_interval() -> u64 {
    5
}

fn default_notify_batch_size() -> u64 {
    20
}

fn default_notify_max_attempts() -> i32 {
    5
}

fn default_notify_retry_base_secs() -> i64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_file() -> Option<String> {
    None
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

// ============================================================
// Default implementations
// ============================================================

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            cpu_count: default_cpu_count(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            pool_size: default_database_pool_size(),
            timeout: default_database_timeout(),
            retry_count: default_retry_count(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            route_prefix: default_route_prefix(),
            service_token: None,
            trusted_proxies: Vec::new(),
            cors: CorsConfig::default(),
            track_rate_per_second: default_track_rate_per_second(),
            track_rate_burst: default_track_rate_burst(),
            link_rate_per_minute: default_link_rate_per_minute(),
            link_rate_burst: default_link_rate_burst(),
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            allowed_origins: Vec::new(),
            allowed_headers: default_cors_headers(),
            max_age: default_cors_max_age(),
            allow_credentials: false,
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            dedup_window_hours: default_dedup_window_hours(),
            tracking_code_bytes: default_tracking_code_bytes(),
            min_withdrawal_amount: default_min_withdrawal_amount(),
            max_payout_batch_size: default_max_payout_batch_size(),
        }
    }
}

impl Default for FraudConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            timeout_ms: default_fraud_timeout_ms(),
            cache_ttl_secs: default_fraud_cache_ttl(),
            cache_capacity: default_fraud_cache_capacity(),
        }
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            poll_interval_secs: default_notify_poll_interval(),
            batch_size: default_notify_batch_size(),
            max_attempts: default_notify_max_attempts(),
            retry_base_secs: default_notify_retry_base_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: default_log_file(),
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        let config = StaticConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.timeout, 30);
        assert_eq!(config.tracking.dedup_window_hours, 24);
        assert_eq!(config.tracking.min_withdrawal_amount, 1000);
        assert!(config.api.service_token.is_none());
        assert!(config.fraud.api_url.is_none());
    }

    #[test]
    fn test_generate_sample_config_is_valid_toml() {
        let sample = StaticConfig::generate_sample_config();
        let parsed: Result<StaticConfig, _> = toml::from_str(&sample);
        assert!(parsed.is_ok());
    }

    #[test]
    fn test_load_from_missing_file_uses_defaults() {
        let config = StaticConfig::load_from("definitely_missing_config_file.toml");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.notify.max_attempts, 5);
    }
}
