use actix_web::http::StatusCode;
use std::fmt;

#[derive(Debug, Clone)]
pub enum AfflinkError {
    DatabaseConfig(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    FileOperation(String),
    Serialization(String),
    Validation(String),
    NotFound(String),
    Conflict(String),
    RateLimited(String),
    InvalidTrackingCode(String),
    OrderListingMismatch(String),
    AlreadyAttributed(String),
    InvalidAmount(String),
    BelowMinimum(String),
    MissingPayoutKey(String),
    InsufficientBalance(String),
    ExternalService(String),
}

impl AfflinkError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            AfflinkError::DatabaseConfig(_) => "E001",
            AfflinkError::DatabaseConnection(_) => "E002",
            AfflinkError::DatabaseOperation(_) => "E003",
            AfflinkError::FileOperation(_) => "E004",
            AfflinkError::Serialization(_) => "E005",
            AfflinkError::Validation(_) => "E006",
            AfflinkError::NotFound(_) => "E007",
            AfflinkError::Conflict(_) => "E008",
            AfflinkError::RateLimited(_) => "E009",
            AfflinkError::InvalidTrackingCode(_) => "E010",
            AfflinkError::OrderListingMismatch(_) => "E011",
            AfflinkError::AlreadyAttributed(_) => "E012",
            AfflinkError::InvalidAmount(_) => "E013",
            AfflinkError::BelowMinimum(_) => "E014",
            AfflinkError::MissingPayoutKey(_) => "E015",
            AfflinkError::InsufficientBalance(_) => "E016",
            AfflinkError::ExternalService(_) => "E017",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            AfflinkError::DatabaseConfig(_) => "Database Configuration Error",
            AfflinkError::DatabaseConnection(_) => "Database Connection Error",
            AfflinkError::DatabaseOperation(_) => "Database Operation Error",
            AfflinkError::FileOperation(_) => "File Operation Error",
            AfflinkError::Serialization(_) => "Serialization Error",
            AfflinkError::Validation(_) => "Validation Error",
            AfflinkError::NotFound(_) => "Resource Not Found",
            AfflinkError::Conflict(_) => "Conflict",
            AfflinkError::RateLimited(_) => "Rate Limited",
            AfflinkError::InvalidTrackingCode(_) => "Invalid Tracking Code",
            AfflinkError::OrderListingMismatch(_) => "Order Listing Mismatch",
            AfflinkError::AlreadyAttributed(_) => "Order Already Attributed",
            AfflinkError::InvalidAmount(_) => "Invalid Amount",
            AfflinkError::BelowMinimum(_) => "Below Minimum Amount",
            AfflinkError::MissingPayoutKey(_) => "Missing Payout Key",
            AfflinkError::InsufficientBalance(_) => "Insufficient Balance",
            AfflinkError::ExternalService(_) => "External Service Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            AfflinkError::DatabaseConfig(msg) => msg,
            AfflinkError::DatabaseConnection(msg) => msg,
            AfflinkError::DatabaseOperation(msg) => msg,
            AfflinkError::FileOperation(msg) => msg,
            AfflinkError::Serialization(msg) => msg,
            AfflinkError::Validation(msg) => msg,
            AfflinkError::NotFound(msg) => msg,
            AfflinkError::Conflict(msg) => msg,
            AfflinkError::RateLimited(msg) => msg,
            AfflinkError::InvalidTrackingCode(msg) => msg,
            AfflinkError::OrderListingMismatch(msg) => msg,
            AfflinkError::AlreadyAttributed(msg) => msg,
            AfflinkError::InvalidAmount(msg) => msg,
            AfflinkError::BelowMinimum(msg) => msg,
            AfflinkError::MissingPayoutKey(msg) => msg,
            AfflinkError::InsufficientBalance(msg) => msg,
            AfflinkError::ExternalService(msg) => msg,
        }
    }

    /// 映射 HTTP 状态码
    pub fn http_status(&self) -> StatusCode {
        match self {
            AfflinkError::DatabaseConfig(_)
            | AfflinkError::DatabaseConnection(_)
            | AfflinkError::DatabaseOperation(_)
            | AfflinkError::FileOperation(_)
            | AfflinkError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AfflinkError::Validation(_)
            | AfflinkError::InvalidAmount(_)
            | AfflinkError::BelowMinimum(_)
            | AfflinkError::MissingPayoutKey(_)
            | AfflinkError::InsufficientBalance(_) => StatusCode::BAD_REQUEST,
            AfflinkError::NotFound(_) | AfflinkError::InvalidTrackingCode(_) => {
                StatusCode::NOT_FOUND
            }
            AfflinkError::Conflict(_)
            | AfflinkError::OrderListingMismatch(_)
            | AfflinkError::AlreadyAttributed(_) => StatusCode::CONFLICT,
            AfflinkError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            AfflinkError::ExternalService(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// 格式化为彩色输出（服务端日志）
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for AfflinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 默认使用简洁格式
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for AfflinkError {}

// 便捷的构造函数
impl AfflinkError {
    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        AfflinkError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        AfflinkError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        AfflinkError::DatabaseOperation(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        AfflinkError::FileOperation(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        AfflinkError::Serialization(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        AfflinkError::Validation(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        AfflinkError::NotFound(msg.into())
    }

    pub fn conflict<T: Into<String>>(msg: T) -> Self {
        AfflinkError::Conflict(msg.into())
    }

    pub fn rate_limited<T: Into<String>>(msg: T) -> Self {
        AfflinkError::RateLimited(msg.into())
    }

    pub fn invalid_tracking_code<T: Into<String>>(msg: T) -> Self {
        AfflinkError::InvalidTrackingCode(msg.into())
    }

    pub fn order_listing_mismatch<T: Into<String>>(msg: T) -> Self {
        AfflinkError::OrderListingMismatch(msg.into())
    }

    pub fn already_attributed<T: Into<String>>(msg: T) -> Self {
        AfflinkError::AlreadyAttributed(msg.into())
    }

    pub fn invalid_amount<T: Into<String>>(msg: T) -> Self {
        AfflinkError::InvalidAmount(msg.into())
    }

    pub fn below_minimum<T: Into<String>>(msg: T) -> Self {
        AfflinkError::BelowMinimum(msg.into())
    }

    pub fn missing_payout_key<T: Into<String>>(msg: T) -> Self {
        AfflinkError::MissingPayoutKey(msg.into())
    }

    pub fn insufficient_balance<T: Into<String>>(msg: T) -> Self {
        AfflinkError::InsufficientBalance(msg.into())
    }

    pub fn external_service<T: Into<String>>(msg: T) -> Self {
        AfflinkError::ExternalService(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for AfflinkError {
    fn from(err: sea_orm::DbErr) -> Self {
        AfflinkError::DatabaseOperation(err.to_string())
    }
}

impl From<std::io::Error> for AfflinkError {
    fn from(err: std::io::Error) -> Self {
        AfflinkError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for AfflinkError {
    fn from(err: serde_json::Error) -> Self {
        AfflinkError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AfflinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_distinct() {
        let errors = [
            AfflinkError::validation("a"),
            AfflinkError::not_found("a"),
            AfflinkError::conflict("a"),
            AfflinkError::rate_limited("a"),
            AfflinkError::invalid_tracking_code("a"),
            AfflinkError::order_listing_mismatch("a"),
            AfflinkError::already_attributed("a"),
            AfflinkError::invalid_amount("a"),
            AfflinkError::below_minimum("a"),
            AfflinkError::missing_payout_key("a"),
            AfflinkError::insufficient_balance("a"),
            AfflinkError::external_service("a"),
        ];
        let mut codes: Vec<&str> = errors.iter().map(|e| e.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(
            AfflinkError::invalid_tracking_code("x").http_status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AfflinkError::rate_limited("x").http_status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            AfflinkError::order_listing_mismatch("x").http_status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AfflinkError::insufficient_balance("x").http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AfflinkError::external_service("x").http_status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_display_uses_simple_format() {
        let err = AfflinkError::below_minimum("minimum withdrawal is 1000");
        assert_eq!(
            err.to_string(),
            "Below Minimum Amount: minimum withdrawal is 1000"
        );
    }

    #[test]
    fn test_from_db_err() {
        let db_err = sea_orm::DbErr::Custom("boom".to_string());
        let err: AfflinkError = db_err.into();
        assert!(matches!(err, AfflinkError::DatabaseOperation(_)));
    }
}
