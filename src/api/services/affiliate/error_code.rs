//! 统一 API 错误码定义

use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::errors::AfflinkError;

/// API 错误码枚举
///
/// 使用 serde_repr 序列化为数字。按千位分域：
/// - 0: 成功
/// - 1000-1099: 通用错误
/// - 2000-2099: 认证与限流错误
/// - 3000-3099: 链接与归因错误
/// - 4000-4099: 提现错误
/// - 5000-5099: 外部服务错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(i32)]
pub enum ErrorCode {
    // 成功
    Success = 0,

    // 通用错误 1000-1099
    BadRequest = 1000,
    Unauthorized = 1001,
    NotFound = 1004,
    InternalServerError = 1005,
    Conflict = 1009,
    ServiceUnavailable = 1030,

    // 认证与限流错误 2000-2099
    AuthFailed = 2000,
    TokenInvalid = 2002,
    RateLimitExceeded = 2004,

    // 链接与归因错误 3000-3099
    InvalidTrackingCode = 3000,
    OrderListingMismatch = 3001,
    AlreadyAttributed = 3002,
    LinkCreateFailed = 3003,

    // 提现错误 4000-4099
    InvalidAmount = 4000,
    BelowMinimum = 4001,
    MissingPayoutKey = 4002,
    InsufficientBalance = 4003,

    // 外部服务错误 5000-5099
    ExternalServiceError = 5000,
}

impl From<AfflinkError> for ErrorCode {
    fn from(err: AfflinkError) -> Self {
        match err {
            AfflinkError::DatabaseConfig(_)
            | AfflinkError::DatabaseConnection(_)
            | AfflinkError::DatabaseOperation(_)
            | AfflinkError::FileOperation(_)
            | AfflinkError::Serialization(_) => ErrorCode::InternalServerError,
            AfflinkError::Validation(_) => ErrorCode::BadRequest,
            AfflinkError::NotFound(_) => ErrorCode::NotFound,
            AfflinkError::Conflict(_) => ErrorCode::Conflict,
            AfflinkError::RateLimited(_) => ErrorCode::RateLimitExceeded,
            AfflinkError::InvalidTrackingCode(_) => ErrorCode::InvalidTrackingCode,
            AfflinkError::OrderListingMismatch(_) => ErrorCode::OrderListingMismatch,
            AfflinkError::AlreadyAttributed(_) => ErrorCode::AlreadyAttributed,
            AfflinkError::InvalidAmount(_) => ErrorCode::InvalidAmount,
            AfflinkError::BelowMinimum(_) => ErrorCode::BelowMinimum,
            AfflinkError::MissingPayoutKey(_) => ErrorCode::MissingPayoutKey,
            AfflinkError::InsufficientBalance(_) => ErrorCode::InsufficientBalance,
            AfflinkError::ExternalService(_) => ErrorCode::ExternalServiceError,
        }
    }
}
