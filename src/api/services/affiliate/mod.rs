//! Affiliate API 服务模块
//!
//! 该模块包含推广结算 API 的所有端点，包括：
//! - 点击上报（公开，IP 限流）
//! - 订单归因与状态事件
//! - 推广链接创建与列表
//! - 提现申请、驳回与打款批处理
//! - 欺诈复核
//! - 上游同步（推广人、商品、订单快照）

mod click_ops;
mod conversion_ops;
pub mod error_code;
mod fraud_ops;
mod helpers;
mod link_ops;
mod order_ops;
mod payout_ops;
mod registry_ops;
pub mod routes;
mod types;
mod withdrawal_ops;

// 重新导出类型
pub use types::*;

// 重新导出帮助函数
pub use helpers::{api_result, error_from_afflink, error_response, success_response};

// 重新导出错误码
pub use error_code::ErrorCode;

// 重新导出限流器（点击上报端点使用）
pub use click_ops::{TrackKeyExtractor, track_rate_limiter};
