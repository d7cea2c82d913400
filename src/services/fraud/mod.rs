//! 欺诈评分服务模块
//!
//! 对接外部欺诈检测服务，支持：
//! - 远端 HTTP 评分（带缓存与 singleflight）
//! - 未配置时禁用，始终 fail-open

mod provider;
mod remote;
mod review;

pub use provider::{FraudAssessment, FraudCheck, FraudScreen};
pub use review::{ClickAssessment, FraudReviewService};
