use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// 佣金状态机
///
/// pending -> confirmed | canceled
/// confirmed -> canceled | paid
/// canceled / paid 为终态，拒绝一切后续迁移。
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CommissionStatus {
    Pending,
    Confirmed,
    Canceled,
    Paid,
}

impl CommissionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CommissionStatus::Canceled | CommissionStatus::Paid)
    }

    pub fn can_transition_to(&self, next: CommissionStatus) -> bool {
        use CommissionStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed) | (Pending, Canceled) | (Confirmed, Canceled) | (Confirmed, Paid)
        )
    }
}

/// 提现状态机
///
/// pending -> processing -> completed（批量结算）
/// pending -> rejected（管理动作，释放预留金额）
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum WithdrawalStatus {
    Pending,
    Processing,
    Completed,
    Rejected,
}

/// 订单状态（上游系统推送）
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Approved,
    Shipped,
    Delivered,
    Canceled,
}

/// 推广人账户
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffiliateAccount {
    pub id: String,
    pub user_id: String,
    pub affiliate_code: String,
    pub pix_key: Option<String>,
    pub total_earnings: i64,
    pub available_balance: i64,
    pub reserved_balance: i64,
    pub created_at: DateTime<Utc>,
}

/// 商品快照
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub id: String,
    pub title: String,
    pub commission_rate_bp: i32,
    pub affiliate_enabled: bool,
    pub updated_at: DateTime<Utc>,
}

/// 推广链接
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffiliateLink {
    pub id: i64,
    pub affiliate_id: String,
    pub listing_id: String,
    pub tracking_code: String,
    pub clicks_count: i64,
    pub last_clicked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// 点击记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffiliateClick {
    pub id: i64,
    pub affiliate_link_id: i64,
    pub visitor_ip: String,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
    pub clicked_at: DateTime<Utc>,
    pub converted: bool,
    pub order_id: Option<String>,
}

/// 订单快照
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: String,
    pub listing_id: String,
    pub amount: i64,
    pub buyer_user_id: String,
    pub status: OrderStatus,
    pub affiliate_id: Option<String>,
    pub affiliate_commission: Option<i64>,
    pub tracking_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 佣金账本条目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commission {
    pub id: i64,
    pub affiliate_id: String,
    pub order_id: String,
    pub listing_id: String,
    pub commission_rate: i32,
    pub commission_amount: i64,
    pub order_amount: i64,
    pub status: CommissionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 提现请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Withdrawal {
    pub id: i64,
    pub affiliate_id: String,
    pub amount: i64,
    pub pix_key: String,
    pub status: WithdrawalStatus,
    pub requested_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub admin_notes: Option<String>,
}

/// 待投递通知（写入 outbox 前的内存形态）
#[derive(Debug, Clone)]
pub struct OutboxIntent {
    pub kind: String,
    pub recipient_user_id: String,
    pub payload: serde_json::Value,
    pub idempotency_key: Option<String>,
}

impl OutboxIntent {
    pub fn new(
        kind: impl Into<String>,
        recipient_user_id: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            kind: kind.into(),
            recipient_user_id: recipient_user_id.into(),
            payload,
            idempotency_key: None,
        }
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// 已落库、等待投递的通知
#[derive(Debug, Clone, Serialize)]
pub struct OutboxMessage {
    pub id: i64,
    pub kind: String,
    pub recipient_user_id: String,
    pub payload: serde_json::Value,
    pub attempts: i32,
    pub created_at: DateTime<Utc>,
}
