//! Affiliate API 类型定义

use serde::{Deserialize, Serialize};

use crate::storage::{AffiliateLink, OrderStatus};

/// 统一响应信封
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    pub data: Option<T>,
}

// ============ Link endpoints ============

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CreateLinkRequest {
    pub affiliate_id: String,
    pub listing_id: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ListLinksQuery {
    pub affiliate_id: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LinksResponse {
    pub links: Vec<AffiliateLink>,
}

// ============ Tracking endpoint ============

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct TrackClickRequest {
    pub tracking_code: String,
    pub listing_id: String,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct TrackResponse {
    pub success: bool,
    pub tracked: bool,
}

// ============ Conversion endpoint ============

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ConvertRequest {
    pub order_id: String,
    pub tracking_code: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ConvertResponse {
    pub success: bool,
    pub commission_amount: i64,
    pub affiliate_id: String,
    pub already_attributed: bool,
}

// ============ Order status endpoint ============

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct OrderStatusRequest {
    pub order_id: String,
    pub old_status: Option<String>,
    pub new_status: String,
    pub buyer_user_id: String,
    pub affiliate_id: Option<String>,
    pub listing_title: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct OrderStatusResponse {
    pub success: bool,
    pub notifications_sent: u32,
    pub order_id: String,
    pub new_status: OrderStatus,
}

// ============ Withdrawal endpoints ============

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct WithdrawRequest {
    pub affiliate_id: String,
    pub amount: i64,
    pub pix_key: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RejectWithdrawalRequest {
    pub admin_notes: Option<String>,
}

// ============ Payout endpoint ============

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ProcessPayoutsRequest {
    pub batch_size: Option<u64>,
}

// ============ Registry endpoints ============

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RegisterAffiliateRequest {
    pub id: String,
    pub user_id: String,
    pub pix_key: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct UpsertListingRequest {
    pub title: String,
    pub commission_rate_bp: i32,
    pub affiliate_enabled: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RegisterOrderRequest {
    pub id: String,
    pub listing_id: String,
    pub amount: i64,
    pub buyer_user_id: String,
    pub status: Option<String>,
}

// ============ Fraud review endpoint ============

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct FraudReviewQuery {
    pub hours: Option<i64>,
}
