use crate::errors::{AfflinkError, Result};
use crate::storage::models::{
    AffiliateAccount, AffiliateClick, AffiliateLink, Commission, CommissionStatus, Listing,
    OrderRecord, OrderStatus, Withdrawal, WithdrawalStatus,
};
use migration::entities::{
    affiliate, affiliate_click, affiliate_commission, affiliate_link, affiliate_withdrawal,
    listing, order,
};

/// 将 Sea-ORM Model 转换为 AffiliateAccount
pub fn model_to_affiliate(model: affiliate::Model) -> AffiliateAccount {
    AffiliateAccount {
        id: model.id,
        user_id: model.user_id,
        affiliate_code: model.affiliate_code,
        pix_key: model.pix_key,
        total_earnings: model.total_earnings,
        available_balance: model.available_balance,
        reserved_balance: model.reserved_balance,
        created_at: model.created_at,
    }
}

/// 将 Sea-ORM Model 转换为 Listing
pub fn model_to_listing(model: listing::Model) -> Listing {
    Listing {
        id: model.id,
        title: model.title,
        commission_rate_bp: model.commission_rate_bp,
        affiliate_enabled: model.affiliate_enabled,
        updated_at: model.updated_at,
    }
}

/// 将 Sea-ORM Model 转换为 AffiliateLink
pub fn model_to_link(model: affiliate_link::Model) -> AffiliateLink {
    AffiliateLink {
        id: model.id,
        affiliate_id: model.affiliate_id,
        listing_id: model.listing_id,
        tracking_code: model.tracking_code,
        clicks_count: model.clicks_count.max(0),
        last_clicked_at: model.last_clicked_at,
        created_at: model.created_at,
    }
}

/// 将 Sea-ORM Model 转换为 AffiliateClick
pub fn model_to_click(model: affiliate_click::Model) -> AffiliateClick {
    AffiliateClick {
        id: model.id,
        affiliate_link_id: model.affiliate_link_id,
        visitor_ip: model.visitor_ip,
        user_agent: model.user_agent,
        referrer: model.referrer,
        clicked_at: model.clicked_at,
        converted: model.converted,
        order_id: model.order_id,
    }
}

/// 解析存储的状态字符串，损坏的值视为数据错误
fn parse_status<T: std::str::FromStr>(raw: &str, table: &str) -> Result<T> {
    raw.parse().map_err(|_| {
        AfflinkError::database_operation(format!("{} 表存在非法状态值: {}", table, raw))
    })
}

/// 将 Sea-ORM Model 转换为 OrderRecord
pub fn model_to_order(model: order::Model) -> Result<OrderRecord> {
    let status: OrderStatus = parse_status(&model.status, "orders")?;
    Ok(OrderRecord {
        id: model.id,
        listing_id: model.listing_id,
        amount: model.amount,
        buyer_user_id: model.buyer_user_id,
        status,
        affiliate_id: model.affiliate_id,
        affiliate_commission: model.affiliate_commission,
        tracking_code: model.tracking_code,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

/// 将 Sea-ORM Model 转换为 Commission
pub fn model_to_commission(model: affiliate_commission::Model) -> Result<Commission> {
    let status: CommissionStatus = parse_status(&model.status, "affiliate_commissions")?;
    Ok(Commission {
        id: model.id,
        affiliate_id: model.affiliate_id,
        order_id: model.order_id,
        listing_id: model.listing_id,
        commission_rate: model.commission_rate,
        commission_amount: model.commission_amount,
        order_amount: model.order_amount,
        status,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

/// 将 Sea-ORM Model 转换为 Withdrawal
pub fn model_to_withdrawal(model: affiliate_withdrawal::Model) -> Result<Withdrawal> {
    let status: WithdrawalStatus = parse_status(&model.status, "affiliate_withdrawals")?;
    Ok(Withdrawal {
        id: model.id,
        affiliate_id: model.affiliate_id,
        amount: model.amount,
        pix_key: model.pix_key,
        status,
        requested_at: model.requested_at,
        processed_at: model.processed_at,
        admin_notes: model.admin_notes,
    })
}
