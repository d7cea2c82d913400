//! Order snapshot entity (registered by the marketplace backend)

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub listing_id: String,
    /// 订单金额，整数最小货币单位
    pub amount: i64,
    pub buyer_user_id: String,
    pub status: String,
    /// 归因字段：仅在归因事务中一次性写入
    pub affiliate_id: Option<String>,
    pub affiliate_commission: Option<i64>,
    pub tracking_code: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
