//! Commission ledger entry entity

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "affiliate_commissions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub affiliate_id: String,
    /// 每个订单最多一条佣金（唯一索引）
    pub order_id: String,
    pub listing_id: String,
    /// 创建时的快照佣金率（bp），之后不再重算
    pub commission_rate: i32,
    pub commission_amount: i64,
    pub order_amount: i64,
    /// pending | confirmed | canceled | paid
    pub status: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
