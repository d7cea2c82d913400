//! Affiliate account entity (balances in integer minor units)

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "affiliates")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    /// 对外展示的推广码，全局唯一
    pub affiliate_code: String,
    pub pix_key: Option<String>,
    /// 历史累计收入（取消时回冲）
    pub total_earnings: i64,
    /// 可用余额，提现时转入 reserved_balance
    pub available_balance: i64,
    pub reserved_balance: i64,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
