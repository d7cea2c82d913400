//! Withdrawal request entity

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "affiliate_withdrawals")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub affiliate_id: String,
    /// 请求时已从 available 转入 reserved
    pub amount: i64,
    pub pix_key: String,
    /// pending | processing | completed | rejected
    pub status: String,
    pub requested_at: DateTimeUtc,
    pub processed_at: Option<DateTimeUtc>,
    #[sea_orm(column_type = "Text", nullable)]
    pub admin_notes: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
