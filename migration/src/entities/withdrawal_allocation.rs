//! FIFO settlement audit entity (withdrawal -> commission coverage)

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "withdrawal_allocations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub withdrawal_id: i64,
    pub commission_id: i64,
    /// 本次覆盖的金额，可小于佣金全额（部分覆盖）
    pub amount: i64,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
