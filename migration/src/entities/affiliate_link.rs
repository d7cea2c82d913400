//! Affiliate tracking link entity

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "affiliate_links")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub affiliate_id: String,
    pub listing_id: String,
    /// 不透明跟踪码，签发后不可变
    pub tracking_code: String,
    pub clicks_count: i64,
    pub last_clicked_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
