//! Recorded click entity (one row per deduplicated visit)

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "affiliate_clicks")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub affiliate_link_id: i64,
    pub visitor_ip: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub user_agent: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub referrer: Option<String>,
    pub clicked_at: DateTimeUtc,
    /// 归因时置 true，同时写入 order_id
    pub converted: bool,
    pub order_id: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
