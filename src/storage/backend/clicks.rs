//! Click recording and dedup queries for SeaOrmStorage

use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, ExprTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use tracing::debug;

use super::converters::model_to_click;
use super::{SeaOrmStorage, retry};
use crate::errors::{AfflinkError, Result};
use crate::storage::models::AffiliateClick;

use migration::entities::{affiliate_click, affiliate_link};

impl SeaOrmStorage {
    /// 判断去重窗口内是否已有同 (link, ip) 的点击
    pub async fn has_recent_click(
        &self,
        link_id: i64,
        visitor_ip: &str,
        since: DateTime<Utc>,
    ) -> Result<bool> {
        let db = &self.db;
        let ip = visitor_ip.to_string();

        let count = retry::with_retry("has_recent_click", self.retry_config, || {
            let ip = ip.clone();
            async move {
                affiliate_click::Entity::find()
                    .filter(affiliate_click::Column::AffiliateLinkId.eq(link_id))
                    .filter(affiliate_click::Column::VisitorIp.eq(ip))
                    .filter(affiliate_click::Column::ClickedAt.gte(since))
                    .count(db)
                    .await
            }
        })
        .await
        .map_err(|e| AfflinkError::database_operation(format!("查询点击去重窗口失败: {}", e)))?;

        Ok(count > 0)
    }

    /// 记录点击并在同一事务内更新链接计数
    ///
    /// clicks_count 使用列自增表达式而非读改写，并发点击不会丢失计数。
    pub async fn record_click(
        &self,
        link_id: i64,
        visitor_ip: &str,
        user_agent: Option<String>,
        referrer: Option<String>,
    ) -> Result<()> {
        let clicked_at = Utc::now();

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AfflinkError::database_operation(format!("开始事务失败: {}", e)))?;

        let model = affiliate_click::ActiveModel {
            affiliate_link_id: Set(link_id),
            visitor_ip: Set(visitor_ip.to_string()),
            user_agent: Set(user_agent),
            referrer: Set(referrer),
            clicked_at: Set(clicked_at),
            converted: Set(false),
            order_id: Set(None),
            ..Default::default()
        };

        affiliate_click::Entity::insert(model)
            .exec(&txn)
            .await
            .map_err(|e| AfflinkError::database_operation(format!("写入点击记录失败: {}", e)))?;

        let stmt = Query::update()
            .table(affiliate_link::Entity)
            .value(
                affiliate_link::Column::ClicksCount,
                Expr::col(affiliate_link::Column::ClicksCount).add(Expr::val(1i64)),
            )
            .value(affiliate_link::Column::LastClickedAt, clicked_at)
            .and_where(Expr::col(affiliate_link::Column::Id).eq(link_id))
            .to_owned();

        txn.execute(&stmt)
            .await
            .map_err(|e| AfflinkError::database_operation(format!("更新点击计数失败: {}", e)))?;

        txn.commit()
            .await
            .map_err(|e| AfflinkError::database_operation(format!("提交事务失败: {}", e)))?;

        debug!("Click recorded: link {} from {}", link_id, visitor_ip);
        Ok(())
    }

    /// 最近点击列表，最新在前（风控评估用）
    pub async fn recent_clicks(
        &self,
        link_id: i64,
        since: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<AffiliateClick>> {
        let db = &self.db;

        let models = retry::with_retry("recent_clicks", self.retry_config, || async move {
            affiliate_click::Entity::find()
                .filter(affiliate_click::Column::AffiliateLinkId.eq(link_id))
                .filter(affiliate_click::Column::ClickedAt.gte(since))
                .order_by_desc(affiliate_click::Column::ClickedAt)
                .limit(limit)
                .all(db)
                .await
        })
        .await
        .map_err(|e| AfflinkError::database_operation(format!("查询点击记录失败: {}", e)))?;

        Ok(models.into_iter().map(model_to_click).collect())
    }
}
