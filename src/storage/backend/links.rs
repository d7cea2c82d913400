//! Link row operations for SeaOrmStorage

use chrono::Utc;
use sea_orm::{ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use tracing::info;

use super::converters::model_to_link;
use super::{SeaOrmStorage, retry};
use crate::errors::{AfflinkError, Result};
use crate::storage::models::AffiliateLink;

use migration::entities::affiliate_link;

impl SeaOrmStorage {
    /// 插入新推广链接
    ///
    /// 唯一约束冲突（tracking_code 碰撞或并发创建同一 (affiliate, listing) 对）
    /// 映射为 Conflict，由调用方决定重试或返回已有链接。
    pub async fn insert_link(
        &self,
        affiliate_id: &str,
        listing_id: &str,
        tracking_code: &str,
    ) -> Result<AffiliateLink> {
        let created_at = Utc::now();
        let model = affiliate_link::ActiveModel {
            affiliate_id: Set(affiliate_id.to_string()),
            listing_id: Set(listing_id.to_string()),
            tracking_code: Set(tracking_code.to_string()),
            clicks_count: Set(0),
            last_clicked_at: Set(None),
            created_at: Set(created_at),
            ..Default::default()
        };

        let db = &self.db;
        retry::with_retry("insert_link", self.retry_config, || {
            let model = model.clone();
            async move { affiliate_link::Entity::insert(model).exec(db).await }
        })
        .await
        .map_err(|e| {
            if retry::is_unique_violation(&e) {
                AfflinkError::conflict(format!(
                    "链接写入冲突 ({} / {}): {}",
                    affiliate_id, listing_id, e
                ))
            } else {
                AfflinkError::database_operation(format!("创建推广链接失败: {}", e))
            }
        })?;

        info!(
            "Affiliate link created: {} -> listing {} (code {})",
            affiliate_id, listing_id, tracking_code
        );
        self.find_link_by_tracking_code(tracking_code)
            .await?
            .ok_or_else(|| {
                AfflinkError::database_operation(format!(
                    "推广链接写入后未能读回: {}",
                    tracking_code
                ))
            })
    }

    /// 按 (affiliate, listing) 查找已有链接
    pub async fn find_link_by_pair(
        &self,
        affiliate_id: &str,
        listing_id: &str,
    ) -> Result<Option<AffiliateLink>> {
        let db = &self.db;
        let affiliate_id = affiliate_id.to_string();
        let listing_id = listing_id.to_string();

        let model = retry::with_retry("find_link_by_pair", self.retry_config, || {
            let affiliate_id = affiliate_id.clone();
            let listing_id = listing_id.clone();
            async move {
                affiliate_link::Entity::find()
                    .filter(affiliate_link::Column::AffiliateId.eq(affiliate_id))
                    .filter(affiliate_link::Column::ListingId.eq(listing_id))
                    .one(db)
                    .await
            }
        })
        .await
        .map_err(|e| AfflinkError::database_operation(format!("查询推广链接失败: {}", e)))?;

        Ok(model.map(model_to_link))
    }

    /// 按跟踪码查找链接（归因路径）
    pub async fn find_link_by_tracking_code(
        &self,
        tracking_code: &str,
    ) -> Result<Option<AffiliateLink>> {
        let db = &self.db;
        let code = tracking_code.to_string();

        let model = retry::with_retry("find_link_by_tracking_code", self.retry_config, || {
            let code = code.clone();
            async move {
                affiliate_link::Entity::find()
                    .filter(affiliate_link::Column::TrackingCode.eq(code))
                    .one(db)
                    .await
            }
        })
        .await
        .map_err(|e| AfflinkError::database_operation(format!("查询跟踪码失败: {}", e)))?;

        Ok(model.map(model_to_link))
    }

    /// 按 (tracking_code, listing) 查找链接（点击路径，防止跨商品使用跟踪码）
    pub async fn find_link_for_tracking(
        &self,
        tracking_code: &str,
        listing_id: &str,
    ) -> Result<Option<AffiliateLink>> {
        let db = &self.db;
        let code = tracking_code.to_string();
        let listing_id = listing_id.to_string();

        let model = retry::with_retry("find_link_for_tracking", self.retry_config, || {
            let code = code.clone();
            let listing_id = listing_id.clone();
            async move {
                affiliate_link::Entity::find()
                    .filter(affiliate_link::Column::TrackingCode.eq(code))
                    .filter(affiliate_link::Column::ListingId.eq(listing_id))
                    .one(db)
                    .await
            }
        })
        .await
        .map_err(|e| AfflinkError::database_operation(format!("查询跟踪码失败: {}", e)))?;

        Ok(model.map(model_to_link))
    }

    /// 按主键查找链接
    pub async fn get_link(&self, link_id: i64) -> Result<Option<AffiliateLink>> {
        let db = &self.db;

        let model = retry::with_retry("get_link", self.retry_config, || async move {
            affiliate_link::Entity::find_by_id(link_id).one(db).await
        })
        .await
        .map_err(|e| AfflinkError::database_operation(format!("查询推广链接失败: {}", e)))?;

        Ok(model.map(model_to_link))
    }

    /// 列出推广人的全部链接，最新创建在前
    pub async fn list_links_for_affiliate(
        &self,
        affiliate_id: &str,
    ) -> Result<Vec<AffiliateLink>> {
        let db = &self.db;
        let affiliate_id = affiliate_id.to_string();

        let models = retry::with_retry("list_links_for_affiliate", self.retry_config, || {
            let affiliate_id = affiliate_id.clone();
            async move {
                affiliate_link::Entity::find()
                    .filter(affiliate_link::Column::AffiliateId.eq(affiliate_id))
                    .order_by_desc(affiliate_link::Column::CreatedAt)
                    .all(db)
                    .await
            }
        })
        .await
        .map_err(|e| AfflinkError::database_operation(format!("查询推广链接列表失败: {}", e)))?;

        Ok(models.into_iter().map(model_to_link).collect())
    }
}
