//! Upstream registry rows: affiliates, listings, orders

use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter};
use tracing::info;

use super::converters::{model_to_affiliate, model_to_listing, model_to_order};
use super::{SeaOrmStorage, retry};
use crate::errors::{AfflinkError, Result};
use crate::storage::models::{AffiliateAccount, Listing, OrderRecord, OrderStatus};

use migration::entities::{affiliate, listing, order};

impl SeaOrmStorage {
    /// 注册推广人账户，余额从 0 开始
    pub async fn insert_affiliate(&self, account: &AffiliateAccount) -> Result<()> {
        let model = affiliate::ActiveModel {
            id: Set(account.id.clone()),
            user_id: Set(account.user_id.clone()),
            affiliate_code: Set(account.affiliate_code.clone()),
            pix_key: Set(account.pix_key.clone()),
            total_earnings: Set(account.total_earnings),
            available_balance: Set(account.available_balance),
            reserved_balance: Set(account.reserved_balance),
            created_at: Set(account.created_at),
        };

        let db = &self.db;
        retry::with_retry("insert_affiliate", self.retry_config, || {
            let model = model.clone();
            async move { affiliate::Entity::insert(model).exec(db).await }
        })
        .await
        .map_err(|e| {
            if retry::is_unique_violation(&e) {
                AfflinkError::conflict(format!("推广人已存在: {}", account.id))
            } else {
                AfflinkError::database_operation(format!("写入推广人失败: {}", e))
            }
        })?;

        info!("Affiliate registered: {} ({})", account.id, account.affiliate_code);
        Ok(())
    }

    pub async fn get_affiliate(&self, affiliate_id: &str) -> Result<Option<AffiliateAccount>> {
        let db = &self.db;
        let id = affiliate_id.to_string();

        let model = retry::with_retry("get_affiliate", self.retry_config, || {
            let id = id.clone();
            async move { affiliate::Entity::find_by_id(id).one(db).await }
        })
        .await
        .map_err(|e| AfflinkError::database_operation(format!("查询推广人失败: {}", e)))?;

        Ok(model.map(model_to_affiliate))
    }

    /// 使用 ON CONFLICT 的原子 upsert，商品目录由上游同步
    pub async fn upsert_listing(&self, item: &Listing) -> Result<()> {
        let model = listing::ActiveModel {
            id: Set(item.id.clone()),
            title: Set(item.title.clone()),
            commission_rate_bp: Set(item.commission_rate_bp),
            affiliate_enabled: Set(item.affiliate_enabled),
            updated_at: Set(Utc::now()),
        };

        let db = &self.db;
        retry::with_retry("upsert_listing", self.retry_config, || {
            let model = model.clone();
            async move {
                listing::Entity::insert(model)
                    .on_conflict(
                        OnConflict::column(listing::Column::Id)
                            .update_columns([
                                listing::Column::Title,
                                listing::Column::CommissionRateBp,
                                listing::Column::AffiliateEnabled,
                                listing::Column::UpdatedAt,
                            ])
                            .to_owned(),
                    )
                    .exec(db)
                    .await
            }
        })
        .await
        .map_err(|e| AfflinkError::database_operation(format!("Upsert 商品 '{}' 失败: {}", item.id, e)))?;

        info!("Listing upserted: {} (rate {} bp)", item.id, item.commission_rate_bp);
        Ok(())
    }

    pub async fn get_listing(&self, listing_id: &str) -> Result<Option<Listing>> {
        let db = &self.db;
        let id = listing_id.to_string();

        let model = retry::with_retry("get_listing", self.retry_config, || {
            let id = id.clone();
            async move { listing::Entity::find_by_id(id).one(db).await }
        })
        .await
        .map_err(|e| AfflinkError::database_operation(format!("查询商品失败: {}", e)))?;

        Ok(model.map(model_to_listing))
    }

    /// 订单落库，归因字段留空等待转化事件
    pub async fn insert_order(&self, record: &OrderRecord) -> Result<()> {
        let model = order::ActiveModel {
            id: Set(record.id.clone()),
            listing_id: Set(record.listing_id.clone()),
            amount: Set(record.amount),
            buyer_user_id: Set(record.buyer_user_id.clone()),
            status: Set(record.status.to_string()),
            affiliate_id: Set(record.affiliate_id.clone()),
            affiliate_commission: Set(record.affiliate_commission),
            tracking_code: Set(record.tracking_code.clone()),
            created_at: Set(record.created_at),
            updated_at: Set(record.updated_at),
        };

        let db = &self.db;
        retry::with_retry("insert_order", self.retry_config, || {
            let model = model.clone();
            async move { order::Entity::insert(model).exec(db).await }
        })
        .await
        .map_err(|e| {
            if retry::is_unique_violation(&e) {
                AfflinkError::conflict(format!("订单已存在: {}", record.id))
            } else {
                AfflinkError::database_operation(format!("写入订单失败: {}", e))
            }
        })?;

        info!("Order ingested: {} (listing {})", record.id, record.listing_id);
        Ok(())
    }

    pub async fn get_order(&self, order_id: &str) -> Result<Option<OrderRecord>> {
        let db = &self.db;
        let id = order_id.to_string();

        let model = retry::with_retry("get_order", self.retry_config, || {
            let id = id.clone();
            async move { order::Entity::find_by_id(id).one(db).await }
        })
        .await
        .map_err(|e| AfflinkError::database_operation(format!("查询订单失败: {}", e)))?;

        model.map(model_to_order).transpose()
    }

    /// 更新订单状态字段本身（账务影响由调用方另行处理）
    pub async fn update_order_status(&self, order_id: &str, status: OrderStatus) -> Result<()> {
        let db = &self.db;
        let id = order_id.to_string();
        let status_str = status.to_string();

        let result = retry::with_retry(
            &format!("update_order_status({})", order_id),
            self.retry_config,
            || {
                let id = id.clone();
                let status_str = status_str.clone();
                async move {
                    order::Entity::update_many()
                        .col_expr(order::Column::Status, Expr::value(status_str))
                        .col_expr(order::Column::UpdatedAt, Expr::value(Utc::now()))
                        .filter(order::Column::Id.eq(id))
                        .exec(db)
                        .await
                }
            },
        )
        .await
        .map_err(|e| AfflinkError::database_operation(format!("更新订单状态失败: {}", e)))?;

        if result.rows_affected == 0 {
            return Err(AfflinkError::not_found(format!("订单不存在: {}", order_id)));
        }

        info!("Order status updated: {} -> {}", order_id, status);
        Ok(())
    }
}
