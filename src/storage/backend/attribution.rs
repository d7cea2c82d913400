//! Conversion attribution transaction
//!
//! 归因的四步写入必须同生共死：订单打标、佣金入账、余额上账、
//! 点击标记转化，外加一条 outbox 通知。任何一步失败整体回滚。

use chrono::Utc;
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, ExprTrait, QueryFilter,
    QueryOrder, TransactionTrait,
};
use tracing::{info, warn};

use super::converters::model_to_commission;
use super::outbox::push_outbox;
use super::{SeaOrmStorage, retry};
use crate::errors::{AfflinkError, Result};
use crate::storage::models::{Commission, CommissionStatus, OutboxIntent};

use migration::entities::{affiliate, affiliate_click, affiliate_commission, order};

/// 归因事务的全部写入参数，金额由服务层预先算好
#[derive(Debug, Clone)]
pub struct AttributionWrite {
    pub order_id: String,
    pub link_id: i64,
    pub affiliate_id: String,
    pub listing_id: String,
    pub tracking_code: String,
    pub order_amount: i64,
    pub commission_rate_bp: i32,
    pub commission_amount: i64,
}

/// 归因事务的结果
#[derive(Debug)]
pub enum AttributionOutcome {
    /// 本次调用完成了归因
    Applied(Commission),
    /// 订单早已归因，调用方按成功处理并返回已有佣金
    AlreadyAttributed,
}

impl SeaOrmStorage {
    /// 执行归因事务
    ///
    /// 订单行上的 `affiliate_id IS NULL` 守卫与佣金表的 order_id 唯一索引
    /// 双重保证同一订单只入账一次；竞争失败的一方拿到 `AlreadyAttributed`。
    pub async fn attribute_conversion(
        &self,
        write: &AttributionWrite,
        notice: &OutboxIntent,
    ) -> Result<AttributionOutcome> {
        let now = Utc::now();

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AfflinkError::database_operation(format!("开始事务失败: {}", e)))?;

        // 1. 守卫式订单打标：只有未归因的订单才会被更新
        let stmt = Query::update()
            .table(order::Entity)
            .value(order::Column::AffiliateId, Some(write.affiliate_id.clone()))
            .value(
                order::Column::AffiliateCommission,
                Some(write.commission_amount),
            )
            .value(order::Column::TrackingCode, Some(write.tracking_code.clone()))
            .value(order::Column::UpdatedAt, now)
            .and_where(Expr::col(order::Column::Id).eq(Expr::val(write.order_id.as_str())))
            .and_where(Expr::col(order::Column::AffiliateId).is_null())
            .to_owned();

        let marked = txn
            .execute(&stmt)
            .await
            .map_err(|e| AfflinkError::database_operation(format!("订单归因打标失败: {}", e)))?;

        if marked.rows_affected() == 0 {
            txn.rollback()
                .await
                .map_err(|e| AfflinkError::database_operation(format!("回滚事务失败: {}", e)))?;
            return Ok(AttributionOutcome::AlreadyAttributed);
        }

        // 2. 佣金入账（pending），order_id 唯一索引兜底防止重复入账
        let commission_model = affiliate_commission::ActiveModel {
            affiliate_id: Set(write.affiliate_id.clone()),
            order_id: Set(write.order_id.clone()),
            listing_id: Set(write.listing_id.clone()),
            commission_rate: Set(write.commission_rate_bp),
            commission_amount: Set(write.commission_amount),
            order_amount: Set(write.order_amount),
            status: Set(CommissionStatus::Pending.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        if let Err(e) = affiliate_commission::Entity::insert(commission_model)
            .exec(&txn)
            .await
        {
            let already = retry::is_unique_violation(&e);
            txn.rollback()
                .await
                .map_err(|e| AfflinkError::database_operation(format!("回滚事务失败: {}", e)))?;
            if already {
                warn!(
                    "Commission row already exists for order {}, treating as attributed",
                    write.order_id
                );
                return Ok(AttributionOutcome::AlreadyAttributed);
            }
            return Err(AfflinkError::database_operation(format!(
                "佣金入账失败: {}",
                e
            )));
        }

        // 3. 余额上账：列自增表达式，total_earnings 与 available_balance 同步增加
        let stmt = Query::update()
            .table(affiliate::Entity)
            .value(
                affiliate::Column::TotalEarnings,
                Expr::col(affiliate::Column::TotalEarnings).add(Expr::val(write.commission_amount)),
            )
            .value(
                affiliate::Column::AvailableBalance,
                Expr::col(affiliate::Column::AvailableBalance)
                    .add(Expr::val(write.commission_amount)),
            )
            .and_where(Expr::col(affiliate::Column::Id).eq(Expr::val(write.affiliate_id.as_str())))
            .to_owned();

        let credited = txn
            .execute(&stmt)
            .await
            .map_err(|e| AfflinkError::database_operation(format!("余额上账失败: {}", e)))?;

        if credited.rows_affected() == 0 {
            txn.rollback()
                .await
                .map_err(|e| AfflinkError::database_operation(format!("回滚事务失败: {}", e)))?;
            return Err(AfflinkError::not_found(format!(
                "推广人不存在: {}",
                write.affiliate_id
            )));
        }

        // 4. 标记最近一次未转化点击；该链接没有未转化点击时跳过
        let latest_click = affiliate_click::Entity::find()
            .filter(affiliate_click::Column::AffiliateLinkId.eq(write.link_id))
            .filter(affiliate_click::Column::Converted.eq(false))
            .order_by_desc(affiliate_click::Column::ClickedAt)
            .one(&txn)
            .await
            .map_err(|e| AfflinkError::database_operation(format!("查询待转化点击失败: {}", e)))?;

        if let Some(click) = latest_click {
            affiliate_click::Entity::update_many()
                .col_expr(affiliate_click::Column::Converted, Expr::value(true))
                .col_expr(
                    affiliate_click::Column::OrderId,
                    Expr::value(Some(write.order_id.clone())),
                )
                .filter(affiliate_click::Column::Id.eq(click.id))
                .exec(&txn)
                .await
                .map_err(|e| {
                    AfflinkError::database_operation(format!("标记点击转化失败: {}", e))
                })?;
        }

        // 5. 通知与账务同事务落盘
        push_outbox(&txn, notice)
            .await
            .map_err(|e| AfflinkError::database_operation(format!("写入通知失败: {}", e)))?;

        let commission = affiliate_commission::Entity::find()
            .filter(affiliate_commission::Column::OrderId.eq(write.order_id.as_str()))
            .one(&txn)
            .await
            .map_err(|e| AfflinkError::database_operation(format!("读回佣金记录失败: {}", e)))?
            .ok_or_else(|| {
                AfflinkError::database_operation(format!(
                    "佣金记录写入后未能读回: {}",
                    write.order_id
                ))
            })?;
        let commission = model_to_commission(commission)?;

        txn.commit()
            .await
            .map_err(|e| AfflinkError::database_operation(format!("提交事务失败: {}", e)))?;

        info!(
            "Conversion attributed: order {} -> affiliate {} ({} @ {} bp)",
            write.order_id, write.affiliate_id, write.commission_amount, write.commission_rate_bp
        );
        Ok(AttributionOutcome::Applied(commission))
    }

    /// 按订单号查找佣金记录
    pub async fn find_commission_by_order(&self, order_id: &str) -> Result<Option<Commission>> {
        let db = &self.db;
        let order_id = order_id.to_string();

        let model = retry::with_retry("find_commission_by_order", self.retry_config, || {
            let order_id = order_id.clone();
            async move {
                affiliate_commission::Entity::find()
                    .filter(affiliate_commission::Column::OrderId.eq(order_id))
                    .one(db)
                    .await
            }
        })
        .await
        .map_err(|e| AfflinkError::database_operation(format!("查询佣金记录失败: {}", e)))?;

        model.map(model_to_commission).transpose()
    }
}
