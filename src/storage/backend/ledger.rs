//! Commission lifecycle transactions driven by order status events

use chrono::Utc;
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, ExprTrait, QueryFilter, TransactionTrait};
use tracing::{info, warn};

use super::converters::model_to_commission;
use super::outbox::push_outbox;
use super::SeaOrmStorage;
use crate::errors::{AfflinkError, Result};
use crate::storage::models::{Commission, CommissionStatus, OutboxIntent};

use migration::entities::{affiliate, affiliate_commission};

/// 取消事件的处理结果
#[derive(Debug)]
pub enum CancelOutcome {
    /// 佣金已取消且余额完成冲销
    Reversed(Commission),
    /// 没有佣金或已是取消状态，重复取消事件在此吸收
    Skipped,
    /// 已支付佣金不在取消流程中追回
    PaidUntouched,
}

impl SeaOrmStorage {
    /// 订单批准：pending 佣金转为 confirmed，并落盘通知
    ///
    /// 返回确认后的佣金；订单没有佣金或佣金不在 pending 状态时返回 None。
    pub async fn confirm_commission_for_order(
        &self,
        order_id: &str,
        notice: &OutboxIntent,
    ) -> Result<Option<Commission>> {
        let now = Utc::now();

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AfflinkError::database_operation(format!("开始事务失败: {}", e)))?;

        // 守卫式状态迁移，并发重复事件最多一方生效
        let stmt = Query::update()
            .table(affiliate_commission::Entity)
            .value(
                affiliate_commission::Column::Status,
                CommissionStatus::Confirmed.to_string(),
            )
            .value(affiliate_commission::Column::UpdatedAt, now)
            .and_where(
                Expr::col(affiliate_commission::Column::OrderId).eq(Expr::val(order_id)),
            )
            .and_where(
                Expr::col(affiliate_commission::Column::Status)
                    .eq(Expr::val(CommissionStatus::Pending.to_string())),
            )
            .to_owned();

        let confirmed = txn
            .execute(&stmt)
            .await
            .map_err(|e| AfflinkError::database_operation(format!("确认佣金失败: {}", e)))?;

        if confirmed.rows_affected() == 0 {
            txn.rollback()
                .await
                .map_err(|e| AfflinkError::database_operation(format!("回滚事务失败: {}", e)))?;
            return Ok(None);
        }

        push_outbox(&txn, notice)
            .await
            .map_err(|e| AfflinkError::database_operation(format!("写入通知失败: {}", e)))?;

        let commission = affiliate_commission::Entity::find()
            .filter(affiliate_commission::Column::OrderId.eq(order_id))
            .one(&txn)
            .await
            .map_err(|e| AfflinkError::database_operation(format!("读回佣金记录失败: {}", e)))?
            .ok_or_else(|| {
                AfflinkError::database_operation(format!("佣金记录确认后未能读回: {}", order_id))
            })?;
        let commission = model_to_commission(commission)?;

        txn.commit()
            .await
            .map_err(|e| AfflinkError::database_operation(format!("提交事务失败: {}", e)))?;

        info!(
            "Commission confirmed: order {} -> affiliate {} ({})",
            order_id, commission.affiliate_id, commission.commission_amount
        );
        Ok(Some(commission))
    }

    /// 订单取消：pending / confirmed 佣金转为 canceled 并冲销余额
    ///
    /// 冲销带 `available_balance >= amount` 守卫，余额已被提走时返回
    /// Conflict 而不是把余额写成负数。
    pub async fn cancel_commission_for_order(
        &self,
        order_id: &str,
        notice: &OutboxIntent,
    ) -> Result<CancelOutcome> {
        let now = Utc::now();

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AfflinkError::database_operation(format!("开始事务失败: {}", e)))?;

        let existing = affiliate_commission::Entity::find()
            .filter(affiliate_commission::Column::OrderId.eq(order_id))
            .one(&txn)
            .await
            .map_err(|e| AfflinkError::database_operation(format!("查询佣金记录失败: {}", e)))?;

        let Some(model) = existing else {
            txn.rollback()
                .await
                .map_err(|e| AfflinkError::database_operation(format!("回滚事务失败: {}", e)))?;
            return Ok(CancelOutcome::Skipped);
        };
        let commission = model_to_commission(model)?;

        match commission.status {
            CommissionStatus::Canceled => {
                txn.rollback().await.map_err(|e| {
                    AfflinkError::database_operation(format!("回滚事务失败: {}", e))
                })?;
                return Ok(CancelOutcome::Skipped);
            }
            CommissionStatus::Paid => {
                txn.rollback().await.map_err(|e| {
                    AfflinkError::database_operation(format!("回滚事务失败: {}", e))
                })?;
                warn!(
                    "Cancel event for paid commission ignored: order {} (commission {})",
                    order_id, commission.id
                );
                return Ok(CancelOutcome::PaidUntouched);
            }
            CommissionStatus::Pending | CommissionStatus::Confirmed => {}
        }

        let stmt = Query::update()
            .table(affiliate_commission::Entity)
            .value(
                affiliate_commission::Column::Status,
                CommissionStatus::Canceled.to_string(),
            )
            .value(affiliate_commission::Column::UpdatedAt, now)
            .and_where(Expr::col(affiliate_commission::Column::Id).eq(Expr::val(commission.id)))
            .and_where(Expr::col(affiliate_commission::Column::Status).is_in([
                CommissionStatus::Pending.to_string(),
                CommissionStatus::Confirmed.to_string(),
            ]))
            .to_owned();

        let canceled = txn
            .execute(&stmt)
            .await
            .map_err(|e| AfflinkError::database_operation(format!("取消佣金失败: {}", e)))?;

        if canceled.rows_affected() == 0 {
            txn.rollback()
                .await
                .map_err(|e| AfflinkError::database_operation(format!("回滚事务失败: {}", e)))?;
            return Ok(CancelOutcome::Skipped);
        }

        // 守卫式冲销：余额必须足够扣减
        let amount = commission.commission_amount;
        let stmt = Query::update()
            .table(affiliate::Entity)
            .value(
                affiliate::Column::TotalEarnings,
                Expr::col(affiliate::Column::TotalEarnings).sub(Expr::val(amount)),
            )
            .value(
                affiliate::Column::AvailableBalance,
                Expr::col(affiliate::Column::AvailableBalance).sub(Expr::val(amount)),
            )
            .and_where(
                Expr::col(affiliate::Column::Id).eq(Expr::val(commission.affiliate_id.as_str())),
            )
            .and_where(Expr::col(affiliate::Column::AvailableBalance).gte(Expr::val(amount)))
            .to_owned();

        let reversed = txn
            .execute(&stmt)
            .await
            .map_err(|e| AfflinkError::database_operation(format!("冲销余额失败: {}", e)))?;

        if reversed.rows_affected() == 0 {
            txn.rollback()
                .await
                .map_err(|e| AfflinkError::database_operation(format!("回滚事务失败: {}", e)))?;
            return Err(AfflinkError::conflict(format!(
                "可用余额不足以冲销佣金: 订单 {} 金额 {}",
                order_id, amount
            )));
        }

        push_outbox(&txn, notice)
            .await
            .map_err(|e| AfflinkError::database_operation(format!("写入通知失败: {}", e)))?;

        txn.commit()
            .await
            .map_err(|e| AfflinkError::database_operation(format!("提交事务失败: {}", e)))?;

        info!(
            "Commission canceled and reversed: order {} -> affiliate {} (-{})",
            order_id, commission.affiliate_id, amount
        );
        Ok(CancelOutcome::Reversed(Commission {
            status: CommissionStatus::Canceled,
            updated_at: now,
            ..commission
        }))
    }
}
