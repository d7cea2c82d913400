//! Withdrawal transactions: reservation, rejection, payout settlement
//!
//! 提现申请时即从可用余额划入预留余额，申请成功后这笔钱不可能被
//! 并发申请二次占用。拒绝释放预留，结算扣减预留并做 FIFO 佣金分摊。

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, ExprTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait,
};
use serde::Serialize;
use tracing::{info, warn};

use super::converters::model_to_withdrawal;
use super::outbox::push_outbox;
use super::{SeaOrmStorage, retry};
use crate::errors::{AfflinkError, Result};
use crate::storage::models::{CommissionStatus, OutboxIntent, Withdrawal, WithdrawalStatus};

use migration::entities::{affiliate, affiliate_commission, affiliate_withdrawal, withdrawal_allocation};

/// 一轮批量结算的汇总
#[derive(Debug, Default, Clone, Serialize)]
pub struct PayoutSummary {
    pub processed_affiliates: u64,
    pub completed_withdrawals: u64,
    pub allocated_amount: i64,
}

impl SeaOrmStorage {
    /// 预留余额并落盘提现申请
    ///
    /// `available_balance >= amount` 守卫保证并发申请不会超卖余额，
    /// 守卫失败返回 InsufficientBalance。
    pub async fn reserve_and_insert_withdrawal(
        &self,
        affiliate_id: &str,
        amount: i64,
        pix_key: &str,
        notice: &OutboxIntent,
    ) -> Result<Withdrawal> {
        let now = Utc::now();

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AfflinkError::database_operation(format!("开始事务失败: {}", e)))?;

        let stmt = Query::update()
            .table(affiliate::Entity)
            .value(
                affiliate::Column::AvailableBalance,
                Expr::col(affiliate::Column::AvailableBalance).sub(Expr::val(amount)),
            )
            .value(
                affiliate::Column::ReservedBalance,
                Expr::col(affiliate::Column::ReservedBalance).add(Expr::val(amount)),
            )
            .and_where(Expr::col(affiliate::Column::Id).eq(Expr::val(affiliate_id)))
            .and_where(Expr::col(affiliate::Column::AvailableBalance).gte(Expr::val(amount)))
            .to_owned();

        let reserved = txn
            .execute(&stmt)
            .await
            .map_err(|e| AfflinkError::database_operation(format!("预留提现金额失败: {}", e)))?;

        if reserved.rows_affected() == 0 {
            txn.rollback()
                .await
                .map_err(|e| AfflinkError::database_operation(format!("回滚事务失败: {}", e)))?;
            return Err(AfflinkError::insufficient_balance(format!(
                "可用余额不足: 申请提现 {}",
                amount
            )));
        }

        let model = affiliate_withdrawal::ActiveModel {
            affiliate_id: Set(affiliate_id.to_string()),
            amount: Set(amount),
            pix_key: Set(pix_key.to_string()),
            status: Set(WithdrawalStatus::Pending.to_string()),
            requested_at: Set(now),
            processed_at: Set(None),
            admin_notes: Set(None),
            ..Default::default()
        };

        affiliate_withdrawal::Entity::insert(model)
            .exec(&txn)
            .await
            .map_err(|e| AfflinkError::database_operation(format!("写入提现申请失败: {}", e)))?;

        // 同事务读回拿到数据库分配的主键
        let inserted = affiliate_withdrawal::Entity::find()
            .filter(affiliate_withdrawal::Column::AffiliateId.eq(affiliate_id))
            .order_by_desc(affiliate_withdrawal::Column::Id)
            .one(&txn)
            .await
            .map_err(|e| AfflinkError::database_operation(format!("读回提现申请失败: {}", e)))?
            .ok_or_else(|| {
                AfflinkError::database_operation(format!(
                    "提现申请写入后未能读回: {}",
                    affiliate_id
                ))
            })?;
        let withdrawal = model_to_withdrawal(inserted)?;

        push_outbox(&txn, notice)
            .await
            .map_err(|e| AfflinkError::database_operation(format!("写入通知失败: {}", e)))?;

        txn.commit()
            .await
            .map_err(|e| AfflinkError::database_operation(format!("提交事务失败: {}", e)))?;

        info!(
            "Withdrawal requested: {} by affiliate {} (amount {})",
            withdrawal.id, affiliate_id, amount
        );
        Ok(withdrawal)
    }

    /// 拒绝待处理提现并释放预留余额
    pub async fn reject_withdrawal(
        &self,
        withdrawal_id: i64,
        admin_notes: Option<String>,
        notice: &OutboxIntent,
    ) -> Result<Withdrawal> {
        let now = Utc::now();

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AfflinkError::database_operation(format!("开始事务失败: {}", e)))?;

        let existing = affiliate_withdrawal::Entity::find_by_id(withdrawal_id)
            .one(&txn)
            .await
            .map_err(|e| AfflinkError::database_operation(format!("查询提现申请失败: {}", e)))?;

        let Some(model) = existing else {
            txn.rollback()
                .await
                .map_err(|e| AfflinkError::database_operation(format!("回滚事务失败: {}", e)))?;
            return Err(AfflinkError::not_found(format!(
                "提现申请不存在: {}",
                withdrawal_id
            )));
        };
        let withdrawal = model_to_withdrawal(model)?;

        if withdrawal.status != WithdrawalStatus::Pending {
            txn.rollback()
                .await
                .map_err(|e| AfflinkError::database_operation(format!("回滚事务失败: {}", e)))?;
            return Err(AfflinkError::conflict(format!(
                "提现 {} 不是待处理状态: {}",
                withdrawal_id, withdrawal.status
            )));
        }

        let stmt = Query::update()
            .table(affiliate_withdrawal::Entity)
            .value(
                affiliate_withdrawal::Column::Status,
                WithdrawalStatus::Rejected.to_string(),
            )
            .value(affiliate_withdrawal::Column::ProcessedAt, Some(now))
            .value(affiliate_withdrawal::Column::AdminNotes, admin_notes.clone())
            .and_where(Expr::col(affiliate_withdrawal::Column::Id).eq(Expr::val(withdrawal_id)))
            .and_where(
                Expr::col(affiliate_withdrawal::Column::Status)
                    .eq(Expr::val(WithdrawalStatus::Pending.to_string())),
            )
            .to_owned();

        let rejected = txn
            .execute(&stmt)
            .await
            .map_err(|e| AfflinkError::database_operation(format!("拒绝提现失败: {}", e)))?;

        if rejected.rows_affected() == 0 {
            txn.rollback()
                .await
                .map_err(|e| AfflinkError::database_operation(format!("回滚事务失败: {}", e)))?;
            return Err(AfflinkError::conflict(format!(
                "提现 {} 已被并发处理",
                withdrawal_id
            )));
        }

        // 释放预留：reserved 划回 available
        let stmt = Query::update()
            .table(affiliate::Entity)
            .value(
                affiliate::Column::AvailableBalance,
                Expr::col(affiliate::Column::AvailableBalance).add(Expr::val(withdrawal.amount)),
            )
            .value(
                affiliate::Column::ReservedBalance,
                Expr::col(affiliate::Column::ReservedBalance).sub(Expr::val(withdrawal.amount)),
            )
            .and_where(
                Expr::col(affiliate::Column::Id)
                    .eq(Expr::val(withdrawal.affiliate_id.as_str())),
            )
            .and_where(
                Expr::col(affiliate::Column::ReservedBalance).gte(Expr::val(withdrawal.amount)),
            )
            .to_owned();

        let released = txn
            .execute(&stmt)
            .await
            .map_err(|e| AfflinkError::database_operation(format!("释放预留余额失败: {}", e)))?;

        if released.rows_affected() == 0 {
            txn.rollback()
                .await
                .map_err(|e| AfflinkError::database_operation(format!("回滚事务失败: {}", e)))?;
            return Err(AfflinkError::conflict(format!(
                "预留余额不一致，无法释放: 提现 {} 金额 {}",
                withdrawal_id, withdrawal.amount
            )));
        }

        push_outbox(&txn, notice)
            .await
            .map_err(|e| AfflinkError::database_operation(format!("写入通知失败: {}", e)))?;

        txn.commit()
            .await
            .map_err(|e| AfflinkError::database_operation(format!("提交事务失败: {}", e)))?;

        info!(
            "Withdrawal rejected: {} (affiliate {}, released {})",
            withdrawal_id, withdrawal.affiliate_id, withdrawal.amount
        );
        Ok(Withdrawal {
            status: WithdrawalStatus::Rejected,
            processed_at: Some(now),
            admin_notes,
            ..withdrawal
        })
    }

    /// 有待处理提现的推广人列表，按最早申请时间排序
    pub async fn affiliates_with_pending_withdrawals(&self, limit: u64) -> Result<Vec<String>> {
        let db = &self.db;

        let ids = retry::with_retry(
            "affiliates_with_pending_withdrawals",
            self.retry_config,
            || async move {
                affiliate_withdrawal::Entity::find()
                    .select_only()
                    .column(affiliate_withdrawal::Column::AffiliateId)
                    .filter(
                        affiliate_withdrawal::Column::Status
                            .eq(WithdrawalStatus::Pending.to_string()),
                    )
                    .group_by(affiliate_withdrawal::Column::AffiliateId)
                    .order_by_asc(affiliate_withdrawal::Column::RequestedAt.min())
                    .limit(limit)
                    .into_tuple::<String>()
                    .all(db)
                    .await
            },
        )
        .await
        .map_err(|e| AfflinkError::database_operation(format!("查询待结算推广人失败: {}", e)))?;

        Ok(ids)
    }

    /// 推广人的待处理提现，按申请先后排序
    pub async fn pending_withdrawals_for_affiliate(
        &self,
        affiliate_id: &str,
    ) -> Result<Vec<Withdrawal>> {
        let db = &self.db;
        let affiliate_id = affiliate_id.to_string();

        let models = retry::with_retry(
            "pending_withdrawals_for_affiliate",
            self.retry_config,
            || {
                let affiliate_id = affiliate_id.clone();
                async move {
                    affiliate_withdrawal::Entity::find()
                        .filter(affiliate_withdrawal::Column::AffiliateId.eq(affiliate_id))
                        .filter(
                            affiliate_withdrawal::Column::Status
                                .eq(WithdrawalStatus::Pending.to_string()),
                        )
                        .order_by_asc(affiliate_withdrawal::Column::RequestedAt)
                        .all(db)
                        .await
                }
            },
        )
        .await
        .map_err(|e| AfflinkError::database_operation(format!("查询待处理提现失败: {}", e)))?;

        models.into_iter().map(model_to_withdrawal).collect()
    }

    pub async fn get_withdrawal(&self, withdrawal_id: i64) -> Result<Option<Withdrawal>> {
        let db = &self.db;

        let model = retry::with_retry("get_withdrawal", self.retry_config, || async move {
            affiliate_withdrawal::Entity::find_by_id(withdrawal_id)
                .one(db)
                .await
        })
        .await
        .map_err(|e| AfflinkError::database_operation(format!("查询提现申请失败: {}", e)))?;

        model.map(model_to_withdrawal).transpose()
    }

    /// 结算单笔提现
    ///
    /// 状态机里的 processing 在单事务结算中不可观测，pending 直接落到
    /// completed。提现金额按 FIFO 分摊到最早的 confirmed 佣金上，吃满的
    /// 佣金转为 paid，尾部吃不满的保持 confirmed 留给下一笔。
    ///
    /// 返回本笔分摊的总额；提现已被并发处理时返回 None。
    pub async fn complete_withdrawal(
        &self,
        withdrawal_id: i64,
        notice: &OutboxIntent,
    ) -> Result<Option<i64>> {
        let now = Utc::now();

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AfflinkError::database_operation(format!("开始事务失败: {}", e)))?;

        let existing = affiliate_withdrawal::Entity::find_by_id(withdrawal_id)
            .one(&txn)
            .await
            .map_err(|e| AfflinkError::database_operation(format!("查询提现申请失败: {}", e)))?;

        let Some(model) = existing else {
            txn.rollback()
                .await
                .map_err(|e| AfflinkError::database_operation(format!("回滚事务失败: {}", e)))?;
            return Err(AfflinkError::not_found(format!(
                "提现申请不存在: {}",
                withdrawal_id
            )));
        };
        let withdrawal = model_to_withdrawal(model)?;

        if withdrawal.status != WithdrawalStatus::Pending {
            txn.rollback()
                .await
                .map_err(|e| AfflinkError::database_operation(format!("回滚事务失败: {}", e)))?;
            return Ok(None);
        }

        // 先占住提现行，失败方整个事务什么都不做
        let stmt = Query::update()
            .table(affiliate_withdrawal::Entity)
            .value(
                affiliate_withdrawal::Column::Status,
                WithdrawalStatus::Completed.to_string(),
            )
            .value(affiliate_withdrawal::Column::ProcessedAt, Some(now))
            .and_where(Expr::col(affiliate_withdrawal::Column::Id).eq(Expr::val(withdrawal_id)))
            .and_where(
                Expr::col(affiliate_withdrawal::Column::Status)
                    .eq(Expr::val(WithdrawalStatus::Pending.to_string())),
            )
            .to_owned();

        let claimed = txn
            .execute(&stmt)
            .await
            .map_err(|e| AfflinkError::database_operation(format!("占用提现行失败: {}", e)))?;

        if claimed.rows_affected() == 0 {
            txn.rollback()
                .await
                .map_err(|e| AfflinkError::database_operation(format!("回滚事务失败: {}", e)))?;
            return Ok(None);
        }

        // 预留余额扣减，申请时已预留，守卫失败说明账目被破坏
        let stmt = Query::update()
            .table(affiliate::Entity)
            .value(
                affiliate::Column::ReservedBalance,
                Expr::col(affiliate::Column::ReservedBalance).sub(Expr::val(withdrawal.amount)),
            )
            .and_where(
                Expr::col(affiliate::Column::Id)
                    .eq(Expr::val(withdrawal.affiliate_id.as_str())),
            )
            .and_where(
                Expr::col(affiliate::Column::ReservedBalance).gte(Expr::val(withdrawal.amount)),
            )
            .to_owned();

        let debited = txn
            .execute(&stmt)
            .await
            .map_err(|e| AfflinkError::database_operation(format!("扣减预留余额失败: {}", e)))?;

        if debited.rows_affected() == 0 {
            txn.rollback()
                .await
                .map_err(|e| AfflinkError::database_operation(format!("回滚事务失败: {}", e)))?;
            return Err(AfflinkError::conflict(format!(
                "预留余额不足以完成提现: {} 金额 {}",
                withdrawal_id, withdrawal.amount
            )));
        }

        // FIFO 分摊：最早的 confirmed 佣金先吃
        let commissions = affiliate_commission::Entity::find()
            .filter(
                affiliate_commission::Column::AffiliateId.eq(withdrawal.affiliate_id.as_str()),
            )
            .filter(
                affiliate_commission::Column::Status
                    .eq(CommissionStatus::Confirmed.to_string()),
            )
            .order_by_asc(affiliate_commission::Column::CreatedAt)
            .all(&txn)
            .await
            .map_err(|e| AfflinkError::database_operation(format!("查询可分摊佣金失败: {}", e)))?;

        // 此前提现留下的部分分摊要先扣掉
        let commission_ids: Vec<i64> = commissions.iter().map(|c| c.id).collect();
        let mut allocated: HashMap<i64, i64> = HashMap::new();
        if !commission_ids.is_empty() {
            let rows = withdrawal_allocation::Entity::find()
                .filter(withdrawal_allocation::Column::CommissionId.is_in(commission_ids))
                .all(&txn)
                .await
                .map_err(|e| {
                    AfflinkError::database_operation(format!("查询历史分摊记录失败: {}", e))
                })?;
            for row in rows {
                *allocated.entry(row.commission_id).or_insert(0) += row.amount;
            }
        }

        let mut remaining = withdrawal.amount;
        let mut allocations = Vec::new();
        let mut paid_ids = Vec::new();
        for commission in &commissions {
            if remaining == 0 {
                break;
            }
            let capacity =
                commission.commission_amount - allocated.get(&commission.id).copied().unwrap_or(0);
            if capacity <= 0 {
                continue;
            }
            let take = Ord::min(remaining, capacity);
            allocations.push(withdrawal_allocation::ActiveModel {
                withdrawal_id: Set(withdrawal_id),
                commission_id: Set(commission.id),
                amount: Set(take),
                created_at: Set(now),
                ..Default::default()
            });
            if take == capacity {
                paid_ids.push(commission.id);
            }
            remaining -= take;
        }
        let allocated_amount = withdrawal.amount - remaining;

        if remaining > 0 {
            // 余额里还夹着 pending 佣金时会出现，分摊记录只覆盖 confirmed 部分
            warn!(
                "Withdrawal {} allocation short by {}: confirmed commissions do not cover the amount",
                withdrawal_id, remaining
            );
        }

        if !allocations.is_empty() {
            withdrawal_allocation::Entity::insert_many(allocations)
                .exec(&txn)
                .await
                .map_err(|e| {
                    AfflinkError::database_operation(format!("写入分摊记录失败: {}", e))
                })?;
        }

        if !paid_ids.is_empty() {
            affiliate_commission::Entity::update_many()
                .col_expr(
                    affiliate_commission::Column::Status,
                    Expr::value(CommissionStatus::Paid.to_string()),
                )
                .col_expr(affiliate_commission::Column::UpdatedAt, Expr::value(now))
                .filter(affiliate_commission::Column::Id.is_in(paid_ids.clone()))
                .filter(
                    affiliate_commission::Column::Status
                        .eq(CommissionStatus::Confirmed.to_string()),
                )
                .exec(&txn)
                .await
                .map_err(|e| {
                    AfflinkError::database_operation(format!("标记佣金已支付失败: {}", e))
                })?;
        }

        push_outbox(&txn, notice)
            .await
            .map_err(|e| AfflinkError::database_operation(format!("写入通知失败: {}", e)))?;

        txn.commit()
            .await
            .map_err(|e| AfflinkError::database_operation(format!("提交事务失败: {}", e)))?;

        info!(
            "Withdrawal completed: {} (affiliate {}, amount {}, {} commissions paid)",
            withdrawal_id,
            withdrawal.affiliate_id,
            withdrawal.amount,
            paid_ids.len()
        );
        Ok(Some(allocated_amount))
    }
}
