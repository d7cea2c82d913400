//! Notification outbox rows
//!
//! 业务事务内通过 [`push_outbox`] 落盘通知，后台分发器轮询投递。
//! 单进程部署下分发器独占轮询，不需要行锁。

use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, ExprTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use tracing::debug;

use super::{SeaOrmStorage, retry};
use crate::errors::{AfflinkError, Result};
use crate::storage::models::{OutboxIntent, OutboxMessage};

use migration::entities::notification_outbox;

/// 在调用方事务内插入一条待投递通知
pub(crate) async fn push_outbox<C: ConnectionTrait>(
    conn: &C,
    intent: &OutboxIntent,
) -> std::result::Result<(), DbErr> {
    let payload = serde_json::to_string(&intent.payload)
        .map_err(|e| DbErr::Custom(format!("通知负载序列化失败: {}", e)))?;

    let now = Utc::now();
    let model = notification_outbox::ActiveModel {
        kind: Set(intent.kind.clone()),
        recipient_user_id: Set(intent.recipient_user_id.clone()),
        payload: Set(payload),
        idempotency_key: Set(intent.idempotency_key.clone()),
        attempts: Set(0),
        last_error: Set(None),
        next_attempt_at: Set(now),
        processed_at: Set(None),
        failed_at: Set(None),
        created_at: Set(now),
        ..Default::default()
    };

    notification_outbox::Entity::insert(model).exec(conn).await?;
    Ok(())
}

fn model_to_message(model: notification_outbox::Model) -> Result<OutboxMessage> {
    let payload = serde_json::from_str(&model.payload).map_err(|e| {
        AfflinkError::database_operation(format!(
            "通知 {} 的负载不是合法 JSON: {}",
            model.id, e
        ))
    })?;
    Ok(OutboxMessage {
        id: model.id,
        kind: model.kind,
        recipient_user_id: model.recipient_user_id,
        payload,
        attempts: model.attempts,
        created_at: model.created_at,
    })
}

impl SeaOrmStorage {
    /// 独立插入一条通知（不挂在业务事务上）
    pub async fn enqueue_notification(&self, intent: &OutboxIntent) -> Result<()> {
        let db = &self.db;

        retry::with_retry("enqueue_notification", self.retry_config, || async move {
            push_outbox(db, intent).await
        })
        .await
        .map_err(|e| AfflinkError::database_operation(format!("写入通知失败: {}", e)))?;

        Ok(())
    }

    /// 取出到期待投递的通知，最早到期在前
    pub async fn claim_due_messages(
        &self,
        now: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<OutboxMessage>> {
        let db = &self.db;

        let models = retry::with_retry("claim_due_messages", self.retry_config, || async move {
            notification_outbox::Entity::find()
                .filter(notification_outbox::Column::ProcessedAt.is_null())
                .filter(notification_outbox::Column::FailedAt.is_null())
                .filter(notification_outbox::Column::NextAttemptAt.lte(now))
                .order_by_asc(notification_outbox::Column::NextAttemptAt)
                .limit(limit)
                .all(db)
                .await
        })
        .await
        .map_err(|e| AfflinkError::database_operation(format!("查询待投递通知失败: {}", e)))?;

        models.into_iter().map(model_to_message).collect()
    }

    /// 投递成功，标记完成
    pub async fn mark_delivered(&self, message_id: i64) -> Result<()> {
        let db = &self.db;

        retry::with_retry("mark_delivered", self.retry_config, || async move {
            notification_outbox::Entity::update_many()
                .col_expr(
                    notification_outbox::Column::ProcessedAt,
                    Expr::value(Some(Utc::now())),
                )
                .filter(notification_outbox::Column::Id.eq(message_id))
                .exec(db)
                .await
        })
        .await
        .map_err(|e| AfflinkError::database_operation(format!("标记通知完成失败: {}", e)))?;

        debug!("Outbox message delivered: {}", message_id);
        Ok(())
    }

    /// 投递失败，记录错误并排期重试；`give_up` 为真时进入死信状态
    pub async fn mark_failed(
        &self,
        message_id: i64,
        error: &str,
        next_attempt_at: DateTime<Utc>,
        give_up: bool,
    ) -> Result<()> {
        let failed_at = if give_up { Some(Utc::now()) } else { None };

        let stmt = Query::update()
            .table(notification_outbox::Entity)
            .value(
                notification_outbox::Column::Attempts,
                Expr::col(notification_outbox::Column::Attempts).add(Expr::val(1)),
            )
            .value(notification_outbox::Column::LastError, Some(error.to_string()))
            .value(notification_outbox::Column::NextAttemptAt, next_attempt_at)
            .value(notification_outbox::Column::FailedAt, failed_at)
            .and_where(Expr::col(notification_outbox::Column::Id).eq(message_id))
            .to_owned();

        let db = &self.db;
        let stmt_ref = &stmt;
        retry::with_retry("mark_failed", self.retry_config, || async {
            db.execute(stmt_ref).await
        })
        .await
        .map_err(|e| AfflinkError::database_operation(format!("标记通知失败状态失败: {}", e)))?;

        Ok(())
    }

    /// 未投递完成的通知数量（健康检查与测试用）
    pub async fn pending_outbox_count(&self) -> Result<u64> {
        use sea_orm::PaginatorTrait;

        let db = &self.db;
        let count = retry::with_retry("pending_outbox_count", self.retry_config, || async move {
            notification_outbox::Entity::find()
                .filter(notification_outbox::Column::ProcessedAt.is_null())
                .filter(notification_outbox::Column::FailedAt.is_null())
                .count(db)
                .await
        })
        .await
        .map_err(|e| AfflinkError::database_operation(format!("统计待投递通知失败: {}", e)))?;

        Ok(count)
    }
}
