//! 通知 outbox 表迁移
//!
//! 账本事务内写入通知意图，后台任务轮询投递。
//! idempotency_key 唯一约束防止重复入队。

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(NotificationOutbox::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(NotificationOutbox::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(NotificationOutbox::Kind)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(NotificationOutbox::RecipientUserId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(NotificationOutbox::Payload)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(NotificationOutbox::IdempotencyKey)
                            .string_len(128)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(NotificationOutbox::Attempts)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(NotificationOutbox::LastError)
                            .text()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(NotificationOutbox::NextAttemptAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(NotificationOutbox::ProcessedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(NotificationOutbox::FailedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(NotificationOutbox::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 重复入队拦截
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_outbox_idempotency")
                    .table(NotificationOutbox::Table)
                    .col(NotificationOutbox::IdempotencyKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 到期投递扫描索引
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_outbox_next_attempt")
                    .table(NotificationOutbox::Table)
                    .col(NotificationOutbox::NextAttemptAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_outbox_next_attempt").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_outbox_idempotency").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(NotificationOutbox::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum NotificationOutbox {
    #[sea_orm(iden = "notification_outbox")]
    Table,
    Id,
    Kind,
    RecipientUserId,
    Payload,
    IdempotencyKey,
    Attempts,
    LastError,
    NextAttemptAt,
    ProcessedAt,
    FailedAt,
    CreatedAt,
}
