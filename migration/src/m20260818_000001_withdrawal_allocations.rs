//! 提现结算明细表迁移
//!
//! 记录每笔完成的提现按 FIFO 覆盖了哪些佣金，
//! 供对账与部分覆盖（佣金保持 confirmed）审计。

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(WithdrawalAllocation::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WithdrawalAllocation::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(WithdrawalAllocation::WithdrawalId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WithdrawalAllocation::CommissionId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WithdrawalAllocation::Amount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WithdrawalAllocation::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_allocations_withdrawal")
                    .table(WithdrawalAllocation::Table)
                    .col(WithdrawalAllocation::WithdrawalId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_allocations_commission")
                    .table(WithdrawalAllocation::Table)
                    .col(WithdrawalAllocation::CommissionId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_allocations_commission").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_allocations_withdrawal").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(WithdrawalAllocation::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum WithdrawalAllocation {
    #[sea_orm(iden = "withdrawal_allocations")]
    Table,
    Id,
    WithdrawalId,
    CommissionId,
    Amount,
    CreatedAt,
}
