//! 联盟推广核心表迁移
//!
//! 创建归因与佣金账本所需的基础表：
//! - affiliates: 推广人账户与余额
//! - listings: 商品快照（佣金率来源）
//! - affiliate_links: 推广链接（tracking_code 唯一）
//! - affiliate_clicks: 点击记录（24 小时去重窗口）
//! - orders: 订单快照（归因目标）
//! - affiliate_commissions: 佣金账本（order_id 唯一约束）
//! - affiliate_withdrawals: 提现请求

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 1. 创建 affiliates 表
        manager
            .create_table(
                Table::create()
                    .table(Affiliate::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Affiliate::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Affiliate::UserId).string().not_null())
                    .col(
                        ColumnDef::new(Affiliate::AffiliateCode)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Affiliate::PixKey).string().null())
                    .col(
                        ColumnDef::new(Affiliate::TotalEarnings)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Affiliate::AvailableBalance)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Affiliate::ReservedBalance)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Affiliate::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 推广码唯一索引
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_affiliates_code")
                    .table(Affiliate::Table)
                    .col(Affiliate::AffiliateCode)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 2. 创建 listings 表
        manager
            .create_table(
                Table::create()
                    .table(Listing::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Listing::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Listing::Title).text().not_null())
                    .col(
                        ColumnDef::new(Listing::CommissionRateBp)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Listing::AffiliateEnabled)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Listing::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 3. 创建 affiliate_links 表
        manager
            .create_table(
                Table::create()
                    .table(AffiliateLink::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AffiliateLink::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AffiliateLink::AffiliateId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliateLink::ListingId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliateLink::TrackingCode)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliateLink::ClicksCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(AffiliateLink::LastClickedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(AffiliateLink::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // tracking_code 全局唯一
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_links_tracking_code")
                    .table(AffiliateLink::Table)
                    .col(AffiliateLink::TrackingCode)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 每个 (affiliate, listing) 只允许一条链接
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_links_affiliate_listing")
                    .table(AffiliateLink::Table)
                    .col(AffiliateLink::AffiliateId)
                    .col(AffiliateLink::ListingId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 4. 创建 affiliate_clicks 表
        manager
            .create_table(
                Table::create()
                    .table(AffiliateClick::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AffiliateClick::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AffiliateClick::AffiliateLinkId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliateClick::VisitorIp)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliateClick::UserAgent)
                            .text()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(AffiliateClick::Referrer)
                            .text()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(AffiliateClick::ClickedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliateClick::Converted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(AffiliateClick::OrderId).string().null())
                    .to_owned(),
            )
            .await?;

        // 去重窗口查询索引：link + ip + 时间
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_clicks_link_ip_time")
                    .table(AffiliateClick::Table)
                    .col(AffiliateClick::AffiliateLinkId)
                    .col(AffiliateClick::VisitorIp)
                    .col(AffiliateClick::ClickedAt)
                    .to_owned(),
            )
            .await?;

        // 最近未转化点击查询索引（last-click 归因）
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_clicks_link_converted")
                    .table(AffiliateClick::Table)
                    .col(AffiliateClick::AffiliateLinkId)
                    .col(AffiliateClick::Converted)
                    .col(AffiliateClick::ClickedAt)
                    .to_owned(),
            )
            .await?;

        // 5. 创建 orders 表
        manager
            .create_table(
                Table::create()
                    .table(Order::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Order::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Order::ListingId).string().not_null())
                    .col(ColumnDef::new(Order::Amount).big_integer().not_null())
                    .col(ColumnDef::new(Order::BuyerUserId).string().not_null())
                    .col(
                        ColumnDef::new(Order::Status)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Order::AffiliateId).string().null())
                    .col(
                        ColumnDef::new(Order::AffiliateCommission)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Order::TrackingCode)
                            .string_len(64)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Order::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Order::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 6. 创建 affiliate_commissions 表
        manager
            .create_table(
                Table::create()
                    .table(AffiliateCommission::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AffiliateCommission::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AffiliateCommission::AffiliateId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliateCommission::OrderId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliateCommission::ListingId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliateCommission::CommissionRate)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliateCommission::CommissionAmount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliateCommission::OrderAmount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliateCommission::Status)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliateCommission::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliateCommission::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 每个订单最多一条佣金（重复归因靠它拦截）
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_commissions_order")
                    .table(AffiliateCommission::Table)
                    .col(AffiliateCommission::OrderId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 按推广人 + 状态扫描（FIFO 结算、后台列表）
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_commissions_affiliate_status")
                    .table(AffiliateCommission::Table)
                    .col(AffiliateCommission::AffiliateId)
                    .col(AffiliateCommission::Status)
                    .col(AffiliateCommission::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // 7. 创建 affiliate_withdrawals 表
        manager
            .create_table(
                Table::create()
                    .table(AffiliateWithdrawal::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AffiliateWithdrawal::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AffiliateWithdrawal::AffiliateId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliateWithdrawal::Amount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliateWithdrawal::PixKey)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliateWithdrawal::Status)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliateWithdrawal::RequestedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliateWithdrawal::ProcessedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(AffiliateWithdrawal::AdminNotes)
                            .text()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 批量结算扫描索引：状态 + 请求时间
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_withdrawals_status_time")
                    .table(AffiliateWithdrawal::Table)
                    .col(AffiliateWithdrawal::Status)
                    .col(AffiliateWithdrawal::RequestedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_withdrawals_affiliate")
                    .table(AffiliateWithdrawal::Table)
                    .col(AffiliateWithdrawal::AffiliateId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 逆序删除
        manager
            .drop_table(Table::drop().table(AffiliateWithdrawal::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AffiliateCommission::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Order::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AffiliateClick::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AffiliateLink::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Listing::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Affiliate::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Affiliate {
    #[sea_orm(iden = "affiliates")]
    Table,
    Id,
    UserId,
    AffiliateCode,
    PixKey,
    TotalEarnings,
    AvailableBalance,
    ReservedBalance,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Listing {
    #[sea_orm(iden = "listings")]
    Table,
    Id,
    Title,
    CommissionRateBp,
    AffiliateEnabled,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum AffiliateLink {
    #[sea_orm(iden = "affiliate_links")]
    Table,
    Id,
    AffiliateId,
    ListingId,
    TrackingCode,
    ClicksCount,
    LastClickedAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum AffiliateClick {
    #[sea_orm(iden = "affiliate_clicks")]
    Table,
    Id,
    AffiliateLinkId,
    VisitorIp,
    UserAgent,
    Referrer,
    ClickedAt,
    Converted,
    OrderId,
}

#[derive(DeriveIden)]
enum Order {
    #[sea_orm(iden = "orders")]
    Table,
    Id,
    ListingId,
    Amount,
    BuyerUserId,
    Status,
    AffiliateId,
    AffiliateCommission,
    TrackingCode,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum AffiliateCommission {
    #[sea_orm(iden = "affiliate_commissions")]
    Table,
    Id,
    AffiliateId,
    OrderId,
    ListingId,
    CommissionRate,
    CommissionAmount,
    OrderAmount,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum AffiliateWithdrawal {
    #[sea_orm(iden = "affiliate_withdrawals")]
    Table,
    Id,
    AffiliateId,
    Amount,
    PixKey,
    Status,
    RequestedAt,
    ProcessedAt,
    AdminNotes,
}
