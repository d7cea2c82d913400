//! Withdrawal and payout tests
//!
//! Reservation accounting on request, release on rejection, and the FIFO
//! commission allocation performed by the payout batch.

use std::sync::{Arc, Once};

use afflink::config::init_config;
use afflink::errors::AfflinkError;
use afflink::services::{
    ConversionService, OrderEventService, OrderStatusEvent, PayoutService, RandomCodeIssuer,
    RegistryService, TrackingCodeIssuer, TrackingLinkService, WithdrawalService,
};
use afflink::storage::{CancelOutcome, CommissionStatus, OutboxIntent, SeaOrmStorage, WithdrawalStatus};
use tempfile::TempDir;

// 确保 config 只初始化一次
static INIT: Once = Once::new();

fn init_test_config() {
    INIT.call_once(|| {
        init_config();
    });
}

/// 创建临时 SQLite 数据库的存储实例
async fn create_temp_storage() -> (Arc<SeaOrmStorage>, TempDir) {
    init_test_config();

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

    let storage = SeaOrmStorage::new(&db_url, "sqlite")
        .await
        .expect("Failed to create storage");

    (Arc::new(storage), temp_dir)
}

/// 通过归因给推广人的余额充值：每笔订单 10000，500 bp → 500 佣金
///
/// `confirm` 为真时订单随即批准，佣金进入 confirmed。
async fn fund_affiliate(
    storage: &Arc<SeaOrmStorage>,
    affiliate_id: &str,
    order_ids: &[&str],
    confirm: bool,
) {
    let issuer: Arc<dyn TrackingCodeIssuer> = Arc::new(RandomCodeIssuer::new(9));
    let registry = RegistryService::new(storage.clone(), issuer.clone());
    let links = TrackingLinkService::new(storage.clone(), issuer);
    let conversion = ConversionService::new(storage.clone());
    let events = OrderEventService::new(storage.clone());

    let listing_id = format!("lst_{}", affiliate_id);
    registry
        .register_affiliate(affiliate_id, &format!("user_{}", affiliate_id), Some("pix@test"))
        .await
        .expect("register affiliate");
    registry
        .upsert_listing(&listing_id, "Test listing", 500, true)
        .await
        .expect("upsert listing");
    let code = links
        .issue_link(affiliate_id, &listing_id)
        .await
        .expect("issue link")
        .link
        .tracking_code;

    for order_id in order_ids {
        registry
            .register_order(order_id, &listing_id, 10_000, "buyer_1", None)
            .await
            .expect("register order");
        conversion.attribute(order_id, &code).await.expect("attribute");

        if confirm {
            events
                .apply_order_status(OrderStatusEvent {
                    order_id: order_id.to_string(),
                    old_status: Some("pending".to_string()),
                    new_status: "approved".to_string(),
                    buyer_user_id: "buyer_1".to_string(),
                    listing_title: None,
                })
                .await
                .expect("approve order");
        }
    }
}

// =============================================================================
// 提现申请校验测试
// =============================================================================

mod request_validation_tests {
    use super::*;

    #[tokio::test]
    async fn test_non_positive_amount_rejected() {
        let (storage, _tmp) = create_temp_storage().await;
        let withdrawals = WithdrawalService::new(storage.clone());

        let err = withdrawals
            .request_withdrawal("aff_w1", 0, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AfflinkError::InvalidAmount(_)));

        let err = withdrawals
            .request_withdrawal("aff_w1", -500, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AfflinkError::InvalidAmount(_)));
    }

    #[tokio::test]
    async fn test_below_minimum_rejected() {
        let (storage, _tmp) = create_temp_storage().await;
        let withdrawals = WithdrawalService::new(storage.clone());

        // 默认最低提现额 1000
        let err = withdrawals
            .request_withdrawal("aff_w2", 999, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AfflinkError::BelowMinimum(_)));
    }

    #[tokio::test]
    async fn test_missing_payout_key_rejected() {
        let (storage, _tmp) = create_temp_storage().await;

        let issuer: Arc<dyn TrackingCodeIssuer> = Arc::new(RandomCodeIssuer::new(9));
        let registry = RegistryService::new(storage.clone(), issuer);
        registry
            .register_affiliate("aff_w3", "user_aff_w3", None)
            .await
            .expect("register affiliate");

        let withdrawals = WithdrawalService::new(storage.clone());
        let err = withdrawals
            .request_withdrawal("aff_w3", 2_000, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AfflinkError::MissingPayoutKey(_)));

        // 空白的请求 key 同样不算
        let err = withdrawals
            .request_withdrawal("aff_w3", 2_000, Some("   "))
            .await
            .unwrap_err();
        assert!(matches!(err, AfflinkError::MissingPayoutKey(_)));
    }

    #[tokio::test]
    async fn test_insufficient_balance_rejected() {
        let (storage, _tmp) = create_temp_storage().await;
        // 两笔订单 → 余额 1000
        fund_affiliate(&storage, "aff_w4", &["ord_w4a", "ord_w4b"], true).await;

        let withdrawals = WithdrawalService::new(storage.clone());
        let err = withdrawals
            .request_withdrawal("aff_w4", 1_001, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AfflinkError::InsufficientBalance(_)));

        // 失败的申请不留任何痕迹
        let affiliate = storage
            .get_affiliate("aff_w4")
            .await
            .expect("get affiliate")
            .expect("affiliate exists");
        assert_eq!(affiliate.available_balance, 1_000);
        assert_eq!(affiliate.reserved_balance, 0);
    }
}

// =============================================================================
// 预留与拒绝测试
// =============================================================================

mod reservation_tests {
    use super::*;

    #[tokio::test]
    async fn test_request_moves_available_to_reserved() {
        let (storage, _tmp) = create_temp_storage().await;
        fund_affiliate(&storage, "aff_r1", &["ord_r1a", "ord_r1b", "ord_r1c"], true).await;

        let withdrawals = WithdrawalService::new(storage.clone());
        let withdrawal = withdrawals
            .request_withdrawal("aff_r1", 1_200, None)
            .await
            .expect("request withdrawal");
        assert_eq!(withdrawal.status, WithdrawalStatus::Pending);
        assert_eq!(withdrawal.amount, 1_200);
        assert_eq!(withdrawal.pix_key, "pix@test");

        let affiliate = storage
            .get_affiliate("aff_r1")
            .await
            .expect("get affiliate")
            .expect("affiliate exists");
        assert_eq!(affiliate.available_balance, 300);
        assert_eq!(affiliate.reserved_balance, 1_200);
        // total_earnings 不受提现影响
        assert_eq!(affiliate.total_earnings, 1_500);
    }

    #[tokio::test]
    async fn test_exact_balance_request_succeeds_once() {
        let (storage, _tmp) = create_temp_storage().await;
        fund_affiliate(&storage, "aff_r2", &["ord_r2a", "ord_r2b"], true).await;

        let withdrawals = WithdrawalService::new(storage.clone());
        withdrawals
            .request_withdrawal("aff_r2", 1_000, None)
            .await
            .expect("exact-balance request");

        // 余额已全部预留，第二笔申请失败
        let err = withdrawals
            .request_withdrawal("aff_r2", 1_000, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AfflinkError::InsufficientBalance(_)));
    }

    #[tokio::test]
    async fn test_reject_releases_reservation() {
        let (storage, _tmp) = create_temp_storage().await;
        fund_affiliate(&storage, "aff_r3", &["ord_r3a", "ord_r3b"], true).await;

        let withdrawals = WithdrawalService::new(storage.clone());
        let withdrawal = withdrawals
            .request_withdrawal("aff_r3", 1_000, None)
            .await
            .expect("request withdrawal");

        let rejected = withdrawals
            .reject_withdrawal(withdrawal.id, Some("invalid pix key"))
            .await
            .expect("reject withdrawal");
        assert_eq!(rejected.status, WithdrawalStatus::Rejected);
        assert_eq!(rejected.admin_notes.as_deref(), Some("invalid pix key"));
        assert!(rejected.processed_at.is_some());

        // 预留释放回可用余额
        let affiliate = storage
            .get_affiliate("aff_r3")
            .await
            .expect("get affiliate")
            .expect("affiliate exists");
        assert_eq!(affiliate.available_balance, 1_000);
        assert_eq!(affiliate.reserved_balance, 0);

        // 已拒绝的提现不能再拒绝
        let err = withdrawals
            .reject_withdrawal(withdrawal.id, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AfflinkError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_reject_unknown_withdrawal() {
        let (storage, _tmp) = create_temp_storage().await;
        let withdrawals = WithdrawalService::new(storage.clone());

        let err = withdrawals.reject_withdrawal(424_242, None).await.unwrap_err();
        assert!(matches!(err, AfflinkError::NotFound(_)));
    }
}

// =============================================================================
// 批量结算与 FIFO 分摊测试
// =============================================================================

mod payout_tests {
    use super::*;

    #[tokio::test]
    async fn test_payout_allocates_fifo_and_marks_paid() {
        let (storage, _tmp) = create_temp_storage().await;
        // 三笔 confirmed 佣金，各 500，入账顺序 a → b → c
        fund_affiliate(&storage, "aff_p1", &["ord_p1a", "ord_p1b", "ord_p1c"], true).await;

        let withdrawals = WithdrawalService::new(storage.clone());
        // 1200 = 吃满 a (500) + 吃满 b (500) + c 的 200
        let withdrawal = withdrawals
            .request_withdrawal("aff_p1", 1_200, None)
            .await
            .expect("request withdrawal");

        let payouts = PayoutService::new(storage.clone());
        let summary = payouts.process_payouts(Some(10)).await.expect("payout run");
        assert_eq!(summary.processed_affiliates, 1);
        assert_eq!(summary.completed_withdrawals, 1);
        assert_eq!(summary.allocated_amount, 1_200);

        let settled = storage
            .get_withdrawal(withdrawal.id)
            .await
            .expect("get withdrawal")
            .expect("withdrawal exists");
        assert_eq!(settled.status, WithdrawalStatus::Completed);
        assert!(settled.processed_at.is_some());

        // 预留扣干净，可用余额剩 300
        let affiliate = storage
            .get_affiliate("aff_p1")
            .await
            .expect("get affiliate")
            .expect("affiliate exists");
        assert_eq!(affiliate.reserved_balance, 0);
        assert_eq!(affiliate.available_balance, 300);

        // FIFO：前两笔吃满转 paid，第三笔部分分摊保持 confirmed
        let a = storage
            .find_commission_by_order("ord_p1a")
            .await
            .expect("find a")
            .expect("a exists");
        let b = storage
            .find_commission_by_order("ord_p1b")
            .await
            .expect("find b")
            .expect("b exists");
        let c = storage
            .find_commission_by_order("ord_p1c")
            .await
            .expect("find c")
            .expect("c exists");
        assert_eq!(a.status, CommissionStatus::Paid);
        assert_eq!(b.status, CommissionStatus::Paid);
        assert_eq!(c.status, CommissionStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_partial_allocation_carries_over() {
        let (storage, _tmp) = create_temp_storage().await;
        fund_affiliate(&storage, "aff_p2", &["ord_p2a", "ord_p2b"], true).await;

        let withdrawals = WithdrawalService::new(storage.clone());
        let payouts = PayoutService::new(storage.clone());

        // 第一笔 700：吃满 a，b 吃 200
        withdrawals
            .request_withdrawal("aff_p2", 700, None)
            .await
            .expect("first request");
        payouts.process_payouts(None).await.expect("first run");

        let b = storage
            .find_commission_by_order("ord_p2b")
            .await
            .expect("find b")
            .expect("b exists");
        assert_eq!(b.status, CommissionStatus::Confirmed);

        // 第二笔 300：b 的剩余 300 被吃满，转 paid
        withdrawals
            .request_withdrawal("aff_p2", 300, None)
            .await
            .expect("second request");
        let summary = payouts.process_payouts(None).await.expect("second run");
        assert_eq!(summary.completed_withdrawals, 1);
        assert_eq!(summary.allocated_amount, 300);

        let b = storage
            .find_commission_by_order("ord_p2b")
            .await
            .expect("find b")
            .expect("b exists");
        assert_eq!(b.status, CommissionStatus::Paid);
    }

    #[tokio::test]
    async fn test_empty_run_is_a_noop() {
        let (storage, _tmp) = create_temp_storage().await;

        let payouts = PayoutService::new(storage.clone());
        let summary = payouts.process_payouts(None).await.expect("payout run");
        assert_eq!(summary.processed_affiliates, 0);
        assert_eq!(summary.completed_withdrawals, 0);
        assert_eq!(summary.allocated_amount, 0);
    }

    #[tokio::test]
    async fn test_cancel_leaves_paid_commission_untouched() {
        let (storage, _tmp) = create_temp_storage().await;
        fund_affiliate(&storage, "aff_p3", &["ord_p3a", "ord_p3b", "ord_p3c"], true).await;

        let withdrawals = WithdrawalService::new(storage.clone());
        withdrawals
            .request_withdrawal("aff_p3", 1_000, None)
            .await
            .expect("request withdrawal");
        PayoutService::new(storage.clone())
            .process_payouts(None)
            .await
            .expect("payout run");

        let paid = storage
            .find_commission_by_order("ord_p3a")
            .await
            .expect("find commission")
            .expect("commission exists");
        assert_eq!(paid.status, CommissionStatus::Paid);

        // 已支付佣金不在取消流程中追回
        let notice = OutboxIntent::new("commission_canceled", "user_aff_p3", serde_json::json!({}));
        let outcome = storage
            .cancel_commission_for_order("ord_p3a", &notice)
            .await
            .expect("cancel call");
        assert!(matches!(outcome, CancelOutcome::PaidUntouched));

        let still_paid = storage
            .find_commission_by_order("ord_p3a")
            .await
            .expect("find commission")
            .expect("commission exists");
        assert_eq!(still_paid.status, CommissionStatus::Paid);
    }
}

// =============================================================================
// 待处理提现列表测试
// =============================================================================

mod pending_list_tests {
    use super::*;

    #[tokio::test]
    async fn test_pending_withdrawals_oldest_first() {
        let (storage, _tmp) = create_temp_storage().await;
        fund_affiliate(
            &storage,
            "aff_q1",
            &["ord_q1a", "ord_q1b", "ord_q1c", "ord_q1d"],
            true,
        )
        .await;

        let withdrawals = WithdrawalService::new(storage.clone());
        let first = withdrawals
            .request_withdrawal("aff_q1", 1_000, None)
            .await
            .expect("first request");
        let second = withdrawals
            .request_withdrawal("aff_q1", 1_000, None)
            .await
            .expect("second request");

        let pending = withdrawals
            .pending_withdrawals("aff_q1")
            .await
            .expect("pending list");
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].id, first.id);
        assert_eq!(pending[1].id, second.id);
    }
}
