//! Commission ledger state machine tests
//!
//! Order lifecycle events against temporary SQLite databases: approval
//! confirms, cancellation reverses the credit, terminal states absorb
//! repeat events.

use std::sync::{Arc, Once};

use afflink::config::init_config;
use afflink::errors::AfflinkError;
use afflink::services::{
    ConversionService, OrderEventService, OrderStatusEvent, RandomCodeIssuer, RegistryService,
    TrackingCodeIssuer, TrackingLinkService,
};
use afflink::storage::{CommissionStatus, OrderStatus, SeaOrmStorage};
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

fn status_event(order_id: &str, new_status: &str) -> OrderStatusEvent {
    OrderStatusEvent {
        order_id: order_id.to_string(),
        old_status: Some("pending".to_string()),
        new_status: new_status.to_string(),
        buyer_user_id: "buyer_1".to_string(),
        listing_title: Some("Test listing".to_string()),
    }
}

/// 铺好数据并完成归因，返回归因后的佣金金额
async fn seed_attributed_order(
    storage: &Arc<SeaOrmStorage>,
    affiliate_id: &str,
    listing_id: &str,
    order_id: &str,
) -> i64 {
    let issuer: Arc<dyn TrackingCodeIssuer> = Arc::new(RandomCodeIssuer::new(9));
    let registry = RegistryService::new(storage.clone(), issuer.clone());
    let links = TrackingLinkService::new(storage.clone(), issuer);

    registry
        .register_affiliate(affiliate_id, &format!("user_{}", affiliate_id), None)
        .await
        .expect("register affiliate");
    registry
        .upsert_listing(listing_id, "Test listing", 500, true)
        .await
        .expect("upsert listing");
    registry
        .register_order(order_id, listing_id, 10_000, "buyer_1", None)
        .await
        .expect("register order");

    let issued = links
        .issue_link(affiliate_id, listing_id)
        .await
        .expect("issue link");

    let conversion = ConversionService::new(storage.clone());
    let result = conversion
        .attribute(order_id, &issued.link.tracking_code)
        .await
        .expect("attribute");
    result.commission_amount
}

// =============================================================================
// 确认路径测试
// =============================================================================

mod confirm_tests {
    use super::*;

    #[tokio::test]
    async fn test_approved_confirms_pending_commission() {
        let (storage, _tmp) = create_temp_storage().await;
        seed_attributed_order(&storage, "aff_c1", "lst_c1", "ord_c1").await;

        let events = OrderEventService::new(storage.clone());
        let result = events
            .apply_order_status(status_event("ord_c1", "approved"))
            .await
            .expect("apply approved");

        assert_eq!(result.new_status, OrderStatus::Approved);
        // 推广人 + 买家各一条通知
        assert_eq!(result.notifications_sent, 2);

        let commission = storage
            .find_commission_by_order("ord_c1")
            .await
            .expect("find commission")
            .expect("commission exists");
        assert_eq!(commission.status, CommissionStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_repeat_approval_confirms_once() {
        let (storage, _tmp) = create_temp_storage().await;
        seed_attributed_order(&storage, "aff_c2", "lst_c2", "ord_c2").await;

        let events = OrderEventService::new(storage.clone());
        events
            .apply_order_status(status_event("ord_c2", "approved"))
            .await
            .expect("first approval");

        // 重复事件只发买家通知
        let second = events
            .apply_order_status(status_event("ord_c2", "approved"))
            .await
            .expect("second approval");
        assert_eq!(second.notifications_sent, 1);

        let commission = storage
            .find_commission_by_order("ord_c2")
            .await
            .expect("find commission")
            .expect("commission exists");
        assert_eq!(commission.status, CommissionStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_approval_without_commission_only_notifies_buyer() {
        let (storage, _tmp) = create_temp_storage().await;

        let issuer: Arc<dyn TrackingCodeIssuer> = Arc::new(RandomCodeIssuer::new(9));
        let registry = RegistryService::new(storage.clone(), issuer);
        registry
            .upsert_listing("lst_c3", "Test listing", 500, true)
            .await
            .expect("upsert listing");
        registry
            .register_order("ord_c3", "lst_c3", 10_000, "buyer_1", None)
            .await
            .expect("register order");

        let events = OrderEventService::new(storage.clone());
        let result = events
            .apply_order_status(status_event("ord_c3", "approved"))
            .await
            .expect("apply approved");
        assert_eq!(result.notifications_sent, 1);
    }
}

// =============================================================================
// 取消与冲销测试
// =============================================================================

mod cancel_tests {
    use super::*;

    #[tokio::test]
    async fn test_cancel_reverses_credit() {
        let (storage, _tmp) = create_temp_storage().await;
        let amount = seed_attributed_order(&storage, "aff_x1", "lst_x1", "ord_x1").await;
        assert_eq!(amount, 500);

        let events = OrderEventService::new(storage.clone());
        let result = events
            .apply_order_status(status_event("ord_x1", "canceled"))
            .await
            .expect("apply canceled");
        assert_eq!(result.new_status, OrderStatus::Canceled);
        assert_eq!(result.notifications_sent, 2);

        let commission = storage
            .find_commission_by_order("ord_x1")
            .await
            .expect("find commission")
            .expect("commission exists");
        assert_eq!(commission.status, CommissionStatus::Canceled);

        // 余额完全冲销
        let affiliate = storage
            .get_affiliate("aff_x1")
            .await
            .expect("get affiliate")
            .expect("affiliate exists");
        assert_eq!(affiliate.total_earnings, 0);
        assert_eq!(affiliate.available_balance, 0);
    }

    #[tokio::test]
    async fn test_cancel_after_confirm_reverses_credit() {
        let (storage, _tmp) = create_temp_storage().await;
        seed_attributed_order(&storage, "aff_x2", "lst_x2", "ord_x2").await;

        let events = OrderEventService::new(storage.clone());
        events
            .apply_order_status(status_event("ord_x2", "approved"))
            .await
            .expect("approve");
        events
            .apply_order_status(status_event("ord_x2", "canceled"))
            .await
            .expect("cancel");

        let commission = storage
            .find_commission_by_order("ord_x2")
            .await
            .expect("find commission")
            .expect("commission exists");
        assert_eq!(commission.status, CommissionStatus::Canceled);

        let affiliate = storage
            .get_affiliate("aff_x2")
            .await
            .expect("get affiliate")
            .expect("affiliate exists");
        assert_eq!(affiliate.available_balance, 0);
    }

    #[tokio::test]
    async fn test_repeat_cancel_is_absorbed() {
        let (storage, _tmp) = create_temp_storage().await;
        seed_attributed_order(&storage, "aff_x3", "lst_x3", "ord_x3").await;

        let events = OrderEventService::new(storage.clone());
        events
            .apply_order_status(status_event("ord_x3", "canceled"))
            .await
            .expect("first cancel");

        // 第二次取消不再冲销、不再通知推广人
        let second = events
            .apply_order_status(status_event("ord_x3", "canceled"))
            .await
            .expect("second cancel");
        assert_eq!(second.notifications_sent, 1);

        let affiliate = storage
            .get_affiliate("aff_x3")
            .await
            .expect("get affiliate")
            .expect("affiliate exists");
        assert_eq!(affiliate.total_earnings, 0);
        assert_eq!(affiliate.available_balance, 0);
    }
}

// =============================================================================
// 事件校验测试
// =============================================================================

mod event_validation_tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_status_rejected() {
        let (storage, _tmp) = create_temp_storage().await;
        let events = OrderEventService::new(storage.clone());

        let err = events
            .apply_order_status(status_event("ord_v1", "exploded"))
            .await
            .unwrap_err();
        assert!(matches!(err, AfflinkError::Validation(_)));
    }

    #[tokio::test]
    async fn test_missing_fields_rejected() {
        let (storage, _tmp) = create_temp_storage().await;
        let events = OrderEventService::new(storage.clone());

        let mut event = status_event("", "approved");
        let err = events.apply_order_status(event.clone()).await.unwrap_err();
        assert!(matches!(err, AfflinkError::Validation(_)));

        event.order_id = "ord_v2".to_string();
        event.buyer_user_id = String::new();
        let err = events.apply_order_status(event).await.unwrap_err();
        assert!(matches!(err, AfflinkError::Validation(_)));
    }

    #[tokio::test]
    async fn test_shipped_event_only_notifies_buyer() {
        let (storage, _tmp) = create_temp_storage().await;
        seed_attributed_order(&storage, "aff_v3", "lst_v3", "ord_v3").await;

        let events = OrderEventService::new(storage.clone());
        let result = events
            .apply_order_status(status_event("ord_v3", "shipped"))
            .await
            .expect("apply shipped");
        assert_eq!(result.new_status, OrderStatus::Shipped);
        assert_eq!(result.notifications_sent, 1);

        // 佣金保持 pending
        let commission = storage
            .find_commission_by_order("ord_v3")
            .await
            .expect("find commission")
            .expect("commission exists");
        assert_eq!(commission.status, CommissionStatus::Pending);
    }
}
