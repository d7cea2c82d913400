//! Conversion attribution tests
//!
//! End-to-end attribution against temporary SQLite databases: commission
//! math, idempotency and the listing/tracking-code consistency checks.

use std::sync::{Arc, Once};

use afflink::config::init_config;
use afflink::errors::AfflinkError;
use afflink::services::{
    ConversionService, RandomCodeIssuer, RegistryService, TrackingCodeIssuer, TrackingLinkService,
    commission_for,
};
use afflink::storage::{CommissionStatus, SeaOrmStorage};
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

fn make_issuer() -> Arc<dyn TrackingCodeIssuer> {
    Arc::new(RandomCodeIssuer::new(9))
}

/// 铺好归因所需的数据：推广人、商品、推广链接、订单
///
/// 返回 (tracking_code, order_id)
async fn seed_conversion(
    storage: &Arc<SeaOrmStorage>,
    affiliate_id: &str,
    listing_id: &str,
    rate_bp: i32,
    order_id: &str,
    order_amount: i64,
) -> String {
    let issuer = make_issuer();
    let registry = RegistryService::new(storage.clone(), issuer.clone());
    let links = TrackingLinkService::new(storage.clone(), issuer);

    registry
        .register_affiliate(affiliate_id, &format!("user_{}", affiliate_id), None)
        .await
        .expect("register affiliate");
    registry
        .upsert_listing(listing_id, "Test listing", rate_bp, true)
        .await
        .expect("upsert listing");
    registry
        .register_order(order_id, listing_id, order_amount, "buyer_1", None)
        .await
        .expect("register order");

    let issued = links
        .issue_link(affiliate_id, listing_id)
        .await
        .expect("issue link");
    assert!(issued.created);
    issued.link.tracking_code
}

// =============================================================================
// 佣金计算测试
// =============================================================================

mod commission_math_tests {
    use super::*;

    #[test]
    fn test_commission_truncates() {
        // 999 × 250 bp = 24.975 → 24
        assert_eq!(commission_for(999, 250), 24);
        assert_eq!(commission_for(10_000, 500), 500);
        assert_eq!(commission_for(1, 9_999), 0);
    }

    #[tokio::test]
    async fn test_attribution_stores_truncated_commission() {
        let (storage, _tmp) = create_temp_storage().await;
        let code = seed_conversion(&storage, "aff_trunc", "lst_trunc", 250, "ord_trunc", 999).await;

        let conversion = ConversionService::new(storage.clone());
        let result = conversion
            .attribute("ord_trunc", &code)
            .await
            .expect("attribute");

        assert_eq!(result.commission_amount, 24);
        assert_eq!(result.commission_status, CommissionStatus::Pending);
        assert!(!result.already_attributed);
    }
}

// =============================================================================
// 归因事务测试
// =============================================================================

mod attribution_flow_tests {
    use super::*;

    #[tokio::test]
    async fn test_attribution_credits_balances_and_queues_notice() {
        let (storage, _tmp) = create_temp_storage().await;
        let code = seed_conversion(&storage, "aff_1", "lst_1", 500, "ord_1", 10_000).await;

        let conversion = ConversionService::new(storage.clone());
        let result = conversion.attribute("ord_1", &code).await.expect("attribute");

        assert_eq!(result.affiliate_id, "aff_1");
        assert_eq!(result.commission_amount, 500);

        // 余额同事务上账
        let affiliate = storage
            .get_affiliate("aff_1")
            .await
            .expect("get affiliate")
            .expect("affiliate exists");
        assert_eq!(affiliate.total_earnings, 500);
        assert_eq!(affiliate.available_balance, 500);
        assert_eq!(affiliate.reserved_balance, 0);

        // 订单打标
        let order = storage
            .get_order("ord_1")
            .await
            .expect("get order")
            .expect("order exists");
        assert_eq!(order.affiliate_id.as_deref(), Some("aff_1"));
        assert_eq!(order.affiliate_commission, Some(500));
        assert_eq!(order.tracking_code.as_deref(), Some(code.as_str()));

        // commission_earned 通知同事务落盘
        let pending = storage.pending_outbox_count().await.expect("outbox count");
        assert_eq!(pending, 1);
    }

    #[tokio::test]
    async fn test_repeat_attribution_is_success_equivalent() {
        let (storage, _tmp) = create_temp_storage().await;
        let code = seed_conversion(&storage, "aff_2", "lst_2", 500, "ord_2", 10_000).await;

        let conversion = ConversionService::new(storage.clone());
        let first = conversion.attribute("ord_2", &code).await.expect("first");
        assert!(!first.already_attributed);

        let second = conversion.attribute("ord_2", &code).await.expect("second");
        assert!(second.already_attributed);
        assert_eq!(second.commission_amount, first.commission_amount);

        // 余额只上账一次
        let affiliate = storage
            .get_affiliate("aff_2")
            .await
            .expect("get affiliate")
            .expect("affiliate exists");
        assert_eq!(affiliate.available_balance, 500);

        // 通知也只落盘一次
        let pending = storage.pending_outbox_count().await.expect("outbox count");
        assert_eq!(pending, 1);
    }

    #[tokio::test]
    async fn test_attribution_marks_latest_click_converted() {
        let (storage, _tmp) = create_temp_storage().await;
        let code = seed_conversion(&storage, "aff_3", "lst_3", 500, "ord_3", 10_000).await;

        let link = storage
            .find_link_by_tracking_code(&code)
            .await
            .expect("find link")
            .expect("link exists");
        storage
            .record_click(link.id, "203.0.113.7", None, None)
            .await
            .expect("record click");

        let conversion = ConversionService::new(storage.clone());
        conversion.attribute("ord_3", &code).await.expect("attribute");

        let since = chrono::Utc::now() - chrono::Duration::hours(1);
        let clicks = storage
            .recent_clicks(link.id, since, 10)
            .await
            .expect("recent clicks");
        assert_eq!(clicks.len(), 1);
        assert!(clicks[0].converted);
        assert_eq!(clicks[0].order_id.as_deref(), Some("ord_3"));
    }
}

// =============================================================================
// 校验与错误路径测试
// =============================================================================

mod attribution_error_tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_tracking_code() {
        let (storage, _tmp) = create_temp_storage().await;
        seed_conversion(&storage, "aff_4", "lst_4", 500, "ord_4", 10_000).await;

        let conversion = ConversionService::new(storage.clone());
        let err = conversion
            .attribute("ord_4", "no-such-code")
            .await
            .unwrap_err();
        assert!(matches!(err, AfflinkError::InvalidTrackingCode(_)));
    }

    #[tokio::test]
    async fn test_order_not_found() {
        let (storage, _tmp) = create_temp_storage().await;
        let code = seed_conversion(&storage, "aff_5", "lst_5", 500, "ord_5", 10_000).await;

        let conversion = ConversionService::new(storage.clone());
        let err = conversion.attribute("ord_missing", &code).await.unwrap_err();
        assert!(matches!(err, AfflinkError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_order_listing_mismatch() {
        let (storage, _tmp) = create_temp_storage().await;
        let code = seed_conversion(&storage, "aff_6", "lst_6", 500, "ord_6", 10_000).await;

        // 另一个商品上的订单，不能用 lst_6 的跟踪码归因
        let issuer = make_issuer();
        let registry = RegistryService::new(storage.clone(), issuer);
        registry
            .upsert_listing("lst_other", "Other listing", 300, true)
            .await
            .expect("upsert listing");
        registry
            .register_order("ord_other", "lst_other", 5_000, "buyer_2", None)
            .await
            .expect("register order");

        let conversion = ConversionService::new(storage.clone());
        let err = conversion.attribute("ord_other", &code).await.unwrap_err();
        assert!(matches!(err, AfflinkError::OrderListingMismatch(_)));
    }

    #[tokio::test]
    async fn test_empty_arguments_rejected() {
        let (storage, _tmp) = create_temp_storage().await;
        let conversion = ConversionService::new(storage.clone());

        let err = conversion.attribute("", "code").await.unwrap_err();
        assert!(matches!(err, AfflinkError::Validation(_)));

        let err = conversion.attribute("ord", "").await.unwrap_err();
        assert!(matches!(err, AfflinkError::Validation(_)));
    }
}
