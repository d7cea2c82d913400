//! Unconfigured service-token tests
//!
//! Separate binary on purpose: no AFFLINK__API__SERVICE_TOKEN in the
//! environment, so the whole protected group must behave as if it does
//! not exist (404), while public endpoints keep working.

use std::sync::{Arc, Once};

use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};
use actix_web::{App, web};
use tempfile::TempDir;

use afflink::api::services::affiliate::{ApiResponse, TrackClickRequest, TrackResponse};
use afflink::api::services::{AppStartTime, affiliate_api_routes, health_routes};
use afflink::config::init_config;
use afflink::services::{
    ClickService, RandomCodeIssuer, RegistryService, TrackingCodeIssuer, TrackingLinkService,
};
use afflink::storage::SeaOrmStorage;

static INIT: Once = Once::new();

fn init_test_config() {
    INIT.call_once(|| {
        init_config();
    });
}

struct TestContext {
    storage: Arc<SeaOrmStorage>,
    links: Arc<TrackingLinkService>,
    clicks: Arc<ClickService>,
    registry: Arc<RegistryService>,
    app_start_time: AppStartTime,
    _tmp: TempDir,
}

async fn create_test_context() -> TestContext {
    init_test_config();

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("auth_test.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

    let storage = Arc::new(
        SeaOrmStorage::new(&db_url, "sqlite")
            .await
            .expect("Failed to create storage"),
    );

    let issuer: Arc<dyn TrackingCodeIssuer> = Arc::new(RandomCodeIssuer::new(9));
    let links = Arc::new(TrackingLinkService::new(storage.clone(), issuer.clone()));
    let clicks = Arc::new(ClickService::new(storage.clone()));
    let registry = Arc::new(RegistryService::new(storage.clone(), issuer));

    TestContext {
        storage,
        links,
        clicks,
        registry,
        app_start_time: AppStartTime {
            start_datetime: chrono::Utc::now(),
        },
        _tmp: temp_dir,
    }
}

macro_rules! build_app {
    ($ctx:expr) => {
        App::new()
            .app_data(web::Data::new($ctx.storage.clone()))
            .app_data(web::Data::new($ctx.links.clone()))
            .app_data(web::Data::new($ctx.clicks.clone()))
            .app_data(web::Data::new($ctx.registry.clone()))
            .app_data(web::Data::new($ctx.app_start_time.clone()))
            .service(web::scope("/health").service(health_routes()))
            .service(affiliate_api_routes())
    };
}

// =============================================================================
// 未配置 token 时受保护端点隐藏测试
// =============================================================================

mod hidden_endpoint_tests {
    use super::*;

    #[actix_web::test]
    async fn test_protected_routes_return_404_without_token() {
        let ctx = create_test_context().await;
        let app = test::init_service(build_app!(ctx)).await;

        let req = TestRequest::get()
            .uri("/api/links?affiliate_id=aff_x")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body = test::read_body(resp).await;
        assert_eq!(&body[..], b"Not Found");
    }

    #[actix_web::test]
    async fn test_bearer_token_does_not_help() {
        let ctx = create_test_context().await;
        let app = test::init_service(build_app!(ctx)).await;

        // 任何 token 都打不开未启用的端点组
        let req = TestRequest::get()
            .uri("/api/affiliates/aff_x")
            .insert_header(("Authorization", "Bearer anything"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}

// =============================================================================
// 公开端点不受影响测试
// =============================================================================

mod public_endpoint_tests {
    use super::*;

    #[actix_web::test]
    async fn test_track_stays_public_without_token() {
        let ctx = create_test_context().await;

        // 直接走 service 层铺数据，受保护端点此时不可用
        ctx.registry
            .register_affiliate("aff_pub", "user_pub", None)
            .await
            .expect("register affiliate");
        ctx.registry
            .upsert_listing("lst_pub", "Public listing", 500, true)
            .await
            .expect("upsert listing");
        let issued = ctx
            .links
            .issue_link("aff_pub", "lst_pub")
            .await
            .expect("issue link");

        let app = test::init_service(build_app!(ctx)).await;

        let req = TestRequest::post()
            .uri("/api/track")
            .peer_addr("203.0.113.21:443".parse().unwrap())
            .set_json(TrackClickRequest {
                tracking_code: issued.link.tracking_code.clone(),
                listing_id: "lst_pub".to_string(),
                user_agent: None,
                referrer: None,
            })
            .to_request();
        let body: ApiResponse<TrackResponse> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.code, 0);
        assert!(body.data.expect("track response").tracked);
    }

    #[actix_web::test]
    async fn test_health_reachable_without_token() {
        let ctx = create_test_context().await;
        let app = test::init_service(build_app!(ctx)).await;

        let req = TestRequest::get().uri("/health/live").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let req = TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
