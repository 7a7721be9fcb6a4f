//! Integration tests for the platform HTTP surface.
//!
//! Each test runs the full pipeline: events published on the bus flow
//! through the in-memory broker into the read models the routes serve.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use broker::InMemoryBroker;
use event_bus::{BusConfig, RetryPolicy};
use events::Money;
use events::catalog::{InventoryUpdated, ProductCreated};
use events::orders::{OrderLine, OrderPlaced};
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceExt;
use uuid::Uuid;

use std::sync::OnceLock;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

async fn setup() -> (axum::Router, Arc<platform::AppState>) {
    let broker = InMemoryBroker::new();
    let config = BusConfig::new("platform-test")
        .with_publish_retry_delay(Duration::from_millis(1))
        .with_retry(RetryPolicy::fixed(Duration::from_millis(1)))
        .with_reconnect(RetryPolicy::fixed(Duration::from_millis(5)));
    let state = platform::create_default_state(broker, config).await.unwrap();
    let metrics_handle = get_metrics_handle();
    let app = platform::create_app(state.clone(), metrics_handle);
    (app, state)
}

async fn wait_until(deadline: Duration, check: impl Fn() -> bool) -> bool {
    let start = tokio::time::Instant::now();
    while start.elapsed() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    check()
}

const DEADLINE: Duration = Duration::from_secs(2);

#[tokio::test]
async fn test_health_reports_subscriptions() {
    let (app, state) = setup().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
    // Four catalog event types plus three account/order event types.
    assert_eq!(json["subscriptions"], 7);

    state.bus.shutdown().await;
}

#[tokio::test]
async fn test_catalog_starts_empty() {
    let (app, state) = setup().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/catalog")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let products: Vec<serde_json::Value> = serde_json::from_slice(&body).unwrap();
    assert!(products.is_empty());

    state.bus.shutdown().await;
}

#[tokio::test]
async fn test_catalog_reflects_published_products() {
    let (app, state) = setup().await;

    let product = ProductCreated::new(
        Uuid::new_v4(),
        "Mechanical Keyboard",
        "KB-87",
        "KeyWorks",
        Uuid::new_v4(),
        Money::from_cents(12900),
        false,
        true,
    );
    state.bus.publish(&product).await.unwrap();
    state
        .bus
        .publish(&InventoryUpdated::new(product.product_id, 25))
        .await
        .unwrap();

    assert!(
        wait_until(DEADLINE, || {
            state
                .catalog
                .get(product.product_id)
                .is_some_and(|entry| entry.quantity == 25)
        })
        .await
    );

    // List all products
    let list_response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/catalog")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(list_response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(list_response.into_body(), usize::MAX)
        .await
        .unwrap();
    let products: Vec<serde_json::Value> = serde_json::from_slice(&body).unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0]["name"], "Mechanical Keyboard");

    // Get one product
    let get_response = app
        .oneshot(
            Request::builder()
                .uri(format!("/catalog/{}", product.product_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(get_response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(get_response.into_body(), usize::MAX)
        .await
        .unwrap();
    let entry: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(entry["sku"], "KB-87");
    assert_eq!(entry["brand"], "KeyWorks");
    assert_eq!(entry["price"]["cents"], 12900);
    assert_eq!(entry["quantity"], 25);

    state.bus.shutdown().await;
}

#[tokio::test]
async fn test_get_nonexistent_product() {
    let (app, state) = setup().await;
    let fake_id = Uuid::new_v4();

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/catalog/{fake_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    state.bus.shutdown().await;
}

#[tokio::test]
async fn test_invalid_product_id_format() {
    let (app, state) = setup().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/catalog/not-a-uuid")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    state.bus.shutdown().await;
}

#[tokio::test]
async fn test_order_produces_notification() {
    let (app, state) = setup().await;

    let order = OrderPlaced::new(
        Uuid::new_v4(),
        Uuid::new_v4(),
        vec![OrderLine::new(
            Uuid::new_v4(),
            "Mechanical Keyboard",
            2,
            Money::from_cents(12900),
        )],
    );
    state.bus.publish(&order).await.unwrap();

    assert!(wait_until(DEADLINE, || !state.notifier.messages().is_empty()).await);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/notifications")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let messages: Vec<String> = serde_json::from_slice(&body).unwrap();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains(&order.order_id.to_string()));

    state.bus.shutdown().await;
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, state) = setup().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(String::from_utf8(body.to_vec()).is_ok());

    state.bus.shutdown().await;
}
