//! Demo platform wiring the event bus to HTTP-visible read models.
//!
//! Runs the whole pipeline in one process: an in-memory broker, an event
//! bus with catalog and notification subscribers, and an HTTP surface
//! exposing the resulting read models alongside health and Prometheus
//! metrics endpoints.

pub mod config;
pub mod demo;
pub mod error;
pub mod handlers;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use broker::InMemoryBroker;
use event_bus::{BusConfig, EventBus, HandlerRegistry, SubscriptionError};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use handlers::catalog_view::CatalogView;
use handlers::notifier::Notifier;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub catalog: Arc<CatalogView>,
    pub notifier: Arc<Notifier>,
    pub bus: Arc<EventBus>,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/catalog", get(routes::catalog::list))
        .route("/catalog/{id}", get(routes::catalog::get))
        .route("/notifications", get(routes::notifications::list))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the default application state: a bus over the given broker
/// with the catalog view and notifier subscribed.
pub async fn create_default_state(
    broker: InMemoryBroker,
    bus_config: BusConfig,
) -> Result<Arc<AppState>, SubscriptionError> {
    let registry = Arc::new(HandlerRegistry::new());
    let bus = Arc::new(EventBus::new(Arc::new(broker), registry, bus_config));

    let catalog = Arc::new(CatalogView::new());
    for event_type in CatalogView::event_types() {
        bus.subscribe(event_type, catalog.clone()).await?;
    }

    let notifier = Arc::new(Notifier::new());
    for event_type in Notifier::event_types() {
        bus.subscribe(event_type, notifier.clone()).await?;
    }

    Ok(Arc::new(AppState {
        catalog,
        notifier,
        bus,
    }))
}
