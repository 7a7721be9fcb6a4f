//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Active delivery workers, one per subscribed event type.
    pub subscriptions: usize,
}

/// GET /health — returns system health and subscription liveness.
pub async fn check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        subscriptions: state.bus.worker_count().await,
    })
}
