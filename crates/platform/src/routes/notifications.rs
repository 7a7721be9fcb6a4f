//! Notification log endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;

use crate::AppState;

/// GET /notifications — lists notifications sent so far, oldest first.
#[tracing::instrument(skip(state))]
pub async fn list(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.notifier.messages())
}
