//! Catalog read-model endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};

use crate::AppState;
use crate::error::AppError;
use crate::handlers::catalog_view::CatalogEntry;

/// GET /catalog — lists all products currently in the read model.
#[tracing::instrument(skip(state))]
pub async fn list(State(state): State<Arc<AppState>>) -> Json<Vec<CatalogEntry>> {
    Json(state.catalog.list())
}

/// GET /catalog/{id} — returns one product by ID.
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CatalogEntry>, AppError> {
    let product_id = uuid::Uuid::parse_str(&id)
        .map_err(|e| AppError::BadRequest(format!("Invalid product id: {e}")))?;

    state
        .catalog
        .get(product_id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Product {product_id} not found")))
}
