use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Health check routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/v1/ping", get(ping))
}

/// Full health check: round-trips to the storage backend.
async fn health_check(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let catalog = state.catalog();
    catalog
        .ping()
        .await
        .map_err(|e| ApiError::Internal(format!("storage health check failed: {e}")))?;

    Ok(Json(json!({
        "status": "ok",
        "storage": catalog.backend(),
        "subscribers": catalog.events().subscriber_count(),
    })))
}

/// Lightweight ping, no storage check.
async fn ping() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
