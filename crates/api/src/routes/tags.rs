use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use blueprint_catalog_core::blueprint::model::TagUsage;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiResult;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/tags/popular", get(popular))
        .route("/v1/tags/autocomplete/{prefix}", get(autocomplete))
}

#[derive(Debug, Deserialize)]
struct LimitParams {
    limit: Option<i64>,
}

/// Clients only need the names; usage only drives the order.
fn names(tags: Vec<TagUsage>) -> Value {
    let names: Vec<String> = tags.into_iter().map(|t| t.name).collect();
    json!({ "tags": names })
}

async fn popular(State(state): State<AppState>, Query(params): Query<LimitParams>) -> ApiResult<Json<Value>> {
    let tags = state.catalog().popular_tags(params.limit).await?;
    Ok(Json(names(tags)))
}

async fn autocomplete(
    State(state): State<AppState>,
    Path(prefix): Path<String>,
    Query(params): Query<LimitParams>,
) -> ApiResult<Json<Value>> {
    let tags = state.catalog().autocomplete_tags(&prefix, params.limit).await?;
    Ok(Json(names(tags)))
}
