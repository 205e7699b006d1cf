use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use blueprint_catalog_core::blueprint::model::UserId;
use serde_json::{json, Value};

use crate::error::ApiResult;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/users/{id}/blueprints", get(blueprints))
}

async fn blueprints(State(state): State<AppState>, Path(user_id): Path<UserId>) -> ApiResult<Json<Value>> {
    let blueprints = state.catalog().entries_of(user_id).await?;
    Ok(Json(json!({ "blueprints": blueprints })))
}
