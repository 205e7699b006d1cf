use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use blueprint_catalog_core::blueprint::model::CommentId;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/comments/{id}", get(show).put(update).delete(destroy))
}

#[derive(Debug, Deserialize)]
struct CommentBody {
    message: String,
}

async fn show(State(state): State<AppState>, Path(id): Path<CommentId>) -> ApiResult<Json<Value>> {
    let comment = state.catalog().comment(id).await?;
    Ok(Json(json!(comment)))
}

async fn update(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<CommentId>,
    Json(body): Json<CommentBody>,
) -> ApiResult<Json<Value>> {
    let comment = state.catalog().update_comment(user_id, id, &body.message).await?;
    Ok(Json(json!(comment)))
}

async fn destroy(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<CommentId>,
) -> ApiResult<StatusCode> {
    state.catalog().delete_comment(user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
