use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use blueprint_catalog_core::blueprint::model::{RevisionId, Vote};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{AuthUser, MaybeUser};
use crate::error::ApiResult;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/revisions/{id}", get(show).put(update).delete(destroy))
        .route("/v1/revisions/{id}/vote", put(vote))
        .route("/v1/revisions/{id}/comments", get(comments).post(add_comment))
}

#[derive(Debug, Deserialize)]
struct ChangesBody {
    #[serde(default)]
    changes: String,
}

#[derive(Debug, Deserialize)]
struct VoteBody {
    vote: Vote,
}

#[derive(Debug, Deserialize)]
struct CommentBody {
    message: String,
}

async fn show(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(id): Path<RevisionId>,
) -> ApiResult<Json<Value>> {
    let view = state.catalog().get_revision(id, viewer).await?;
    Ok(Json(json!(view)))
}

async fn update(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<RevisionId>,
    Json(body): Json<ChangesBody>,
) -> ApiResult<Json<Value>> {
    let view = state.catalog().update_revision(user_id, id, &body.changes).await?;
    Ok(Json(json!(view)))
}

/// Responds with which revision went and whether its entry went with it.
async fn destroy(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<RevisionId>,
) -> ApiResult<Json<Value>> {
    let outcome = state.catalog().delete_revision(user_id, id).await?;
    Ok(Json(json!(outcome)))
}

async fn vote(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<RevisionId>,
    Json(body): Json<VoteBody>,
) -> ApiResult<Json<Value>> {
    let view = state.catalog().rate_revision(user_id, id, body.vote).await?;
    Ok(Json(json!(view)))
}

async fn comments(State(state): State<AppState>, Path(id): Path<RevisionId>) -> ApiResult<Json<Value>> {
    let comments = state.catalog().comments(id).await?;
    Ok(Json(json!({ "comments": comments })))
}

async fn add_comment(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<RevisionId>,
    Json(body): Json<CommentBody>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let comment = state.catalog().add_comment(user_id, id, &body.message).await?;
    Ok((StatusCode::CREATED, Json(json!(comment))))
}
