use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use blueprint_catalog_core::blueprint::model::BlueprintId;
use blueprint_catalog_core::{CreateBlueprint, CreateRevision, UpdateBlueprint};
use blueprint_catalog_query::{ListOrder, Page};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{AuthUser, MaybeUser};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/blueprints", get(list).post(create))
        .route("/v1/blueprints/search", get(search))
        .route("/v1/blueprints/{id}", get(show).put(update).delete(destroy))
        .route("/v1/blueprints/{id}/revisions", get(revisions).post(add_revision))
        .route("/v1/blueprints/{id}/revisions/{number}", get(revision_by_number))
}

#[derive(Debug, Deserialize)]
struct ListParams {
    order: Option<String>,
    offset: Option<i64>,
    count: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
    offset: Option<i64>,
    count: Option<i64>,
}

async fn list(State(state): State<AppState>, Query(params): Query<ListParams>) -> ApiResult<Json<Value>> {
    let order = match params.order.as_deref() {
        None => ListOrder::default(),
        Some(raw) => raw.parse().map_err(|e| ApiError::BadRequest(format!("{e}")))?,
    };
    let page = Page::new(params.offset, params.count);
    let blueprints = state.catalog().list(order, page).await?;
    Ok(Json(json!({ "blueprints": blueprints })))
}

async fn search(State(state): State<AppState>, Query(params): Query<SearchParams>) -> ApiResult<Json<Value>> {
    let page = Page::new(params.offset, params.count);
    let blueprints = state.catalog().search(&params.q, page).await?;
    Ok(Json(json!({ "blueprints": blueprints })))
}

async fn create(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(request): Json<CreateBlueprint>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let view = state.catalog().create_entry(user_id, request).await?;
    Ok((StatusCode::CREATED, Json(json!(view))))
}

async fn show(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(id): Path<BlueprintId>,
) -> ApiResult<Json<Value>> {
    let view = state.catalog().get_entry(id, viewer).await?;
    Ok(Json(json!(view)))
}

async fn update(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<BlueprintId>,
    Json(request): Json<UpdateBlueprint>,
) -> ApiResult<Json<Value>> {
    let view = state.catalog().update_entry(user_id, id, request).await?;
    Ok(Json(json!(view)))
}

async fn destroy(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<BlueprintId>,
) -> ApiResult<StatusCode> {
    state.catalog().delete_entry(user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn revisions(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(id): Path<BlueprintId>,
) -> ApiResult<Json<Value>> {
    let revisions = state.catalog().revisions(id, viewer).await?;
    Ok(Json(json!({ "revisions": revisions })))
}

async fn add_revision(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<BlueprintId>,
    Json(request): Json<CreateRevision>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let view = state.catalog().add_revision(user_id, id, request).await?;
    Ok((StatusCode::CREATED, Json(json!(view))))
}

async fn revision_by_number(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path((id, number)): Path<(BlueprintId, i64)>,
) -> ApiResult<Json<Value>> {
    let view = state.catalog().revision_by_number(id, number, viewer).await?;
    Ok(Json(json!(view)))
}
