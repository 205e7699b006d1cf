pub mod blueprints;
pub mod comments;
pub mod health;
pub mod revisions;
pub mod tags;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Assemble the full router with all route groups.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(blueprints::routes())
        .merge(revisions::routes())
        .merge(comments::routes())
        .merge(tags::routes())
        .merge(users::routes())
        .with_state(state)
}
