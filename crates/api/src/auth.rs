//! Caller identity extractors. The bearer token is handed to the configured
//! [`IdentityVerifier`](blueprint_catalog_core::IdentityVerifier) and only the
//! numeric user id reaches the handlers.

use axum::{extract::FromRequestParts, http::header::AUTHORIZATION, http::request::Parts};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use blueprint_catalog_core::blueprint::model::UserId;

use crate::error::ApiError;
use crate::state::AppState;

/// An authenticated caller. Rejects with 401 when the header is missing or
/// the token does not verify.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub UserId);

/// An optional caller, for reads that show the viewer's own vote. A header
/// that is present but invalid is still rejected.
#[derive(Debug, Clone, Copy)]
pub struct MaybeUser(pub Option<UserId>);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::Unauthorized)?;
        let user_id = state.verifier().verify(bearer.token()).await?;
        Ok(AuthUser(user_id))
    }
}

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if !parts.headers.contains_key(AUTHORIZATION) {
            return Ok(MaybeUser(None));
        }
        let AuthUser(user_id) = AuthUser::from_request_parts(parts, state).await?;
        Ok(MaybeUser(Some(user_id)))
    }
}
