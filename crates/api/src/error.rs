use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use blueprint_catalog_core::CatalogError;
use serde_json::json;

/// API error type rendered as `{"error": {"type", "message", "statusCode"}}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("duplicate content: {0}")]
    DuplicateContent(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("bad gateway: {0}")]
    BadGateway(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(msg) => ApiError::NotFound(msg),
            CatalogError::Forbidden(msg) => ApiError::Forbidden(msg),
            CatalogError::Unauthorized(msg) => {
                tracing::debug!(reason = %msg, "rejected credentials");
                ApiError::Unauthorized
            }
            err @ CatalogError::DuplicateContent(_) => ApiError::DuplicateContent(err.to_string()),
            CatalogError::InvalidInput(msg) => ApiError::BadRequest(msg),
            CatalogError::Conflict(msg) => ApiError::Conflict(msg),
            CatalogError::UpstreamUnavailable(msg) => ApiError::BadGateway(msg),
            CatalogError::Storage(msg) => ApiError::Internal(msg),
            CatalogError::Database(err) => ApiError::Database(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "notFound", msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "badRequest", msg.clone()),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Authentication required".to_string(),
            ),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg.clone()),
            ApiError::DuplicateContent(msg) => (StatusCode::CONFLICT, "duplicateContent", msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            ApiError::BadGateway(msg) => {
                tracing::warn!(error = %msg, "upstream unavailable");
                (
                    StatusCode::BAD_GATEWAY,
                    "upstreamUnavailable",
                    "A storage or rendering service is unavailable".to_string(),
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internalError",
                    "An internal error occurred".to_string(),
                )
            }
            ApiError::Database(err) => {
                tracing::error!("Database error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internalError",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": {
                "type": error_type,
                "message": message,
                "statusCode": status.as_u16(),
            }
        });

        (status, Json(body)).into_response()
    }
}

/// Convenience type alias for route handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status(err: CatalogError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn catalog_errors_map_to_statuses() {
        assert_eq!(status(CatalogError::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(status(CatalogError::Forbidden("x".into())), StatusCode::FORBIDDEN);
        assert_eq!(status(CatalogError::Unauthorized("x".into())), StatusCode::UNAUTHORIZED);
        assert_eq!(status(CatalogError::DuplicateContent("x".into())), StatusCode::CONFLICT);
        assert_eq!(status(CatalogError::Conflict("x".into())), StatusCode::CONFLICT);
        assert_eq!(status(CatalogError::InvalidInput("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status(CatalogError::UpstreamUnavailable("x".into())), StatusCode::BAD_GATEWAY);
        assert_eq!(status(CatalogError::Storage("x".into())), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
