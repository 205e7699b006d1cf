use thiserror::Error;

use crate::blueprint::validate::ValidationError;

/// Constraint backing "one active revision per payload digest".
pub const ACTIVE_CHECKSUM_CONSTRAINT: &str = "revisions_active_checksum_idx";
/// Constraint backing "one revision number per blueprint".
pub const REVISION_NUMBER_CONSTRAINT: &str = "revisions_blueprint_revision_key";

/// Errors surfaced by catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("blueprint already exists (checksum {0})")]
    DuplicateContent(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl CatalogError {
    pub fn not_found(what: &str, id: impl std::fmt::Display) -> Self {
        CatalogError::NotFound(format!("{what} {id}"))
    }
}

impl From<sqlx::Error> for CatalogError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            match db.constraint() {
                Some(ACTIVE_CHECKSUM_CONSTRAINT) => {
                    return CatalogError::DuplicateContent(
                        db.message().to_string(),
                    )
                }
                Some(REVISION_NUMBER_CONSTRAINT) => {
                    return CatalogError::Conflict(
                        "revision number already taken".to_string(),
                    )
                }
                _ => {}
            }
        }
        CatalogError::Database(err)
    }
}

impl From<ValidationError> for CatalogError {
    fn from(err: ValidationError) -> Self {
        CatalogError::InvalidInput(err.to_string())
    }
}

impl From<blueprint_catalog_query::LexError> for CatalogError {
    fn from(err: blueprint_catalog_query::LexError) -> Self {
        CatalogError::InvalidInput(err.to_string())
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;
