//! Blueprint catalog domain: revision ledger, ratings, tags, comments,
//! ranking, content storage and the background render pipeline.
//!
//! [`BlueprintCatalog`] is the entry point used by the HTTP layer. Storage is
//! pluggable through [`store::CatalogStore`], with an in-memory backend for
//! tests and local runs and a Postgres backend for production.

pub mod blueprint;
pub mod catalog;
pub mod comments;
pub mod content;
pub mod error;
pub mod events;
pub mod identity;
pub mod ledger;
pub mod ranking;
pub mod rating;
pub mod render;
pub mod store;
pub mod tags;
pub mod views;

pub use catalog::{BlueprintCatalog, CreateBlueprint, CreateRevision, UpdateBlueprint};
pub use error::{CatalogError, CatalogResult};
pub use events::bus::EventBus;
pub use events::types::CatalogEvent;
pub use identity::{IdentityVerifier, JwtVerifier};
pub use store::{CatalogStore, MemoryStore, PgStore};
