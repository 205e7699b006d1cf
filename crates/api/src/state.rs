use std::sync::Arc;

use blueprint_catalog_core::{BlueprintCatalog, IdentityVerifier};

/// Shared application state, passed to all handlers via Axum's `State` extractor.
/// Wrapped in `Arc` so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    catalog: BlueprintCatalog,
    verifier: Arc<dyn IdentityVerifier>,
}

impl AppState {
    pub fn new(catalog: BlueprintCatalog, verifier: Arc<dyn IdentityVerifier>) -> Self {
        Self {
            inner: Arc::new(InnerState { catalog, verifier }),
        }
    }

    pub fn catalog(&self) -> &BlueprintCatalog {
        &self.inner.catalog
    }

    pub fn verifier(&self) -> &dyn IdentityVerifier {
        self.inner.verifier.as_ref()
    }
}
