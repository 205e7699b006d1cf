use axum::http::{header, Method};
use tower_http::cors::{Any, CorsLayer};

/// Any origin may read the catalog. Writes still need a bearer token, so
/// only the headers and methods the routes use are allowed.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}
