mod auth;
mod config;
mod error;
mod middleware;
mod routes;
mod state;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use blueprint_catalog_core::content::{ContentStore, HttpObjectStore, MemoryObjectStore, ObjectStore};
use blueprint_catalog_core::render::{HttpRenderer, RenderPipeline};
use blueprint_catalog_core::{BlueprintCatalog, CatalogStore, EventBus, JwtVerifier, MemoryStore, PgStore};
use sqlx::postgres::PgPoolOptions;
use tower_http::limit::RequestBodyLimitLayer;
use tracing_subscriber::EnvFilter;

use crate::config::{AppConfig, StorageBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience)
    let _ = dotenvy::dotenv();

    let config = AppConfig::from_env().map_err(|e| anyhow::anyhow!("Failed to load config: {e}"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    tracing::info!(storage = config.storage.name(), "Starting blueprint catalog");

    let store = open_store(&config.storage).await?;

    let objects: Arc<dyn ObjectStore> = match &config.object_store_url {
        Some(url) => Arc::new(HttpObjectStore::new(url.as_str(), config.object_store_timeout)?),
        None => {
            tracing::warn!("OBJECT_STORE_URL not set, keeping payloads and images in memory");
            Arc::new(MemoryObjectStore::new())
        }
    };
    let content = ContentStore::new(objects, config.content());
    let event_bus = EventBus::new(config.event_bus_capacity);

    let (render, worker) = match &config.renderer_url {
        Some(url) => {
            let renderer = Arc::new(HttpRenderer::new(url.as_str(), config.render_timeout)?);
            let (pipeline, worker) = RenderPipeline::spawn(
                store.clone(),
                content.clone(),
                renderer,
                event_bus.clone(),
                config.render(),
            );
            (pipeline, Some(worker))
        }
        None => {
            tracing::warn!("RENDERER_URL not set, revisions will not be rendered");
            (RenderPipeline::disabled(store.clone(), content.clone()), None)
        }
    };

    // Revisions left unrendered by a previous run
    match render.requeue_unrendered(config.render_queue_capacity as i64).await {
        Ok(0) => {}
        Ok(queued) => tracing::info!(queued, "re-queued unrendered revisions"),
        Err(e) => tracing::warn!(error = %e, "render sweep failed"),
    }

    let catalog = BlueprintCatalog::new(store, content, render, event_bus);
    let verifier = Arc::new(JwtVerifier::new(&config.jwt_secret));
    let state = state::AppState::new(catalog, verifier);

    let app = routes::build_router(state)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
        .layer(middleware::request_tracing::trace_layer())
        .layer(middleware::cors::cors_layer());

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(worker) = worker {
        worker.abort();
    }
    tracing::info!("Server shut down gracefully");
    Ok(())
}

async fn open_store(storage: &StorageBackend) -> anyhow::Result<Arc<dyn CatalogStore>> {
    match storage {
        StorageBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StorageBackend::Postgres {
            database_url,
            max_connections,
            min_connections,
        } => {
            let pool = PgPoolOptions::new()
                .max_connections(*max_connections)
                .min_connections(*min_connections)
                .connect(database_url)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to connect to database: {e}"))?;
            tracing::info!("Connected to PostgreSQL");

            sqlx::migrate!("../../migrations")
                .run(&pool)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to run migrations: {e}"))?;
            tracing::info!("Database migrations applied");

            Ok(Arc::new(PgStore::new(pool)))
        }
    }
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM for graceful shutdown. A handler that
/// cannot be installed is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { tracing::info!("Received Ctrl+C, shutting down..."); }
        _ = terminate => { tracing::info!("Received SIGTERM, shutting down..."); }
    }
}
