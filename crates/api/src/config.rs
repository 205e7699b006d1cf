use std::env;
use std::str::FromStr;
use std::time::Duration;

use blueprint_catalog_core::content::ContentConfig;
use blueprint_catalog_core::render::RenderConfig;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Where catalog rows live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres {
        database_url: String,
        max_connections: u32,
        min_connections: u32,
    },
    Memory,
}

impl StorageBackend {
    pub fn name(&self) -> &'static str {
        match self {
            StorageBackend::Postgres { .. } => "postgres",
            StorageBackend::Memory => "memory",
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server host to bind to.
    pub host: String,
    /// Server port to bind to.
    pub port: u16,
    pub storage: StorageBackend,
    /// HS256 secret shared with the token issuer.
    pub jwt_secret: String,
    /// Base URL of the S3-compatible object store. Objects stay in memory when unset.
    pub object_store_url: Option<String>,
    /// Per-request bound for object store calls.
    pub object_store_timeout: Duration,
    /// Base URL that content links in responses are built from.
    pub public_url: String,
    pub blueprint_bucket: String,
    pub render_bucket: String,
    /// Renderer endpoint. Rendering is disabled when unset.
    pub renderer_url: Option<String>,
    pub render_timeout: Duration,
    pub render_queue_capacity: usize,
    /// Render jobs allowed in flight at once.
    pub render_concurrency: usize,
    /// Event bus channel capacity.
    pub event_bus_capacity: usize,
    /// Largest accepted request body, in bytes.
    pub max_body_bytes: usize,
    /// Log level (e.g., "info", "debug", "trace").
    pub log_level: String,
}

fn parsed<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

fn text(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    lookup(name).unwrap_or_else(|| default.to_string())
}

fn optional(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from any variable source. Unset variables take
    /// their defaults; malformed numbers are errors.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = ContentConfig::default();

        let storage = match text(&lookup, "STORAGE_BACKEND", "postgres").to_ascii_lowercase().as_str() {
            "postgres" => StorageBackend::Postgres {
                database_url: optional(&lookup, "DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
                max_connections: parsed(&lookup, "DB_MAX_CONNECTIONS", 20)?,
                min_connections: parsed(&lookup, "DB_MIN_CONNECTIONS", 5)?,
            },
            "memory" => StorageBackend::Memory,
            other => {
                return Err(ConfigError::Invalid {
                    name: "STORAGE_BACKEND",
                    value: other.to_string(),
                })
            }
        };

        let render_concurrency: usize = parsed(&lookup, "RENDER_CONCURRENCY", 4)?;
        if render_concurrency == 0 {
            return Err(ConfigError::Invalid {
                name: "RENDER_CONCURRENCY",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            host: text(&lookup, "HOST", "0.0.0.0"),
            port: parsed(&lookup, "PORT", 3030)?,
            storage,
            jwt_secret: text(&lookup, "JWT_SECRET", "dev-secret-change-me-in-production"),
            object_store_url: optional(&lookup, "OBJECT_STORE_URL"),
            object_store_timeout: Duration::from_secs(parsed(&lookup, "OBJECT_STORE_TIMEOUT_SECS", 10)?),
            public_url: text(&lookup, "PUBLIC_URL", &defaults.public_url),
            blueprint_bucket: text(&lookup, "BLUEPRINT_BUCKET", &defaults.blueprint_bucket),
            render_bucket: text(&lookup, "RENDER_BUCKET", &defaults.render_bucket),
            renderer_url: optional(&lookup, "RENDERER_URL"),
            render_timeout: Duration::from_secs(parsed(&lookup, "RENDER_TIMEOUT_SECS", 30)?),
            render_queue_capacity: parsed(&lookup, "RENDER_QUEUE_CAPACITY", 256)?,
            render_concurrency,
            event_bus_capacity: parsed(&lookup, "EVENT_BUS_CAPACITY", 1024)?,
            max_body_bytes: parsed(&lookup, "MAX_BODY_BYTES", 8 * 1024 * 1024)?,
            log_level: text(&lookup, "LOG_LEVEL", "info"),
        })
    }

    /// Build the socket address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn content(&self) -> ContentConfig {
        ContentConfig {
            public_url: self.public_url.clone(),
            blueprint_bucket: self.blueprint_bucket.clone(),
            render_bucket: self.render_bucket.clone(),
        }
    }

    pub fn render(&self) -> RenderConfig {
        RenderConfig {
            queue_capacity: self.render_queue_capacity,
            concurrency: self.render_concurrency,
            timeout: self.render_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(move |name| vars.get(name).cloned())
    }

    #[test]
    fn memory_backend_needs_nothing_else() {
        let config = load(&[("STORAGE_BACKEND", "memory")]).unwrap();
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.addr(), "0.0.0.0:3030");
        assert_eq!(config.render_bucket, "blooper-renders");
        assert_eq!(config.render().queue_capacity, 256);
        assert_eq!(config.render_timeout, Duration::from_secs(30));
        assert_eq!(config.render().concurrency, 4);
        assert_eq!(config.object_store_timeout, Duration::from_secs(10));
        assert!(config.renderer_url.is_none());
        assert!(config.object_store_url.is_none());
    }

    #[test]
    fn postgres_requires_database_url() {
        assert_eq!(load(&[]).unwrap_err(), ConfigError::Missing("DATABASE_URL"));
        let config = load(&[("DATABASE_URL", "postgres://localhost/blueprints")]).unwrap();
        assert_eq!(config.storage.name(), "postgres");
    }

    #[test]
    fn malformed_numbers_are_errors() {
        let err = load(&[("STORAGE_BACKEND", "memory"), ("PORT", "eighty")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                name: "PORT",
                value: "eighty".to_string()
            }
        );
    }

    #[test]
    fn unknown_backend_is_rejected() {
        assert!(matches!(
            load(&[("STORAGE_BACKEND", "sqlite")]),
            Err(ConfigError::Invalid { name: "STORAGE_BACKEND", .. })
        ));
    }

    #[test]
    fn blank_optional_urls_count_as_unset() {
        let config = load(&[("STORAGE_BACKEND", "memory"), ("RENDERER_URL", "  ")]).unwrap();
        assert!(config.renderer_url.is_none());
    }

    #[test]
    fn timeouts_and_concurrency_are_configurable() {
        let config = load(&[
            ("STORAGE_BACKEND", "memory"),
            ("OBJECT_STORE_TIMEOUT_SECS", "3"),
            ("RENDER_CONCURRENCY", "2"),
        ])
        .unwrap();
        assert_eq!(config.object_store_timeout, Duration::from_secs(3));
        assert_eq!(config.render().concurrency, 2);

        assert!(matches!(
            load(&[("STORAGE_BACKEND", "memory"), ("RENDER_CONCURRENCY", "0")]),
            Err(ConfigError::Invalid { name: "RENDER_CONCURRENCY", .. })
        ));
    }
}
