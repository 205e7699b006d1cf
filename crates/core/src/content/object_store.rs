use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;

use crate::error::{CatalogError, CatalogResult};

/// Bucketed blob storage.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>, content_type: &str) -> CatalogResult<()>;

    /// `Ok(None)` when the object does not exist.
    async fn get(&self, bucket: &str, key: &str) -> CatalogResult<Option<Vec<u8>>>;
}

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    content_type: String,
}

/// Process-local object store. Used for tests and when no object store URL
/// is configured.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<(String, String), StoredObject>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.read().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn content_type(&self, bucket: &str, key: &str) -> Option<String> {
        self.objects
            .read()
            .ok()?
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| o.content_type.clone())
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>, content_type: &str) -> CatalogResult<()> {
        let mut objects = self
            .objects
            .write()
            .map_err(|e| CatalogError::Storage(format!("lock poisoned: {e}")))?;
        objects.insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> CatalogResult<Option<Vec<u8>>> {
        let objects = self
            .objects
            .read()
            .map_err(|e| CatalogError::Storage(format!("lock poisoned: {e}")))?;
        Ok(objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| o.bytes.clone()))
    }
}

/// S3-compatible store addressed path-style: `{base}/{bucket}/{key}`.
#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    http: reqwest::Client,
    base_url: String,
}

impl HttpObjectStore {
    /// `timeout` bounds each request from connect to the last body byte.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> CatalogResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CatalogError::UpstreamUnavailable(format!("object store client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, bucket: &str, key: &str) -> String {
        format!("{}/{}/{}", self.base_url, bucket, key)
    }
}

fn unavailable(err: reqwest::Error) -> CatalogError {
    CatalogError::UpstreamUnavailable(format!("object store: {err}"))
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>, content_type: &str) -> CatalogResult<()> {
        self.http
            .put(self.url(bucket, key))
            .header(CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(unavailable)?
            .error_for_status()
            .map_err(unavailable)?;
        tracing::debug!(bucket, key, "object stored");
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> CatalogResult<Option<Vec<u8>>> {
        let response = self
            .http
            .get(self.url(bucket, key))
            .send()
            .await
            .map_err(unavailable)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let bytes = response
            .error_for_status()
            .map_err(unavailable)?
            .bytes()
            .await
            .map_err(unavailable)?;
        Ok(Some(bytes.to_vec()))
    }
}
