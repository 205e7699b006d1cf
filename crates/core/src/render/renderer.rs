use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, CatalogResult};

/// Image variant requested from the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    Default,
    Square,
    Thumbnail,
}

impl RenderMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderMode::Default => "default",
            RenderMode::Square => "square",
            RenderMode::Thumbnail => "thumbnail",
        }
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Turns a blueprint payload into a PNG.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, payload: &str, mode: RenderMode) -> CatalogResult<Vec<u8>>;
}

/// Renderer reached over HTTP: the raw payload is POSTed to `{url}?mode={mode}`
/// and the response body is the image.
#[derive(Debug, Clone)]
pub struct HttpRenderer {
    http: reqwest::Client,
    url: String,
}

impl HttpRenderer {
    pub fn new(url: impl Into<String>, timeout: Duration) -> CatalogResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CatalogError::UpstreamUnavailable(format!("renderer client: {e}")))?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }

    fn endpoint(&self, mode: RenderMode) -> String {
        format!("{}?mode={}", self.url, mode)
    }
}

fn unavailable(err: reqwest::Error) -> CatalogError {
    CatalogError::UpstreamUnavailable(format!("renderer: {err}"))
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn render(&self, payload: &str, mode: RenderMode) -> CatalogResult<Vec<u8>> {
        let bytes = self
            .http
            .post(self.endpoint(mode))
            .header(CONTENT_TYPE, "text/plain")
            .body(payload.to_string())
            .send()
            .await
            .map_err(unavailable)?
            .error_for_status()
            .map_err(unavailable)?
            .bytes()
            .await
            .map_err(unavailable)?;
        if bytes.is_empty() {
            return Err(CatalogError::UpstreamUnavailable(format!(
                "renderer returned an empty {mode} image"
            )));
        }
        Ok(bytes.to_vec())
    }
}
