//! Blob storage for blueprint payloads and their rendered images.
//!
//! Payloads are stored under `revision-blueprint-{revisionId}` in the
//! blueprint bucket. Images are content-addressed in the render bucket as
//! `{digest}.png`, `{digest}-square.png` and `{digest}-thumbnail.png`. Every
//! public URL is derived from the key alone.

pub mod object_store;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::blueprint::model::RevisionId;
use crate::error::{CatalogError, CatalogResult};
use crate::render::RenderMode;

pub use object_store::{HttpObjectStore, MemoryObjectStore, ObjectStore};

const PAYLOAD_CONTENT_TYPE: &str = "text/plain; charset=utf-8";
const IMAGE_CONTENT_TYPE: &str = "image/png";

/// Where payloads and images live, and the base they are published under.
#[derive(Debug, Clone)]
pub struct ContentConfig {
    pub public_url: String,
    pub blueprint_bucket: String,
    pub render_bucket: String,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            public_url: "http://localhost:9000".to_string(),
            blueprint_bucket: "blooper-blueprints".to_string(),
            render_bucket: "blooper-renders".to_string(),
        }
    }
}

/// Public links to the three rendered variants of one digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageUrls {
    pub image: String,
    pub square: String,
    pub thumbnail: String,
}

/// The three variants produced by one render job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImages {
    pub normal: Vec<u8>,
    pub square: Vec<u8>,
    pub thumbnail: Vec<u8>,
}

#[derive(Clone)]
pub struct ContentStore {
    objects: Arc<dyn ObjectStore>,
    config: ContentConfig,
}

impl ContentStore {
    pub fn new(objects: Arc<dyn ObjectStore>, config: ContentConfig) -> Self {
        Self { objects, config }
    }

    pub fn payload_key(revision_id: RevisionId) -> String {
        format!("revision-blueprint-{revision_id}")
    }

    pub fn image_key(digest: &str, mode: RenderMode) -> String {
        match mode {
            RenderMode::Default => format!("{digest}.png"),
            RenderMode::Square => format!("{digest}-square.png"),
            RenderMode::Thumbnail => format!("{digest}-thumbnail.png"),
        }
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.public_url.trim_end_matches('/'),
            bucket,
            key
        )
    }

    pub fn payload_url(&self, revision_id: RevisionId) -> String {
        self.public_url(&self.config.blueprint_bucket, &Self::payload_key(revision_id))
    }

    pub fn image_urls(&self, digest: &str) -> ImageUrls {
        let url = |mode| self.public_url(&self.config.render_bucket, &Self::image_key(digest, mode));
        ImageUrls {
            image: url(RenderMode::Default),
            square: url(RenderMode::Square),
            thumbnail: url(RenderMode::Thumbnail),
        }
    }

    /// Store the payload of a revision. Rewriting the same revision is
    /// harmless since a revision's payload never changes.
    pub async fn put_payload(&self, revision_id: RevisionId, payload: &str) -> CatalogResult<()> {
        self.objects
            .put(
                &self.config.blueprint_bucket,
                &Self::payload_key(revision_id),
                payload.as_bytes().to_vec(),
                PAYLOAD_CONTENT_TYPE,
            )
            .await
    }

    pub async fn get_payload(&self, revision_id: RevisionId) -> CatalogResult<String> {
        let key = Self::payload_key(revision_id);
        let bytes = self
            .objects
            .get(&self.config.blueprint_bucket, &key)
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("payload {key}")))?;
        String::from_utf8(bytes)
            .map_err(|e| CatalogError::Storage(format!("payload {key} is not UTF-8: {e}")))
    }

    pub async fn put_rendered_images(&self, digest: &str, images: RenderedImages) -> CatalogResult<()> {
        for (mode, bytes) in [
            (RenderMode::Default, images.normal),
            (RenderMode::Square, images.square),
            (RenderMode::Thumbnail, images.thumbnail),
        ] {
            self.objects
                .put(
                    &self.config.render_bucket,
                    &Self::image_key(digest, mode),
                    bytes,
                    IMAGE_CONTENT_TYPE,
                )
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (Arc<MemoryObjectStore>, ContentStore) {
        let objects = Arc::new(MemoryObjectStore::new());
        let content = ContentStore::new(objects.clone(), ContentConfig::default());
        (objects, content)
    }

    #[test]
    fn keys_follow_naming_convention() {
        assert_eq!(ContentStore::payload_key(42), "revision-blueprint-42");
        assert_eq!(ContentStore::image_key("d1", RenderMode::Default), "d1.png");
        assert_eq!(ContentStore::image_key("d1", RenderMode::Square), "d1-square.png");
        assert_eq!(
            ContentStore::image_key("d1", RenderMode::Thumbnail),
            "d1-thumbnail.png"
        );
    }

    #[test]
    fn urls_are_derived_from_digest() {
        let (_, content) = store();
        let urls = content.image_urls("abc");
        assert_eq!(urls.image, "http://localhost:9000/blooper-renders/abc.png");
        assert_eq!(urls.square, "http://localhost:9000/blooper-renders/abc-square.png");
        assert_eq!(
            urls.thumbnail,
            "http://localhost:9000/blooper-renders/abc-thumbnail.png"
        );
        assert_eq!(
            content.payload_url(7),
            "http://localhost:9000/blooper-blueprints/revision-blueprint-7"
        );
    }

    #[tokio::test]
    async fn payload_round_trip() {
        let (objects, content) = store();
        content.put_payload(1, "0eJw=").await.unwrap();
        content.put_payload(1, "0eJw=").await.unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(content.get_payload(1).await.unwrap(), "0eJw=");
        assert!(matches!(
            content.get_payload(2).await,
            Err(CatalogError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn rendered_images_land_in_render_bucket() {
        let (objects, content) = store();
        content
            .put_rendered_images(
                "abc",
                RenderedImages {
                    normal: vec![1],
                    square: vec![2],
                    thumbnail: vec![3],
                },
            )
            .await
            .unwrap();
        assert_eq!(objects.get("blooper-renders", "abc-square.png").await.unwrap(), Some(vec![2]));
        assert_eq!(
            objects.content_type("blooper-renders", "abc.png").as_deref(),
            Some("image/png")
        );
    }
}
