use std::sync::Arc;

use crate::blueprint::model::{BlueprintId, Tag, TagUsage};
use crate::error::CatalogResult;
use crate::store::CatalogStore;

pub const DEFAULT_TAG_LIMIT: i64 = 20;
pub const MAX_TAG_LIMIT: i64 = 100;

/// Entry-to-tag links. Tags are created on first use and matched
/// case-insensitively afterwards.
#[derive(Clone)]
pub struct TagIndex {
    store: Arc<dyn CatalogStore>,
}

fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_TAG_LIMIT).clamp(1, MAX_TAG_LIMIT)
}

impl TagIndex {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    pub async fn attach(&self, blueprint_id: BlueprintId, name: &str) -> CatalogResult<Tag> {
        let tag = match self.store.tag_by_name(name).await? {
            Some(tag) => tag,
            None => self.store.insert_tag(name).await?,
        };
        self.store.link_tag(blueprint_id, tag.id).await?;
        Ok(tag)
    }

    /// Remove every tag from the entry. The tags themselves stay.
    pub async fn detach_all(&self, blueprint_id: BlueprintId) -> CatalogResult<()> {
        self.store.unlink_tags(blueprint_id).await?;
        tracing::debug!(blueprint_id, "tags detached");
        Ok(())
    }

    pub async fn tags_of(&self, blueprint_id: BlueprintId) -> CatalogResult<Vec<String>> {
        Ok(self
            .store
            .tags_of(blueprint_id)
            .await?
            .into_iter()
            .map(|t| t.name)
            .collect())
    }

    /// Most used tags first, ties by name.
    pub async fn popular(&self, limit: Option<i64>) -> CatalogResult<Vec<TagUsage>> {
        self.store.tags_by_usage("", clamp_limit(limit)).await
    }

    /// Tags starting with `prefix`, in the same order as [`TagIndex::popular`].
    pub async fn autocomplete(&self, prefix: &str, limit: Option<i64>) -> CatalogResult<Vec<TagUsage>> {
        self.store
            .tags_by_usage(&prefix.trim().to_lowercase(), clamp_limit(limit))
            .await
    }
}
