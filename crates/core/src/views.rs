//! Externally visible shapes. One constructor per entity; the HTTP layer
//! serializes these as they are.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::blueprint::model::{
    BlueprintEntry, BlueprintId, Comment, CommentId, Revision, RevisionId, UserId, Vote, VoteTally,
};
use crate::content::{ContentStore, ImageUrls};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionView {
    pub id: RevisionId,
    pub blueprint_id: BlueprintId,
    pub revision: i64,
    pub changes: String,
    pub checksum: String,
    /// Leading format digit of the payload.
    pub version: i32,
    /// Public link to the payload string.
    pub blueprint: String,
    pub rendered: bool,
    pub images: ImageUrls,
    pub thumbs_up: i64,
    pub thumbs_down: i64,
    pub user_vote: Vote,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RevisionView {
    pub fn new(revision: &Revision, tally: VoteTally, user_vote: Vote, content: &ContentStore) -> Self {
        Self {
            id: revision.id,
            blueprint_id: revision.blueprint_id,
            revision: revision.revision,
            changes: revision.changes.clone(),
            checksum: revision.checksum.clone(),
            version: revision.format_version,
            blueprint: content.payload_url(revision.id),
            rendered: revision.rendered,
            images: content.image_urls(&revision.checksum),
            thumbs_up: tally.thumbs_up,
            thumbs_down: tally.thumbs_down,
            user_vote,
            created_at: revision.created_at,
            updated_at: revision.updated_at,
        }
    }
}

/// One row of a list or search page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlueprintSummary {
    pub id: BlueprintId,
    pub user_id: UserId,
    pub name: String,
    pub description: String,
    /// Number of the latest active revision.
    pub revision: i64,
    pub revision_id: RevisionId,
    /// Signed vote total of the latest revision.
    pub score: i64,
    pub images: ImageUrls,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BlueprintSummary {
    pub fn new(
        entry: &BlueprintEntry,
        latest: &Revision,
        tally: VoteTally,
        tags: Vec<String>,
        content: &ContentStore,
    ) -> Self {
        Self {
            id: entry.id,
            user_id: entry.user_id,
            name: entry.name.clone(),
            description: entry.description.clone(),
            revision: latest.revision,
            revision_id: latest.id,
            score: tally.score(),
            images: content.image_urls(&latest.checksum),
            tags,
            created_at: entry.created_at,
            updated_at: entry.updated_at,
        }
    }
}

/// A single entry with its latest revision expanded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlueprintView {
    pub id: BlueprintId,
    pub user_id: UserId,
    pub name: String,
    pub description: String,
    pub last_revision: i64,
    pub tags: Vec<String>,
    pub latest: RevisionView,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BlueprintView {
    pub fn new(entry: &BlueprintEntry, tags: Vec<String>, latest: RevisionView) -> Self {
        Self {
            id: entry.id,
            user_id: entry.user_id,
            name: entry.name.clone(),
            description: entry.description.clone(),
            last_revision: entry.last_revision,
            tags,
            latest,
            created_at: entry.created_at,
            updated_at: entry.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: CommentId,
    pub revision_id: RevisionId,
    pub user_id: UserId,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Comment> for CommentView {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id,
            revision_id: comment.revision_id,
            user_id: comment.user_id,
            message: comment.message,
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        }
    }
}
