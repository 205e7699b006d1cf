use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub type UserId = i64;
pub type BlueprintId = i64;
pub type RevisionId = i64;
pub type CommentId = i64;
pub type TagId = i64;

/// A catalog entry owning an append-only revision history.
/// Maps to the `blueprints` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct BlueprintEntry {
    pub id: BlueprintId,
    pub user_id: UserId,
    pub name: String,
    pub description: String,
    /// Highest revision number ever issued for this entry. Never decremented.
    pub last_revision: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl BlueprintEntry {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }
}

/// One immutable, content-addressed version of an entry's payload.
/// Only `changes` and `rendered` change after insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Revision {
    pub id: RevisionId,
    pub blueprint_id: BlueprintId,
    /// Per-blueprint revision number, starting at 1.
    pub revision: i64,
    pub changes: String,
    /// Hex SHA-256 of the payload.
    pub checksum: String,
    /// Leading format digit of the payload.
    pub format_version: i32,
    pub rendered: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Revision {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Rating {
    pub id: i64,
    pub user_id: UserId,
    pub revision_id: RevisionId,
    pub thumbs_up: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Rating {
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Comment {
    pub id: CommentId,
    pub revision_id: RevisionId,
    pub user_id: UserId,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
}

/// A tag together with the number of active entries carrying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct TagUsage {
    pub id: TagId,
    pub name: String,
    pub usage: i64,
}

/// Fields of an entry to insert together with its first revision.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub user_id: UserId,
    pub name: String,
    pub description: String,
    /// Normalized tag names, linked in the same unit as the insert.
    pub tags: Vec<String>,
}

/// Fields of a revision to append; the number is assigned by the store.
#[derive(Debug, Clone)]
pub struct NewRevision {
    pub changes: String,
    pub checksum: String,
    pub format_version: i32,
}

/// Outcome of soft-deleting a revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionDeletion {
    pub revision_id: RevisionId,
    pub blueprint_id: BlueprintId,
    /// True when this was the entry's last active revision and the entry
    /// was deleted along with it.
    pub entry_deleted: bool,
}

/// Active thumbs-up / thumbs-down counts for one revision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteTally {
    pub thumbs_up: i64,
    pub thumbs_down: i64,
}

impl VoteTally {
    /// Signed vote total.
    pub fn score(&self) -> i64 {
        self.thumbs_up - self.thumbs_down
    }
}

/// The caller's own vote on a revision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Vote {
    #[default]
    None,
    Up,
    Down,
}

impl Vote {
    pub fn from_thumbs_up(thumbs_up: bool) -> Self {
        if thumbs_up {
            Vote::Up
        } else {
            Vote::Down
        }
    }
}
