//! Relational storage boundary.
//!
//! Every component reads and writes through one of these traits. Two
//! backends implement all of them:
//!
//! - [`PgStore`] -- Postgres via sqlx; the production backend.
//! - [`MemoryStore`] -- a single `RwLock`-guarded state; tests and embedding.
//!
//! Invariants every backend upholds:
//! - Revision-number assignment and the revision insert are one atomic unit
//!   per entry; `last_revision` is never decremented.
//! - At most one active revision references a given checksum. A violating
//!   write fails with `DuplicateContent`.
//! - At most one rating row exists per `(user, revision)` pair.
//! - Soft-deleted rows stay readable to the lookups that say so.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use blueprint_catalog_query::{ListOrder, Page, SearchPattern};

use crate::blueprint::model::{
    BlueprintEntry, BlueprintId, Comment, CommentId, NewEntry, NewRevision, Rating, Revision,
    RevisionDeletion, RevisionId, Tag, TagId, TagUsage, UserId, VoteTally,
};
use crate::error::CatalogResult;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Insert an entry with `last_revision = 1`, its revision number 1 and
    /// links to its tags (created on first use), all in one unit.
    async fn insert_entry(
        &self,
        entry: NewEntry,
        first: NewRevision,
    ) -> CatalogResult<(BlueprintEntry, Revision)>;

    /// Atomically bump the entry's counter and insert a revision carrying the
    /// new number. Returns the updated entry and the revision.
    async fn append_revision(
        &self,
        blueprint_id: BlueprintId,
        revision: NewRevision,
    ) -> CatalogResult<(BlueprintEntry, Revision)>;

    /// Active entry by id.
    async fn entry(&self, id: BlueprintId) -> CatalogResult<Option<BlueprintEntry>>;

    /// Overwrite name and description and swap the tag set for `tags`, in
    /// one unit. Nothing changes when any part fails.
    async fn update_entry(
        &self,
        id: BlueprintId,
        name: &str,
        description: &str,
        tags: &[String],
    ) -> CatalogResult<BlueprintEntry>;

    /// Soft-delete an entry and every active revision it owns.
    async fn delete_entry(&self, id: BlueprintId) -> CatalogResult<()>;

    /// Active entries owned by `user_id`, newest first.
    async fn entries_of(&self, user_id: UserId) -> CatalogResult<Vec<BlueprintEntry>>;

    /// Active revision holding `checksum`, anywhere in the catalog.
    async fn revision_by_checksum(&self, checksum: &str) -> CatalogResult<Option<Revision>>;

    /// Active revision by global id.
    async fn revision(&self, id: RevisionId) -> CatalogResult<Option<Revision>>;

    /// Active revision by per-entry number.
    async fn revision_by_number(
        &self,
        blueprint_id: BlueprintId,
        number: i64,
    ) -> CatalogResult<Option<Revision>>;

    /// Highest-numbered active revision of an entry.
    async fn highest_revision(&self, blueprint_id: BlueprintId) -> CatalogResult<Option<Revision>>;

    /// Active revisions of an entry, ascending by number.
    async fn revisions(&self, blueprint_id: BlueprintId) -> CatalogResult<Vec<Revision>>;

    async fn update_changes(&self, id: RevisionId, changes: &str) -> CatalogResult<Revision>;

    /// Soft-delete a revision; deletes the owning entry as well when no active
    /// revision remains. Both happen in one unit.
    async fn delete_revision(&self, id: RevisionId) -> CatalogResult<RevisionDeletion>;

    /// Set `rendered = true`. Idempotent.
    async fn mark_rendered(&self, id: RevisionId) -> CatalogResult<()>;

    /// Active revisions still waiting for images, oldest first.
    async fn unrendered(&self, limit: i64) -> CatalogResult<Vec<Revision>>;
}

#[async_trait]
pub trait RatingStore: Send + Sync {
    /// The rating row for the pair, active or soft-deleted.
    async fn rating(&self, user_id: UserId, revision_id: RevisionId) -> CatalogResult<Option<Rating>>;

    async fn insert_rating(
        &self,
        user_id: UserId,
        revision_id: RevisionId,
        thumbs_up: bool,
    ) -> CatalogResult<Rating>;

    /// Clear the deletion marker and overwrite the direction in place.
    async fn reactivate_rating(&self, id: i64, thumbs_up: bool) -> CatalogResult<Rating>;

    async fn delete_rating(&self, id: i64) -> CatalogResult<()>;

    /// Count active ratings by direction.
    async fn tally(&self, revision_id: RevisionId) -> CatalogResult<VoteTally>;
}

#[async_trait]
pub trait TagStore: Send + Sync {
    /// Case-insensitive lookup.
    async fn tag_by_name(&self, name: &str) -> CatalogResult<Option<Tag>>;

    /// Create the tag, or return the existing one when another spelling of
    /// the same name already exists.
    async fn insert_tag(&self, name: &str) -> CatalogResult<Tag>;

    /// Insert the join row; no-op when present.
    async fn link_tag(&self, blueprint_id: BlueprintId, tag_id: TagId) -> CatalogResult<()>;

    async fn unlink_tags(&self, blueprint_id: BlueprintId) -> CatalogResult<()>;

    /// Tags of an entry, by name.
    async fn tags_of(&self, blueprint_id: BlueprintId) -> CatalogResult<Vec<Tag>>;

    /// Tags whose lower-cased name starts with `prefix` (all tags when empty),
    /// by active usage descending then name ascending.
    async fn tags_by_usage(&self, prefix: &str, limit: i64) -> CatalogResult<Vec<TagUsage>>;
}

#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn insert_comment(
        &self,
        revision_id: RevisionId,
        user_id: UserId,
        message: &str,
    ) -> CatalogResult<Comment>;

    /// Active comment by id.
    async fn comment(&self, id: CommentId) -> CatalogResult<Option<Comment>>;

    /// Active comments of a revision, oldest first.
    async fn comments(&self, revision_id: RevisionId) -> CatalogResult<Vec<Comment>>;

    async fn update_comment(&self, id: CommentId, message: &str) -> CatalogResult<Comment>;

    async fn delete_comment(&self, id: CommentId) -> CatalogResult<()>;
}

#[async_trait]
pub trait RankingStore: Send + Sync {
    /// One page of active entries under `order`.
    async fn ranked(&self, order: ListOrder, page: Page) -> CatalogResult<Vec<BlueprintEntry>>;

    /// One page of active entries matching `pattern`, ordered like `Top`.
    async fn search(&self, pattern: &SearchPattern, page: Page) -> CatalogResult<Vec<BlueprintEntry>>;
}

/// Everything the catalog needs from its relational store.
#[async_trait]
pub trait CatalogStore: LedgerStore + RatingStore + TagStore + CommentStore + RankingStore {
    /// Short backend name for logs and health output.
    fn backend(&self) -> &'static str;

    /// Round-trip to the store.
    async fn ping(&self) -> CatalogResult<()>;
}
