//! Append-only revision history per catalog entry.
//!
//! Revision numbers come from the entry's `last_revision` counter, bumped by
//! the store in the same atomic unit as the revision insert. The counter is
//! never decremented, so after deletions it can point at a deleted revision;
//! [`RevisionLedger::latest_revision`] falls back to the highest active one.

use std::sync::Arc;

use crate::blueprint::model::{
    BlueprintEntry, BlueprintId, NewEntry, NewRevision, Revision, RevisionDeletion, RevisionId,
    UserId,
};
use crate::blueprint::payload::BlueprintPayload;
use crate::content::ContentStore;
use crate::error::{CatalogError, CatalogResult};
use crate::store::CatalogStore;

#[derive(Clone)]
pub struct RevisionLedger {
    store: Arc<dyn CatalogStore>,
    content: ContentStore,
}

impl RevisionLedger {
    pub fn new(store: Arc<dyn CatalogStore>, content: ContentStore) -> Self {
        Self { store, content }
    }

    async fn ensure_unique(&self, payload: &BlueprintPayload) -> CatalogResult<()> {
        if self
            .store
            .revision_by_checksum(payload.checksum())
            .await?
            .is_some()
        {
            return Err(CatalogError::DuplicateContent(payload.checksum().to_string()));
        }
        Ok(())
    }

    /// Upload the payload of a just-inserted revision. If the upload fails the
    /// revision is deleted again so no revision exists without its payload.
    async fn store_payload(&self, revision: &Revision, payload: &BlueprintPayload) -> CatalogResult<()> {
        if let Err(e) = self.content.put_payload(revision.id, payload.as_str()).await {
            tracing::warn!(
                revision_id = revision.id,
                error = %e,
                "payload upload failed, abandoning revision"
            );
            if let Err(rollback) = self.store.delete_revision(revision.id).await {
                tracing::error!(revision_id = revision.id, error = %rollback, "failed to abandon revision");
            }
            return Err(e);
        }
        Ok(())
    }

    /// Create an entry together with revision 1 and its tags.
    pub async fn create_entry(
        &self,
        entry: NewEntry,
        changes: String,
        payload: &BlueprintPayload,
    ) -> CatalogResult<(BlueprintEntry, Revision)> {
        self.ensure_unique(payload).await?;
        let (entry, revision) = self
            .store
            .insert_entry(
                entry,
                NewRevision {
                    changes,
                    checksum: payload.checksum().to_string(),
                    format_version: payload.format_version(),
                },
            )
            .await?;
        self.store_payload(&revision, payload).await?;

        tracing::info!(
            blueprint_id = entry.id,
            revision_id = revision.id,
            user_id = entry.user_id,
            digest = %revision.checksum,
            "blueprint created"
        );
        Ok((entry, revision))
    }

    /// Append a revision. Only the owner may do this.
    pub async fn add_revision(
        &self,
        actor: UserId,
        entry: &BlueprintEntry,
        changes: String,
        payload: &BlueprintPayload,
    ) -> CatalogResult<(BlueprintEntry, Revision)> {
        if !entry.is_owned_by(actor) {
            return Err(CatalogError::Forbidden(format!(
                "user {actor} does not own blueprint {}",
                entry.id
            )));
        }
        self.ensure_unique(payload).await?;
        let (entry, revision) = self
            .store
            .append_revision(
                entry.id,
                NewRevision {
                    changes,
                    checksum: payload.checksum().to_string(),
                    format_version: payload.format_version(),
                },
            )
            .await?;
        self.store_payload(&revision, payload).await?;

        tracing::info!(
            blueprint_id = entry.id,
            revision_id = revision.id,
            revision = revision.revision,
            digest = %revision.checksum,
            "revision added"
        );
        Ok((entry, revision))
    }

    pub async fn entry(&self, id: BlueprintId) -> CatalogResult<BlueprintEntry> {
        self.store
            .entry(id)
            .await?
            .ok_or_else(|| CatalogError::not_found("blueprint", id))
    }

    /// The revision the counter points at, or the highest active one when
    /// that revision has been deleted.
    pub async fn latest_revision(&self, entry: &BlueprintEntry) -> CatalogResult<Revision> {
        if let Some(revision) = self
            .store
            .revision_by_number(entry.id, entry.last_revision)
            .await?
        {
            return Ok(revision);
        }
        self.store
            .highest_revision(entry.id)
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("blueprint {} has no revisions", entry.id)))
    }

    pub async fn revision_by_number(&self, entry: &BlueprintEntry, number: i64) -> CatalogResult<Revision> {
        self.store
            .revision_by_number(entry.id, number)
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("revision {number} of blueprint {}", entry.id)))
    }

    pub async fn revision(&self, id: RevisionId) -> CatalogResult<Revision> {
        self.store
            .revision(id)
            .await?
            .ok_or_else(|| CatalogError::not_found("revision", id))
    }

    pub async fn revisions(&self, entry: &BlueprintEntry) -> CatalogResult<Vec<Revision>> {
        self.store.revisions(entry.id).await
    }

    pub async fn update_changes(&self, revision: &Revision, changes: &str) -> CatalogResult<Revision> {
        self.store.update_changes(revision.id, changes).await
    }

    /// Soft-delete a revision, taking the entry with it when it was the last.
    pub async fn delete_revision(&self, revision: &Revision) -> CatalogResult<RevisionDeletion> {
        let outcome = self.store.delete_revision(revision.id).await?;
        tracing::info!(
            blueprint_id = outcome.blueprint_id,
            revision_id = outcome.revision_id,
            entry_deleted = outcome.entry_deleted,
            "revision deleted"
        );
        Ok(outcome)
    }

    pub async fn delete_entry(&self, entry: &BlueprintEntry) -> CatalogResult<()> {
        self.store.delete_entry(entry.id).await?;
        tracing::info!(blueprint_id = entry.id, "blueprint deleted");
        Ok(())
    }

    pub async fn entries_of(&self, user_id: UserId) -> CatalogResult<Vec<BlueprintEntry>> {
        self.store.entries_of(user_id).await
    }
}
