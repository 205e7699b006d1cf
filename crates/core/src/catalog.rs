//! The catalog facade: entry lifecycle, ownership checks, and view assembly.
//!
//! Every lookup and ownership check happens before the first write, so a
//! rejected call leaves no partial state behind. Successful mutations publish
//! a [`CatalogEvent`]; new revisions are handed to the render pipeline and
//! the caller never waits for it.

use std::sync::Arc;

use blueprint_catalog_query::{ListOrder, Page};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::blueprint::model::{
    BlueprintEntry, BlueprintId, CommentId, NewEntry, Revision, RevisionDeletion, RevisionId, TagUsage,
    UserId, Vote,
};
use crate::blueprint::payload::BlueprintPayload;
use crate::blueprint::validate::{normalize_tags, validate_changes, validate_description, validate_name};
use crate::comments::CommentBoard;
use crate::content::ContentStore;
use crate::error::{CatalogError, CatalogResult};
use crate::events::bus::EventBus;
use crate::events::types::{CatalogEvent, EntryEvent, RevisionEvent};
use crate::ledger::RevisionLedger;
use crate::ranking::RankingEngine;
use crate::rating::RatingAggregator;
use crate::render::RenderPipeline;
use crate::store::CatalogStore;
use crate::tags::TagIndex;
use crate::views::{BlueprintSummary, BlueprintView, CommentView, RevisionView};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBlueprint {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Change notes of the first revision.
    #[serde(default)]
    pub changes: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// The blueprint string.
    pub blueprint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBlueprint {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRevision {
    #[serde(default)]
    pub changes: String,
    pub blueprint: String,
}

#[derive(Clone)]
pub struct BlueprintCatalog {
    store: Arc<dyn CatalogStore>,
    content: ContentStore,
    ledger: RevisionLedger,
    ratings: RatingAggregator,
    tags: TagIndex,
    comments: CommentBoard,
    ranking: RankingEngine,
    render: RenderPipeline,
    events: EventBus,
}

fn forbidden(actor: UserId, entry: &BlueprintEntry) -> CatalogError {
    CatalogError::Forbidden(format!("user {actor} does not own blueprint {}", entry.id))
}

fn revision_event(revision: &Revision) -> RevisionEvent {
    RevisionEvent {
        blueprint_id: revision.blueprint_id,
        revision_id: revision.id,
        revision: revision.revision,
        checksum: revision.checksum.clone(),
        timestamp: Utc::now(),
    }
}

impl BlueprintCatalog {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        content: ContentStore,
        render: RenderPipeline,
        events: EventBus,
    ) -> Self {
        let ledger = RevisionLedger::new(store.clone(), content.clone());
        let ratings = RatingAggregator::new(store.clone());
        let tags = TagIndex::new(store.clone());
        let comments = CommentBoard::new(store.clone());
        let ranking = RankingEngine::new(
            store.clone(),
            ledger.clone(),
            ratings.clone(),
            tags.clone(),
            content.clone(),
        );
        Self {
            store,
            content,
            ledger,
            ratings,
            tags,
            comments,
            ranking,
            render,
            events,
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    pub async fn ping(&self) -> CatalogResult<()> {
        self.store.ping().await
    }

    async fn owned_entry(&self, actor: UserId, id: BlueprintId) -> CatalogResult<BlueprintEntry> {
        let entry = self.ledger.entry(id).await?;
        if !entry.is_owned_by(actor) {
            return Err(forbidden(actor, &entry));
        }
        Ok(entry)
    }

    /// A revision and its entry, checked for ownership.
    async fn owned_revision(&self, actor: UserId, id: RevisionId) -> CatalogResult<(BlueprintEntry, Revision)> {
        let revision = self.ledger.revision(id).await?;
        let entry = self.owned_entry(actor, revision.blueprint_id).await?;
        Ok((entry, revision))
    }

    async fn revision_view(&self, revision: &Revision, viewer: Option<UserId>) -> CatalogResult<RevisionView> {
        let tally = self.ratings.tally(revision.id).await?;
        let vote = match viewer {
            Some(user_id) => self.ratings.user_vote(revision.id, user_id).await?,
            None => Vote::None,
        };
        Ok(RevisionView::new(revision, tally, vote, &self.content))
    }

    async fn entry_view(&self, entry: &BlueprintEntry, viewer: Option<UserId>) -> CatalogResult<BlueprintView> {
        let latest = self.ledger.latest_revision(entry).await?;
        let latest = self.revision_view(&latest, viewer).await?;
        let tags = self.tags.tags_of(entry.id).await?;
        Ok(BlueprintView::new(entry, tags, latest))
    }

    // Entries

    pub async fn create_entry(&self, actor: UserId, request: CreateBlueprint) -> CatalogResult<BlueprintView> {
        let name = validate_name(&request.name)?;
        let description = validate_description(&request.description)?;
        let changes = validate_changes(&request.changes)?;
        let tags = normalize_tags(&request.tags)?;
        let payload = BlueprintPayload::parse(request.blueprint)?;

        let new = NewEntry {
            user_id: actor,
            name,
            description,
            tags,
        };
        let (entry, revision) = self.ledger.create_entry(new, changes, &payload).await?;
        self.render.schedule(&revision, payload.as_str());

        self.events.emit(CatalogEvent::EntryCreated(EntryEvent {
            blueprint_id: entry.id,
            user_id: actor,
            timestamp: Utc::now(),
        }));
        self.events.emit(CatalogEvent::RevisionCreated(revision_event(&revision)));
        self.entry_view(&entry, Some(actor)).await
    }

    pub async fn get_entry(&self, id: BlueprintId, viewer: Option<UserId>) -> CatalogResult<BlueprintView> {
        let entry = self.ledger.entry(id).await?;
        self.entry_view(&entry, viewer).await
    }

    /// Replace name, description and the whole tag set.
    pub async fn update_entry(
        &self,
        actor: UserId,
        id: BlueprintId,
        request: UpdateBlueprint,
    ) -> CatalogResult<BlueprintView> {
        let entry = self.owned_entry(actor, id).await?;
        let name = validate_name(&request.name)?;
        let description = validate_description(&request.description)?;
        let tags = normalize_tags(&request.tags)?;

        let entry = self
            .store
            .update_entry(entry.id, &name, &description, &tags)
            .await?;
        tracing::info!(blueprint_id = entry.id, user_id = actor, "blueprint updated");
        self.entry_view(&entry, Some(actor)).await
    }

    pub async fn delete_entry(&self, actor: UserId, id: BlueprintId) -> CatalogResult<()> {
        let entry = self.owned_entry(actor, id).await?;
        self.ledger.delete_entry(&entry).await?;
        self.events.emit(CatalogEvent::EntryDeleted(EntryEvent {
            blueprint_id: entry.id,
            user_id: actor,
            timestamp: Utc::now(),
        }));
        Ok(())
    }

    pub async fn entries_of(&self, user_id: UserId) -> CatalogResult<Vec<BlueprintSummary>> {
        let entries = self.ledger.entries_of(user_id).await?;
        self.ranking.summaries(entries).await
    }

    // Revisions

    pub async fn add_revision(
        &self,
        actor: UserId,
        entry_id: BlueprintId,
        request: CreateRevision,
    ) -> CatalogResult<RevisionView> {
        let entry = self.owned_entry(actor, entry_id).await?;
        let changes = validate_changes(&request.changes)?;
        let payload = BlueprintPayload::parse(request.blueprint)?;

        let (_, revision) = self.ledger.add_revision(actor, &entry, changes, &payload).await?;
        self.render.schedule(&revision, payload.as_str());
        self.events.emit(CatalogEvent::RevisionCreated(revision_event(&revision)));
        self.revision_view(&revision, Some(actor)).await
    }

    pub async fn revisions(&self, entry_id: BlueprintId, viewer: Option<UserId>) -> CatalogResult<Vec<RevisionView>> {
        let entry = self.ledger.entry(entry_id).await?;
        let mut views = Vec::new();
        for revision in self.ledger.revisions(&entry).await? {
            views.push(self.revision_view(&revision, viewer).await?);
        }
        Ok(views)
    }

    pub async fn latest_revision(&self, entry_id: BlueprintId, viewer: Option<UserId>) -> CatalogResult<RevisionView> {
        let entry = self.ledger.entry(entry_id).await?;
        let revision = self.ledger.latest_revision(&entry).await?;
        self.revision_view(&revision, viewer).await
    }

    pub async fn revision_by_number(
        &self,
        entry_id: BlueprintId,
        number: i64,
        viewer: Option<UserId>,
    ) -> CatalogResult<RevisionView> {
        let entry = self.ledger.entry(entry_id).await?;
        let revision = self.ledger.revision_by_number(&entry, number).await?;
        self.revision_view(&revision, viewer).await
    }

    pub async fn get_revision(&self, id: RevisionId, viewer: Option<UserId>) -> CatalogResult<RevisionView> {
        let revision = self.ledger.revision(id).await?;
        self.revision_view(&revision, viewer).await
    }

    /// Edit the change notes; the payload of a revision never changes.
    pub async fn update_revision(&self, actor: UserId, id: RevisionId, changes: &str) -> CatalogResult<RevisionView> {
        let (_, revision) = self.owned_revision(actor, id).await?;
        let changes = validate_changes(changes)?;
        let revision = self.ledger.update_changes(&revision, &changes).await?;
        tracing::info!(revision_id = revision.id, user_id = actor, "revision notes updated");
        self.revision_view(&revision, Some(actor)).await
    }

    pub async fn delete_revision(&self, actor: UserId, id: RevisionId) -> CatalogResult<RevisionDeletion> {
        let (entry, revision) = self.owned_revision(actor, id).await?;
        let outcome = self.ledger.delete_revision(&revision).await?;

        self.events.emit(CatalogEvent::RevisionDeleted(revision_event(&revision)));
        if outcome.entry_deleted {
            self.events.emit(CatalogEvent::EntryDeleted(EntryEvent {
                blueprint_id: entry.id,
                user_id: actor,
                timestamp: Utc::now(),
            }));
        }
        Ok(outcome)
    }

    // Ratings

    /// Cast, change or withdraw (`Vote::None`) the caller's vote.
    pub async fn rate_revision(&self, actor: UserId, id: RevisionId, vote: Vote) -> CatalogResult<RevisionView> {
        let revision = self.ledger.revision(id).await?;
        self.ratings.rate(actor, revision.id, vote).await?;
        self.revision_view(&revision, Some(actor)).await
    }

    // Listing

    pub async fn list(&self, order: ListOrder, page: Page) -> CatalogResult<Vec<BlueprintSummary>> {
        self.ranking.list(order, page).await
    }

    pub async fn search(&self, query: &str, page: Page) -> CatalogResult<Vec<BlueprintSummary>> {
        self.ranking.search(query, page).await
    }

    // Tags

    pub async fn popular_tags(&self, limit: Option<i64>) -> CatalogResult<Vec<TagUsage>> {
        self.tags.popular(limit).await
    }

    pub async fn autocomplete_tags(&self, prefix: &str, limit: Option<i64>) -> CatalogResult<Vec<TagUsage>> {
        self.tags.autocomplete(prefix, limit).await
    }

    // Comments

    pub async fn add_comment(&self, actor: UserId, revision_id: RevisionId, message: &str) -> CatalogResult<CommentView> {
        let revision = self.ledger.revision(revision_id).await?;
        Ok(self.comments.add(actor, revision.id, message).await?.into())
    }

    pub async fn comment(&self, id: CommentId) -> CatalogResult<CommentView> {
        Ok(self.comments.get(id).await?.into())
    }

    pub async fn comments(&self, revision_id: RevisionId) -> CatalogResult<Vec<CommentView>> {
        let revision = self.ledger.revision(revision_id).await?;
        Ok(self
            .comments
            .list(revision.id)
            .await?
            .into_iter()
            .map(CommentView::from)
            .collect())
    }

    pub async fn update_comment(&self, actor: UserId, id: CommentId, message: &str) -> CatalogResult<CommentView> {
        Ok(self.comments.update(actor, id, message).await?.into())
    }

    pub async fn delete_comment(&self, actor: UserId, id: CommentId) -> CatalogResult<()> {
        self.comments.delete(actor, id).await
    }
}
