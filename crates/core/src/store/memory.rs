use std::collections::{BTreeMap, BTreeSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use blueprint_catalog_query::{sort_by_order, ListOrder, Page, RankKey, SearchPattern};
use chrono::Utc;

use crate::blueprint::model::{
    BlueprintEntry, BlueprintId, Comment, CommentId, NewEntry, NewRevision, Rating, Revision,
    RevisionDeletion, RevisionId, Tag, TagId, TagUsage, UserId, VoteTally,
};
use crate::error::{CatalogError, CatalogResult};
use crate::store::{CatalogStore, CommentStore, LedgerStore, RankingStore, RatingStore, TagStore};

/// In-memory catalog store.
///
/// All tables live in one `State` behind a single `RwLock`, so every trait
/// method is atomic with respect to every other. Nothing is persisted.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

#[derive(Debug, Default)]
struct State {
    next_id: i64,
    entries: BTreeMap<BlueprintId, BlueprintEntry>,
    revisions: BTreeMap<RevisionId, Revision>,
    ratings: BTreeMap<i64, Rating>,
    comments: BTreeMap<CommentId, Comment>,
    tags: BTreeMap<TagId, Tag>,
    links: BTreeSet<(BlueprintId, TagId)>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn active_entry(&self, id: BlueprintId) -> Option<&BlueprintEntry> {
        self.entries.get(&id).filter(|e| !e.is_deleted())
    }

    fn active_revisions(&self, blueprint_id: BlueprintId) -> impl Iterator<Item = &Revision> {
        self.revisions
            .values()
            .filter(move |r| r.blueprint_id == blueprint_id && !r.is_deleted())
    }

    fn checksum_taken(&self, checksum: &str) -> bool {
        self.revisions
            .values()
            .any(|r| r.checksum == checksum && !r.is_deleted())
    }

    fn insert_revision(
        &mut self,
        blueprint_id: BlueprintId,
        number: i64,
        new: NewRevision,
    ) -> CatalogResult<Revision> {
        if self.checksum_taken(&new.checksum) {
            return Err(CatalogError::DuplicateContent(new.checksum));
        }
        if self
            .revisions
            .values()
            .any(|r| r.blueprint_id == blueprint_id && r.revision == number)
        {
            return Err(CatalogError::Conflict(format!(
                "revision {number} of blueprint {blueprint_id} already exists"
            )));
        }
        let now = Utc::now();
        let revision = Revision {
            id: self.next_id(),
            blueprint_id,
            revision: number,
            changes: new.changes,
            checksum: new.checksum,
            format_version: new.format_version,
            rendered: false,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.revisions.insert(revision.id, revision.clone());
        Ok(revision)
    }

    /// Find a tag case-insensitively or create it.
    fn tag_named(&mut self, name: &str) -> Tag {
        let lowered = name.to_lowercase();
        if let Some(existing) = self.tags.values().find(|t| t.name.to_lowercase() == lowered) {
            return existing.clone();
        }
        let tag = Tag {
            id: self.next_id(),
            name: name.to_string(),
        };
        self.tags.insert(tag.id, tag.clone());
        tag
    }

    fn set_tags(&mut self, blueprint_id: BlueprintId, names: &[String]) {
        self.links.retain(|(b, _)| *b != blueprint_id);
        for name in names {
            let tag = self.tag_named(name);
            self.links.insert((blueprint_id, tag.id));
        }
    }

    fn tally(&self, revision_id: RevisionId) -> VoteTally {
        self.ratings
            .values()
            .filter(|r| r.revision_id == revision_id && r.is_active())
            .fold(VoteTally::default(), |mut t, r| {
                if r.thumbs_up {
                    t.thumbs_up += 1;
                } else {
                    t.thumbs_down += 1;
                }
                t
            })
    }

    fn rank_key(&self, entry: &BlueprintEntry) -> RankKey {
        let score = self
            .active_revisions(entry.id)
            .max_by_key(|r| r.revision)
            .map(|r| self.tally(r.id).score())
            .unwrap_or(0);
        RankKey {
            id: entry.id,
            created_at_micros: entry.created_at.timestamp_micros(),
            score,
        }
    }

    fn matches(&self, entry: &BlueprintEntry, pattern: &SearchPattern) -> bool {
        pattern.matches(&entry.name)
            || pattern.matches(&entry.description)
            || self
                .active_revisions(entry.id)
                .any(|r| pattern.matches(&r.changes))
            || self
                .links
                .iter()
                .filter(|(b, _)| *b == entry.id)
                .filter_map(|(_, t)| self.tags.get(t))
                .any(|t| pattern.matches(&t.name))
    }

    fn page(&self, order: ListOrder, mut entries: Vec<BlueprintEntry>, page: Page) -> Vec<BlueprintEntry> {
        let keys: BTreeMap<BlueprintId, RankKey> =
            entries.iter().map(|e| (e.id, self.rank_key(e))).collect();
        sort_by_order(order, &mut entries, |e| keys[&e.id]);
        page.slice(&entries).to_vec()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> CatalogResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|e| CatalogError::Storage(format!("lock poisoned: {e}")))
    }

    fn write(&self) -> CatalogResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|e| CatalogError::Storage(format!("lock poisoned: {e}")))
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn insert_entry(
        &self,
        entry: NewEntry,
        first: NewRevision,
    ) -> CatalogResult<(BlueprintEntry, Revision)> {
        let mut state = self.write()?;
        if state.checksum_taken(&first.checksum) {
            return Err(CatalogError::DuplicateContent(first.checksum));
        }
        let tags = entry.tags;
        let now = Utc::now();
        let entry = BlueprintEntry {
            id: state.next_id(),
            user_id: entry.user_id,
            name: entry.name,
            description: entry.description,
            last_revision: 1,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        state.entries.insert(entry.id, entry.clone());
        let revision = state.insert_revision(entry.id, 1, first)?;
        state.set_tags(entry.id, &tags);
        Ok((entry, revision))
    }

    async fn append_revision(
        &self,
        blueprint_id: BlueprintId,
        revision: NewRevision,
    ) -> CatalogResult<(BlueprintEntry, Revision)> {
        let mut state = self.write()?;
        let number = state
            .active_entry(blueprint_id)
            .map(|e| e.last_revision + 1)
            .ok_or_else(|| CatalogError::not_found("blueprint", blueprint_id))?;
        let revision = state.insert_revision(blueprint_id, number, revision)?;
        let entry = state
            .entries
            .get_mut(&blueprint_id)
            .ok_or_else(|| CatalogError::not_found("blueprint", blueprint_id))?;
        entry.last_revision = number;
        entry.updated_at = revision.created_at;
        Ok((entry.clone(), revision))
    }

    async fn entry(&self, id: BlueprintId) -> CatalogResult<Option<BlueprintEntry>> {
        Ok(self.read()?.active_entry(id).cloned())
    }

    async fn update_entry(
        &self,
        id: BlueprintId,
        name: &str,
        description: &str,
        tags: &[String],
    ) -> CatalogResult<BlueprintEntry> {
        let mut state = self.write()?;
        let entry = state
            .entries
            .get_mut(&id)
            .filter(|e| !e.is_deleted())
            .ok_or_else(|| CatalogError::not_found("blueprint", id))?;
        entry.name = name.to_string();
        entry.description = description.to_string();
        entry.updated_at = Utc::now();
        let entry = entry.clone();
        state.set_tags(id, tags);
        Ok(entry)
    }

    async fn delete_entry(&self, id: BlueprintId) -> CatalogResult<()> {
        let mut state = self.write()?;
        let now = Utc::now();
        let entry = state
            .entries
            .get_mut(&id)
            .filter(|e| !e.is_deleted())
            .ok_or_else(|| CatalogError::not_found("blueprint", id))?;
        entry.deleted_at = Some(now);
        for revision in state.revisions.values_mut() {
            if revision.blueprint_id == id && revision.deleted_at.is_none() {
                revision.deleted_at = Some(now);
            }
        }
        Ok(())
    }

    async fn entries_of(&self, user_id: UserId) -> CatalogResult<Vec<BlueprintEntry>> {
        let state = self.read()?;
        let mut entries: Vec<BlueprintEntry> = state
            .entries
            .values()
            .filter(|e| e.user_id == user_id && !e.is_deleted())
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(entries)
    }

    async fn revision_by_checksum(&self, checksum: &str) -> CatalogResult<Option<Revision>> {
        Ok(self
            .read()?
            .revisions
            .values()
            .find(|r| r.checksum == checksum && !r.is_deleted())
            .cloned())
    }

    async fn revision(&self, id: RevisionId) -> CatalogResult<Option<Revision>> {
        Ok(self
            .read()?
            .revisions
            .get(&id)
            .filter(|r| !r.is_deleted())
            .cloned())
    }

    async fn revision_by_number(
        &self,
        blueprint_id: BlueprintId,
        number: i64,
    ) -> CatalogResult<Option<Revision>> {
        Ok(self
            .read()?
            .active_revisions(blueprint_id)
            .find(|r| r.revision == number)
            .cloned())
    }

    async fn highest_revision(&self, blueprint_id: BlueprintId) -> CatalogResult<Option<Revision>> {
        Ok(self
            .read()?
            .active_revisions(blueprint_id)
            .max_by_key(|r| r.revision)
            .cloned())
    }

    async fn revisions(&self, blueprint_id: BlueprintId) -> CatalogResult<Vec<Revision>> {
        let state = self.read()?;
        let mut revisions: Vec<Revision> = state.active_revisions(blueprint_id).cloned().collect();
        revisions.sort_by_key(|r| r.revision);
        Ok(revisions)
    }

    async fn update_changes(&self, id: RevisionId, changes: &str) -> CatalogResult<Revision> {
        let mut state = self.write()?;
        let revision = state
            .revisions
            .get_mut(&id)
            .filter(|r| !r.is_deleted())
            .ok_or_else(|| CatalogError::not_found("revision", id))?;
        revision.changes = changes.to_string();
        revision.updated_at = Utc::now();
        Ok(revision.clone())
    }

    async fn delete_revision(&self, id: RevisionId) -> CatalogResult<RevisionDeletion> {
        let mut state = self.write()?;
        let now = Utc::now();
        let revision = state
            .revisions
            .get_mut(&id)
            .filter(|r| !r.is_deleted())
            .ok_or_else(|| CatalogError::not_found("revision", id))?;
        revision.deleted_at = Some(now);
        let blueprint_id = revision.blueprint_id;

        let entry_deleted = state.active_revisions(blueprint_id).next().is_none();
        if entry_deleted {
            if let Some(entry) = state.entries.get_mut(&blueprint_id) {
                entry.deleted_at.get_or_insert(now);
            }
        }
        Ok(RevisionDeletion {
            revision_id: id,
            blueprint_id,
            entry_deleted,
        })
    }

    async fn mark_rendered(&self, id: RevisionId) -> CatalogResult<()> {
        let mut state = self.write()?;
        let revision = state
            .revisions
            .get_mut(&id)
            .ok_or_else(|| CatalogError::not_found("revision", id))?;
        if !revision.rendered {
            revision.rendered = true;
            revision.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn unrendered(&self, limit: i64) -> CatalogResult<Vec<Revision>> {
        Ok(self
            .read()?
            .revisions
            .values()
            .filter(|r| !r.rendered && !r.is_deleted())
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl RatingStore for MemoryStore {
    async fn rating(&self, user_id: UserId, revision_id: RevisionId) -> CatalogResult<Option<Rating>> {
        Ok(self
            .read()?
            .ratings
            .values()
            .find(|r| r.user_id == user_id && r.revision_id == revision_id)
            .cloned())
    }

    async fn insert_rating(
        &self,
        user_id: UserId,
        revision_id: RevisionId,
        thumbs_up: bool,
    ) -> CatalogResult<Rating> {
        let mut state = self.write()?;
        if let Some(existing) = state
            .ratings
            .values_mut()
            .find(|r| r.user_id == user_id && r.revision_id == revision_id)
        {
            // Lost a race with another insert for the same pair.
            existing.thumbs_up = thumbs_up;
            existing.deleted_at = None;
            existing.updated_at = Utc::now();
            return Ok(existing.clone());
        }
        let now = Utc::now();
        let rating = Rating {
            id: state.next_id(),
            user_id,
            revision_id,
            thumbs_up,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        state.ratings.insert(rating.id, rating.clone());
        Ok(rating)
    }

    async fn reactivate_rating(&self, id: i64, thumbs_up: bool) -> CatalogResult<Rating> {
        let mut state = self.write()?;
        let rating = state
            .ratings
            .get_mut(&id)
            .ok_or_else(|| CatalogError::not_found("rating", id))?;
        rating.thumbs_up = thumbs_up;
        rating.deleted_at = None;
        rating.updated_at = Utc::now();
        Ok(rating.clone())
    }

    async fn delete_rating(&self, id: i64) -> CatalogResult<()> {
        let mut state = self.write()?;
        let rating = state
            .ratings
            .get_mut(&id)
            .filter(|r| r.is_active())
            .ok_or_else(|| CatalogError::not_found("rating", id))?;
        rating.deleted_at = Some(Utc::now());
        Ok(())
    }

    async fn tally(&self, revision_id: RevisionId) -> CatalogResult<VoteTally> {
        Ok(self.read()?.tally(revision_id))
    }
}

#[async_trait]
impl TagStore for MemoryStore {
    async fn tag_by_name(&self, name: &str) -> CatalogResult<Option<Tag>> {
        let lowered = name.to_lowercase();
        Ok(self
            .read()?
            .tags
            .values()
            .find(|t| t.name.to_lowercase() == lowered)
            .cloned())
    }

    async fn insert_tag(&self, name: &str) -> CatalogResult<Tag> {
        Ok(self.write()?.tag_named(name))
    }

    async fn link_tag(&self, blueprint_id: BlueprintId, tag_id: TagId) -> CatalogResult<()> {
        self.write()?.links.insert((blueprint_id, tag_id));
        Ok(())
    }

    async fn unlink_tags(&self, blueprint_id: BlueprintId) -> CatalogResult<()> {
        self.write()?.set_tags(blueprint_id, &[]);
        Ok(())
    }

    async fn tags_of(&self, blueprint_id: BlueprintId) -> CatalogResult<Vec<Tag>> {
        let state = self.read()?;
        let mut tags: Vec<Tag> = state
            .links
            .iter()
            .filter(|(b, _)| *b == blueprint_id)
            .filter_map(|(_, t)| state.tags.get(t).cloned())
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    async fn tags_by_usage(&self, prefix: &str, limit: i64) -> CatalogResult<Vec<TagUsage>> {
        let state = self.read()?;
        let prefix = prefix.to_lowercase();
        let mut usages: Vec<TagUsage> = state
            .tags
            .values()
            .filter(|t| t.name.to_lowercase().starts_with(&prefix))
            .map(|t| TagUsage {
                id: t.id,
                name: t.name.clone(),
                usage: state
                    .links
                    .iter()
                    .filter(|(b, tag)| *tag == t.id && state.active_entry(*b).is_some())
                    .count() as i64,
            })
            .collect();
        usages.sort_by(|a, b| b.usage.cmp(&a.usage).then_with(|| a.name.cmp(&b.name)));
        usages.truncate(limit.max(0) as usize);
        Ok(usages)
    }
}

#[async_trait]
impl CommentStore for MemoryStore {
    async fn insert_comment(
        &self,
        revision_id: RevisionId,
        user_id: UserId,
        message: &str,
    ) -> CatalogResult<Comment> {
        let mut state = self.write()?;
        let now = Utc::now();
        let comment = Comment {
            id: state.next_id(),
            revision_id,
            user_id,
            message: message.to_string(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        state.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn comment(&self, id: CommentId) -> CatalogResult<Option<Comment>> {
        Ok(self
            .read()?
            .comments
            .get(&id)
            .filter(|c| c.deleted_at.is_none())
            .cloned())
    }

    async fn comments(&self, revision_id: RevisionId) -> CatalogResult<Vec<Comment>> {
        Ok(self
            .read()?
            .comments
            .values()
            .filter(|c| c.revision_id == revision_id && c.deleted_at.is_none())
            .cloned()
            .collect())
    }

    async fn update_comment(&self, id: CommentId, message: &str) -> CatalogResult<Comment> {
        let mut state = self.write()?;
        let comment = state
            .comments
            .get_mut(&id)
            .filter(|c| c.deleted_at.is_none())
            .ok_or_else(|| CatalogError::not_found("comment", id))?;
        comment.message = message.to_string();
        comment.updated_at = Utc::now();
        Ok(comment.clone())
    }

    async fn delete_comment(&self, id: CommentId) -> CatalogResult<()> {
        let mut state = self.write()?;
        let comment = state
            .comments
            .get_mut(&id)
            .filter(|c| c.deleted_at.is_none())
            .ok_or_else(|| CatalogError::not_found("comment", id))?;
        comment.deleted_at = Some(Utc::now());
        Ok(())
    }
}

#[async_trait]
impl RankingStore for MemoryStore {
    async fn ranked(&self, order: ListOrder, page: Page) -> CatalogResult<Vec<BlueprintEntry>> {
        let state = self.read()?;
        let entries: Vec<BlueprintEntry> = state
            .entries
            .values()
            .filter(|e| !e.is_deleted())
            .cloned()
            .collect();
        Ok(state.page(order, entries, page))
    }

    async fn search(&self, pattern: &SearchPattern, page: Page) -> CatalogResult<Vec<BlueprintEntry>> {
        let state = self.read()?;
        let entries: Vec<BlueprintEntry> = state
            .entries
            .values()
            .filter(|e| !e.is_deleted() && state.matches(e, pattern))
            .cloned()
            .collect();
        Ok(state.page(ListOrder::Top, entries, page))
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> CatalogResult<()> {
        self.read().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_entry(user_id: UserId, name: &str) -> NewEntry {
        NewEntry {
            user_id,
            name: name.to_string(),
            description: String::new(),
            tags: Vec::new(),
        }
    }

    fn new_revision(checksum: &str) -> NewRevision {
        NewRevision {
            changes: String::new(),
            checksum: checksum.to_string(),
            format_version: 0,
        }
    }

    #[tokio::test]
    async fn append_assigns_consecutive_numbers() {
        let store = MemoryStore::new();
        let (entry, first) = store
            .insert_entry(new_entry(1, "a"), new_revision("c1"))
            .await
            .unwrap();
        assert_eq!(first.revision, 1);
        assert_eq!(entry.last_revision, 1);

        let (entry, second) = store.append_revision(entry.id, new_revision("c2")).await.unwrap();
        assert_eq!(second.revision, 2);
        assert_eq!(entry.last_revision, 2);
    }

    #[tokio::test]
    async fn duplicate_checksum_is_rejected_across_entries() {
        let store = MemoryStore::new();
        let (a, _) = store
            .insert_entry(new_entry(1, "a"), new_revision("same"))
            .await
            .unwrap();
        assert!(matches!(
            store.insert_entry(new_entry(2, "b"), new_revision("same")).await,
            Err(CatalogError::DuplicateContent(_))
        ));
        assert!(matches!(
            store.append_revision(a.id, new_revision("same")).await,
            Err(CatalogError::DuplicateContent(_))
        ));
        // a failed append leaves the counter alone
        assert_eq!(store.entry(a.id).await.unwrap().unwrap().last_revision, 1);
    }

    #[tokio::test]
    async fn deleted_checksum_can_be_reused() {
        let store = MemoryStore::new();
        let (a, _) = store
            .insert_entry(new_entry(1, "a"), new_revision("c"))
            .await
            .unwrap();
        store.delete_entry(a.id).await.unwrap();
        assert!(store
            .insert_entry(new_entry(1, "again"), new_revision("c"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn deleting_last_revision_deletes_entry() {
        let store = MemoryStore::new();
        let (entry, first) = store
            .insert_entry(new_entry(1, "a"), new_revision("c1"))
            .await
            .unwrap();
        let (_, second) = store.append_revision(entry.id, new_revision("c2")).await.unwrap();

        let outcome = store.delete_revision(second.id).await.unwrap();
        assert!(!outcome.entry_deleted);
        assert!(store.entry(entry.id).await.unwrap().is_some());

        let outcome = store.delete_revision(first.id).await.unwrap();
        assert!(outcome.entry_deleted);
        assert!(store.entry(entry.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn tags_by_usage_counts_active_entries_only() {
        let store = MemoryStore::new();
        let (a, _) = store.insert_entry(new_entry(1, "a"), new_revision("c1")).await.unwrap();
        let (b, _) = store.insert_entry(new_entry(1, "b"), new_revision("c2")).await.unwrap();
        let belt = store.insert_tag("belt").await.unwrap();
        let rail = store.insert_tag("rail").await.unwrap();
        store.link_tag(a.id, belt.id).await.unwrap();
        store.link_tag(b.id, belt.id).await.unwrap();
        store.link_tag(b.id, rail.id).await.unwrap();
        store.link_tag(b.id, rail.id).await.unwrap();

        let usage = store.tags_by_usage("", 10).await.unwrap();
        assert_eq!(usage[0].name, "belt");
        assert_eq!(usage[0].usage, 2);
        assert_eq!(usage[1].usage, 1);

        store.delete_entry(b.id).await.unwrap();
        let usage = store.tags_by_usage("", 10).await.unwrap();
        assert_eq!((usage[0].name.as_str(), usage[0].usage), ("belt", 1));
        assert_eq!((usage[1].name.as_str(), usage[1].usage), ("rail", 0));
    }

    #[tokio::test]
    async fn insert_tag_is_case_insensitive() {
        let store = MemoryStore::new();
        let first = store.insert_tag("Belt").await.unwrap();
        let second = store.insert_tag("BELT").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.tag_by_name("belt").await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn entry_tags_are_written_with_the_entry() {
        let store = MemoryStore::new();
        let mut new = new_entry(1, "a");
        new.tags = vec!["rail".to_string(), "Belt".to_string()];
        store.insert_tag("belt").await.unwrap();
        let (entry, _) = store.insert_entry(new, new_revision("c1")).await.unwrap();
        let names: Vec<String> = store.tags_of(entry.id).await.unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["belt", "rail"]);

        store
            .update_entry(entry.id, "b", "d", &["oil".to_string()])
            .await
            .unwrap();
        let names: Vec<String> = store.tags_of(entry.id).await.unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["oil"]);
    }

    #[tokio::test]
    async fn update_of_a_missing_entry_leaves_tags_alone() {
        let store = MemoryStore::new();
        let mut new = new_entry(1, "a");
        new.tags = vec!["rail".to_string()];
        let (entry, _) = store.insert_entry(new, new_revision("c1")).await.unwrap();
        store.delete_entry(entry.id).await.unwrap();

        assert!(matches!(
            store.update_entry(entry.id, "b", "", &["oil".to_string()]).await,
            Err(CatalogError::NotFound(_))
        ));
        assert!(store.tag_by_name("oil").await.unwrap().is_none());
        assert_eq!(store.tags_of(entry.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rejected_insert_creates_no_tags() {
        let store = MemoryStore::new();
        store.insert_entry(new_entry(1, "a"), new_revision("same")).await.unwrap();
        let mut new = new_entry(2, "b");
        new.tags = vec!["rail".to_string()];
        assert!(store.insert_entry(new, new_revision("same")).await.is_err());
        assert!(store.tag_by_name("rail").await.unwrap().is_none());
    }
}
