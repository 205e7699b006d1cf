use std::sync::Arc;

use blueprint_catalog_query::{ListOrder, Page, SearchPattern};

use crate::blueprint::model::BlueprintEntry;
use crate::content::ContentStore;
use crate::error::{CatalogError, CatalogResult};
use crate::ledger::RevisionLedger;
use crate::rating::RatingAggregator;
use crate::store::CatalogStore;
use crate::tags::TagIndex;
use crate::views::BlueprintSummary;

/// Ordered, paginated views over active entries. The store evaluates the
/// ordering; this layer turns each row into a summary.
#[derive(Clone)]
pub struct RankingEngine {
    store: Arc<dyn CatalogStore>,
    ledger: RevisionLedger,
    ratings: RatingAggregator,
    tags: TagIndex,
    content: ContentStore,
}

impl RankingEngine {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        ledger: RevisionLedger,
        ratings: RatingAggregator,
        tags: TagIndex,
        content: ContentStore,
    ) -> Self {
        Self {
            store,
            ledger,
            ratings,
            tags,
            content,
        }
    }

    pub async fn list(&self, order: ListOrder, page: Page) -> CatalogResult<Vec<BlueprintSummary>> {
        let entries = self.store.ranked(order, page).await?;
        tracing::debug!(%order, offset = page.offset, count = page.count, rows = entries.len(), "ranked list");
        self.summaries(entries).await
    }

    /// Entries whose name, description, change notes or tags contain any of
    /// the query's terms, ordered like [`ListOrder::Top`].
    pub async fn search(&self, query: &str, page: Page) -> CatalogResult<Vec<BlueprintSummary>> {
        let pattern = SearchPattern::parse(query)?;
        let entries = self.store.search(&pattern, page).await?;
        tracing::debug!(pattern = %pattern.to_regex(), rows = entries.len(), "search");
        self.summaries(entries).await
    }

    pub async fn summarize(&self, entry: &BlueprintEntry) -> CatalogResult<BlueprintSummary> {
        let latest = self.ledger.latest_revision(entry).await?;
        let tally = self.ratings.tally(latest.id).await?;
        let tags = self.tags.tags_of(entry.id).await?;
        Ok(BlueprintSummary::new(entry, &latest, tally, tags, &self.content))
    }

    /// Summaries in input order. Entries deleted between the listing query
    /// and this call are skipped.
    pub async fn summaries(&self, entries: Vec<BlueprintEntry>) -> CatalogResult<Vec<BlueprintSummary>> {
        let mut out = Vec::with_capacity(entries.len());
        for entry in &entries {
            match self.summarize(entry).await {
                Ok(summary) => out.push(summary),
                Err(CatalogError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(out)
    }
}
