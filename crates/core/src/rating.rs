use std::sync::Arc;

use crate::blueprint::model::{Rating, RevisionId, UserId, Vote, VoteTally};
use crate::error::{CatalogError, CatalogResult};
use crate::store::CatalogStore;

/// Per-(user, revision) votes. Totals are counted from the vote rows on
/// every read.
#[derive(Clone)]
pub struct RatingAggregator {
    store: Arc<dyn CatalogStore>,
}

impl RatingAggregator {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Record a vote. An existing row for the pair, deleted or not, is
    /// reused so the pair never has two rows.
    pub async fn upsert_vote(
        &self,
        user_id: UserId,
        revision_id: RevisionId,
        thumbs_up: bool,
    ) -> CatalogResult<Rating> {
        let rating = match self.store.rating(user_id, revision_id).await? {
            Some(existing) => self.store.reactivate_rating(existing.id, thumbs_up).await?,
            None => self.store.insert_rating(user_id, revision_id, thumbs_up).await?,
        };
        tracing::info!(user_id, revision_id, thumbs_up, "vote recorded");
        Ok(rating)
    }

    pub async fn remove_vote(&self, user_id: UserId, revision_id: RevisionId) -> CatalogResult<()> {
        match self.store.rating(user_id, revision_id).await? {
            Some(rating) if rating.is_active() => {
                self.store.delete_rating(rating.id).await?;
                tracing::info!(user_id, revision_id, "vote removed");
                Ok(())
            }
            _ => Err(CatalogError::NotFound("rating not found".to_string())),
        }
    }

    pub async fn tally(&self, revision_id: RevisionId) -> CatalogResult<VoteTally> {
        self.store.tally(revision_id).await
    }

    pub async fn user_vote(&self, revision_id: RevisionId, user_id: UserId) -> CatalogResult<Vote> {
        Ok(self
            .store
            .rating(user_id, revision_id)
            .await?
            .filter(Rating::is_active)
            .map(|r| Vote::from_thumbs_up(r.thumbs_up))
            .unwrap_or_default())
    }

    /// Apply a vote as sent by a client: `None` withdraws the caller's vote.
    pub async fn rate(&self, user_id: UserId, revision_id: RevisionId, vote: Vote) -> CatalogResult<()> {
        match vote {
            Vote::None => self.remove_vote(user_id, revision_id).await,
            Vote::Up => self.upsert_vote(user_id, revision_id, true).await.map(|_| ()),
            Vote::Down => self.upsert_vote(user_id, revision_id, false).await.map(|_| ()),
        }
    }
}
