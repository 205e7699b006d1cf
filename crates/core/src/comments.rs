use std::sync::Arc;

use crate::blueprint::model::{Comment, CommentId, RevisionId, UserId};
use crate::blueprint::validate::validate_comment;
use crate::error::{CatalogError, CatalogResult};
use crate::store::CatalogStore;

/// Discussion threads hanging off revisions. Only the author may edit or
/// delete a comment.
#[derive(Clone)]
pub struct CommentBoard {
    store: Arc<dyn CatalogStore>,
}

impl CommentBoard {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Caller must have checked that the revision is active.
    pub async fn add(&self, author: UserId, revision_id: RevisionId, message: &str) -> CatalogResult<Comment> {
        let message = validate_comment(message)?;
        let comment = self.store.insert_comment(revision_id, author, &message).await?;
        tracing::info!(comment_id = comment.id, revision_id, user_id = author, "comment added");
        Ok(comment)
    }

    pub async fn get(&self, id: CommentId) -> CatalogResult<Comment> {
        self.store
            .comment(id)
            .await?
            .ok_or_else(|| CatalogError::not_found("comment", id))
    }

    pub async fn list(&self, revision_id: RevisionId) -> CatalogResult<Vec<Comment>> {
        self.store.comments(revision_id).await
    }

    async fn authored(&self, actor: UserId, id: CommentId) -> CatalogResult<Comment> {
        let comment = self.get(id).await?;
        if comment.user_id != actor {
            return Err(CatalogError::Forbidden(format!(
                "user {actor} did not write comment {id}"
            )));
        }
        Ok(comment)
    }

    pub async fn update(&self, actor: UserId, id: CommentId, message: &str) -> CatalogResult<Comment> {
        let message = validate_comment(message)?;
        self.authored(actor, id).await?;
        self.store.update_comment(id, &message).await
    }

    pub async fn delete(&self, actor: UserId, id: CommentId) -> CatalogResult<()> {
        self.authored(actor, id).await?;
        self.store.delete_comment(id).await?;
        tracing::info!(comment_id = id, user_id = actor, "comment deleted");
        Ok(())
    }
}
