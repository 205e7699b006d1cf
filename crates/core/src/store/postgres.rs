use async_trait::async_trait;
use blueprint_catalog_query::hotness::sql_expression;
use blueprint_catalog_query::{ListOrder, Page, SearchPattern};
use sqlx::{query, query_as, PgPool, Postgres, Transaction};

use crate::blueprint::model::{
    BlueprintEntry, BlueprintId, Comment, CommentId, NewEntry, NewRevision, Rating, Revision,
    RevisionDeletion, RevisionId, Tag, TagId, TagUsage, UserId, VoteTally,
};
use crate::error::{CatalogError, CatalogResult};
use crate::store::{CatalogStore, CommentStore, LedgerStore, RankingStore, RatingStore, TagStore};

/// Latest active revision per entry and its signed vote total. Shared by the
/// ranked list and search queries, which join it as `s`.
const SCORES_CTE: &str = "
    WITH latest AS (
        SELECT DISTINCT ON (blueprint_id)
            blueprint_id, id AS revision_id
        FROM
            revisions
        WHERE
            deleted_at IS NULL
        ORDER BY
            blueprint_id, revision DESC
    ),
    scores AS (
        SELECT
            l.blueprint_id,
            COALESCE(SUM(CASE WHEN r.thumbs_up THEN 1 ELSE -1 END), 0)::BIGINT AS score
        FROM
            latest l
            LEFT JOIN ratings r ON r.revision_id = l.revision_id AND r.deleted_at IS NULL
        GROUP BY
            l.blueprint_id
    )
";

const SCORE: &str = "COALESCE(s.score, 0)";

/// Postgres-backed catalog store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn order_clause(order: ListOrder) -> String {
        match order {
            ListOrder::New => "b.created_at DESC, b.id DESC".to_string(),
            ListOrder::Top => format!("{SCORE} DESC, b.id DESC"),
            ListOrder::Popular => format!("{} DESC, b.id DESC", sql_expression(SCORE, "b.created_at")),
        }
    }
}

/// Insert one revision row inside an open transaction. A digest collision
/// reports the digest rather than the raw database message.
async fn insert_revision(
    tx: &mut Transaction<'_, Postgres>,
    blueprint_id: BlueprintId,
    number: i64,
    revision: &NewRevision,
) -> CatalogResult<Revision> {
    query_as::<_, Revision>(
        "
        INSERT INTO
            revisions (blueprint_id, revision, changes, checksum, format_version)
        VALUES
            ($1, $2, $3, $4, $5)
        RETURNING *
        ",
    )
    .bind(blueprint_id)
    .bind(number)
    .bind(&revision.changes)
    .bind(&revision.checksum)
    .bind(revision.format_version)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| match CatalogError::from(e) {
        CatalogError::DuplicateContent(_) => CatalogError::DuplicateContent(revision.checksum.clone()),
        other => other,
    })
}

/// Swap the tag set of an entry inside an open transaction. Tags are created
/// on first use; an existing spelling of the same name is reused.
async fn set_tags(
    tx: &mut Transaction<'_, Postgres>,
    blueprint_id: BlueprintId,
    names: &[String],
) -> CatalogResult<()> {
    query("DELETE FROM blueprint_tags WHERE blueprint_id = $1")
        .bind(blueprint_id)
        .execute(&mut **tx)
        .await?;

    for name in names {
        // The no-op update makes RETURNING yield the existing row on conflict.
        query(
            "
            WITH tag AS (
                INSERT INTO
                    tags (name)
                VALUES
                    ($2)
                ON CONFLICT ((lower(name))) DO UPDATE SET name = tags.name
                RETURNING id
            )
            INSERT INTO
                blueprint_tags (blueprint_id, tag_id)
            SELECT
                $1, id
            FROM
                tag
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(blueprint_id)
        .bind(name)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

#[async_trait]
impl LedgerStore for PgStore {
    async fn insert_entry(
        &self,
        entry: NewEntry,
        first: NewRevision,
    ) -> CatalogResult<(BlueprintEntry, Revision)> {
        let NewEntry {
            user_id,
            name,
            description,
            tags,
        } = entry;
        let mut tx = self.pool.begin().await?;

        let entry = query_as::<_, BlueprintEntry>(
            "
            INSERT INTO
                blueprints (user_id, name, description, last_revision)
            VALUES
                ($1, $2, $3, 1)
            RETURNING *
            ",
        )
        .bind(user_id)
        .bind(&name)
        .bind(&description)
        .fetch_one(&mut *tx)
        .await?;

        let revision = insert_revision(&mut tx, entry.id, 1, &first).await?;
        set_tags(&mut tx, entry.id, &tags).await?;
        tx.commit().await?;
        Ok((entry, revision))
    }

    async fn append_revision(
        &self,
        blueprint_id: BlueprintId,
        revision: NewRevision,
    ) -> CatalogResult<(BlueprintEntry, Revision)> {
        let mut tx = self.pool.begin().await?;

        // The row lock taken here serializes concurrent appends to one entry.
        let entry = query_as::<_, BlueprintEntry>(
            "
            UPDATE
                blueprints
            SET
                last_revision = last_revision + 1,
                updated_at = now()
            WHERE
                id = $1
                AND deleted_at IS NULL
            RETURNING *
            ",
        )
        .bind(blueprint_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| CatalogError::not_found("blueprint", blueprint_id))?;

        let revision = insert_revision(&mut tx, blueprint_id, entry.last_revision, &revision).await?;
        tx.commit().await?;
        Ok((entry, revision))
    }

    async fn entry(&self, id: BlueprintId) -> CatalogResult<Option<BlueprintEntry>> {
        let entry = query_as::<_, BlueprintEntry>(
            "SELECT * FROM blueprints WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(entry)
    }

    async fn update_entry(
        &self,
        id: BlueprintId,
        name: &str,
        description: &str,
        tags: &[String],
    ) -> CatalogResult<BlueprintEntry> {
        let mut tx = self.pool.begin().await?;

        let entry = query_as::<_, BlueprintEntry>(
            "
            UPDATE
                blueprints
            SET
                name = $2,
                description = $3,
                updated_at = now()
            WHERE
                id = $1
                AND deleted_at IS NULL
            RETURNING *
            ",
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| CatalogError::not_found("blueprint", id))?;

        set_tags(&mut tx, id, tags).await?;
        tx.commit().await?;
        Ok(entry)
    }

    async fn delete_entry(&self, id: BlueprintId) -> CatalogResult<()> {
        let mut tx = self.pool.begin().await?;

        let deleted = query(
            "
            UPDATE
                blueprints
            SET
                deleted_at = now(),
                updated_at = now()
            WHERE
                id = $1
                AND deleted_at IS NULL
            ",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if deleted == 0 {
            return Err(CatalogError::not_found("blueprint", id));
        }

        query(
            "
            UPDATE
                revisions
            SET
                deleted_at = now(),
                updated_at = now()
            WHERE
                blueprint_id = $1
                AND deleted_at IS NULL
            ",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn entries_of(&self, user_id: UserId) -> CatalogResult<Vec<BlueprintEntry>> {
        let entries = query_as::<_, BlueprintEntry>(
            "
            SELECT
                *
            FROM
                blueprints
            WHERE
                user_id = $1
                AND deleted_at IS NULL
            ORDER BY
                created_at DESC, id DESC
            ",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    async fn revision_by_checksum(&self, checksum: &str) -> CatalogResult<Option<Revision>> {
        let revision = query_as::<_, Revision>(
            "SELECT * FROM revisions WHERE checksum = $1 AND deleted_at IS NULL",
        )
        .bind(checksum)
        .fetch_optional(&self.pool)
        .await?;
        Ok(revision)
    }

    async fn revision(&self, id: RevisionId) -> CatalogResult<Option<Revision>> {
        let revision = query_as::<_, Revision>(
            "SELECT * FROM revisions WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(revision)
    }

    async fn revision_by_number(
        &self,
        blueprint_id: BlueprintId,
        number: i64,
    ) -> CatalogResult<Option<Revision>> {
        let revision = query_as::<_, Revision>(
            "
            SELECT
                *
            FROM
                revisions
            WHERE
                blueprint_id = $1
                AND revision = $2
                AND deleted_at IS NULL
            ",
        )
        .bind(blueprint_id)
        .bind(number)
        .fetch_optional(&self.pool)
        .await?;
        Ok(revision)
    }

    async fn highest_revision(&self, blueprint_id: BlueprintId) -> CatalogResult<Option<Revision>> {
        let revision = query_as::<_, Revision>(
            "
            SELECT
                *
            FROM
                revisions
            WHERE
                blueprint_id = $1
                AND deleted_at IS NULL
            ORDER BY
                revision DESC
            LIMIT 1
            ",
        )
        .bind(blueprint_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(revision)
    }

    async fn revisions(&self, blueprint_id: BlueprintId) -> CatalogResult<Vec<Revision>> {
        let revisions = query_as::<_, Revision>(
            "
            SELECT
                *
            FROM
                revisions
            WHERE
                blueprint_id = $1
                AND deleted_at IS NULL
            ORDER BY
                revision ASC
            ",
        )
        .bind(blueprint_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(revisions)
    }

    async fn update_changes(&self, id: RevisionId, changes: &str) -> CatalogResult<Revision> {
        query_as::<_, Revision>(
            "
            UPDATE
                revisions
            SET
                changes = $2,
                updated_at = now()
            WHERE
                id = $1
                AND deleted_at IS NULL
            RETURNING *
            ",
        )
        .bind(id)
        .bind(changes)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| CatalogError::not_found("revision", id))
    }

    async fn delete_revision(&self, id: RevisionId) -> CatalogResult<RevisionDeletion> {
        let mut tx = self.pool.begin().await?;

        // Lock the owning entry first so two deletions racing for the last
        // revisions of one entry observe each other.
        let blueprint_id: BlueprintId = query_as::<_, (BlueprintId,)>(
            "
            SELECT
                b.id
            FROM
                blueprints b
                JOIN revisions r ON r.blueprint_id = b.id
            WHERE
                r.id = $1
                AND r.deleted_at IS NULL
            FOR UPDATE OF b
            ",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .map(|(b,)| b)
        .ok_or_else(|| CatalogError::not_found("revision", id))?;

        let deleted = query(
            "
            UPDATE
                revisions
            SET
                deleted_at = now(),
                updated_at = now()
            WHERE
                id = $1
                AND deleted_at IS NULL
            ",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if deleted == 0 {
            return Err(CatalogError::not_found("revision", id));
        }

        let (remaining,): (bool,) = query_as(
            "
            SELECT EXISTS (
                SELECT 1 FROM revisions WHERE blueprint_id = $1 AND deleted_at IS NULL
            )
            ",
        )
        .bind(blueprint_id)
        .fetch_one(&mut *tx)
        .await?;

        let entry_deleted = !remaining;
        if entry_deleted {
            query(
                "
                UPDATE
                    blueprints
                SET
                    deleted_at = now(),
                    updated_at = now()
                WHERE
                    id = $1
                    AND deleted_at IS NULL
                ",
            )
            .bind(blueprint_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(RevisionDeletion {
            revision_id: id,
            blueprint_id,
            entry_deleted,
        })
    }

    async fn mark_rendered(&self, id: RevisionId) -> CatalogResult<()> {
        query(
            "
            UPDATE
                revisions
            SET
                rendered = TRUE,
                updated_at = now()
            WHERE
                id = $1
                AND rendered = FALSE
            ",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn unrendered(&self, limit: i64) -> CatalogResult<Vec<Revision>> {
        let revisions = query_as::<_, Revision>(
            "
            SELECT
                *
            FROM
                revisions
            WHERE
                rendered = FALSE
                AND deleted_at IS NULL
            ORDER BY
                id ASC
            LIMIT $1
            ",
        )
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await?;
        Ok(revisions)
    }
}

#[async_trait]
impl RatingStore for PgStore {
    async fn rating(&self, user_id: UserId, revision_id: RevisionId) -> CatalogResult<Option<Rating>> {
        let rating = query_as::<_, Rating>(
            "SELECT * FROM ratings WHERE user_id = $1 AND revision_id = $2",
        )
        .bind(user_id)
        .bind(revision_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(rating)
    }

    async fn insert_rating(
        &self,
        user_id: UserId,
        revision_id: RevisionId,
        thumbs_up: bool,
    ) -> CatalogResult<Rating> {
        // A concurrent insert for the same pair turns into an update.
        let rating = query_as::<_, Rating>(
            "
            INSERT INTO
                ratings (user_id, revision_id, thumbs_up)
            VALUES
                ($1, $2, $3)
            ON CONFLICT ON CONSTRAINT ratings_user_revision_key DO UPDATE SET
                thumbs_up = EXCLUDED.thumbs_up,
                deleted_at = NULL,
                updated_at = now()
            RETURNING *
            ",
        )
        .bind(user_id)
        .bind(revision_id)
        .bind(thumbs_up)
        .fetch_one(&self.pool)
        .await?;
        Ok(rating)
    }

    async fn reactivate_rating(&self, id: i64, thumbs_up: bool) -> CatalogResult<Rating> {
        query_as::<_, Rating>(
            "
            UPDATE
                ratings
            SET
                thumbs_up = $2,
                deleted_at = NULL,
                updated_at = now()
            WHERE
                id = $1
            RETURNING *
            ",
        )
        .bind(id)
        .bind(thumbs_up)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| CatalogError::not_found("rating", id))
    }

    async fn delete_rating(&self, id: i64) -> CatalogResult<()> {
        let deleted = query(
            "
            UPDATE
                ratings
            SET
                deleted_at = now(),
                updated_at = now()
            WHERE
                id = $1
                AND deleted_at IS NULL
            ",
        )
        .bind(id)
        .execute(&self.pool)
        .await?
        .rows_affected();
        if deleted == 0 {
            return Err(CatalogError::not_found("rating", id));
        }
        Ok(())
    }

    async fn tally(&self, revision_id: RevisionId) -> CatalogResult<VoteTally> {
        let (thumbs_up, thumbs_down): (i64, i64) = query_as(
            "
            SELECT
                COUNT(*) FILTER (WHERE thumbs_up),
                COUNT(*) FILTER (WHERE NOT thumbs_up)
            FROM
                ratings
            WHERE
                revision_id = $1
                AND deleted_at IS NULL
            ",
        )
        .bind(revision_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(VoteTally {
            thumbs_up,
            thumbs_down,
        })
    }
}

#[async_trait]
impl TagStore for PgStore {
    async fn tag_by_name(&self, name: &str) -> CatalogResult<Option<Tag>> {
        let tag = query_as::<_, Tag>("SELECT id, name FROM tags WHERE lower(name) = lower($1)")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tag)
    }

    async fn insert_tag(&self, name: &str) -> CatalogResult<Tag> {
        let inserted = query_as::<_, Tag>(
            "
            INSERT INTO
                tags (name)
            VALUES
                ($1)
            ON CONFLICT ((lower(name))) DO NOTHING
            RETURNING id, name
            ",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(tag) => Ok(tag),
            None => self
                .tag_by_name(name)
                .await?
                .ok_or_else(|| CatalogError::Conflict(format!("tag {name:?} vanished during insert"))),
        }
    }

    async fn link_tag(&self, blueprint_id: BlueprintId, tag_id: TagId) -> CatalogResult<()> {
        query(
            "
            INSERT INTO
                blueprint_tags (blueprint_id, tag_id)
            VALUES
                ($1, $2)
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(blueprint_id)
        .bind(tag_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn unlink_tags(&self, blueprint_id: BlueprintId) -> CatalogResult<()> {
        query("DELETE FROM blueprint_tags WHERE blueprint_id = $1")
            .bind(blueprint_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn tags_of(&self, blueprint_id: BlueprintId) -> CatalogResult<Vec<Tag>> {
        let tags = query_as::<_, Tag>(
            "
            SELECT
                t.id, t.name
            FROM
                tags t
                JOIN blueprint_tags bt ON bt.tag_id = t.id
            WHERE
                bt.blueprint_id = $1
            ORDER BY
                t.name ASC
            ",
        )
        .bind(blueprint_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tags)
    }

    async fn tags_by_usage(&self, prefix: &str, limit: i64) -> CatalogResult<Vec<TagUsage>> {
        let usages = query_as::<_, TagUsage>(
            "
            SELECT
                t.id,
                t.name,
                COUNT(b.id) AS usage
            FROM
                tags t
                LEFT JOIN blueprint_tags bt ON bt.tag_id = t.id
                LEFT JOIN blueprints b ON b.id = bt.blueprint_id AND b.deleted_at IS NULL
            WHERE
                starts_with(lower(t.name), lower($1))
            GROUP BY
                t.id, t.name
            ORDER BY
                usage DESC, t.name ASC
            LIMIT $2
            ",
        )
        .bind(prefix)
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await?;
        Ok(usages)
    }
}

#[async_trait]
impl CommentStore for PgStore {
    async fn insert_comment(
        &self,
        revision_id: RevisionId,
        user_id: UserId,
        message: &str,
    ) -> CatalogResult<Comment> {
        let comment = query_as::<_, Comment>(
            "
            INSERT INTO
                comments (revision_id, user_id, message)
            VALUES
                ($1, $2, $3)
            RETURNING *
            ",
        )
        .bind(revision_id)
        .bind(user_id)
        .bind(message)
        .fetch_one(&self.pool)
        .await?;
        Ok(comment)
    }

    async fn comment(&self, id: CommentId) -> CatalogResult<Option<Comment>> {
        let comment = query_as::<_, Comment>(
            "SELECT * FROM comments WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(comment)
    }

    async fn comments(&self, revision_id: RevisionId) -> CatalogResult<Vec<Comment>> {
        let comments = query_as::<_, Comment>(
            "
            SELECT
                *
            FROM
                comments
            WHERE
                revision_id = $1
                AND deleted_at IS NULL
            ORDER BY
                created_at ASC, id ASC
            ",
        )
        .bind(revision_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(comments)
    }

    async fn update_comment(&self, id: CommentId, message: &str) -> CatalogResult<Comment> {
        query_as::<_, Comment>(
            "
            UPDATE
                comments
            SET
                message = $2,
                updated_at = now()
            WHERE
                id = $1
                AND deleted_at IS NULL
            RETURNING *
            ",
        )
        .bind(id)
        .bind(message)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| CatalogError::not_found("comment", id))
    }

    async fn delete_comment(&self, id: CommentId) -> CatalogResult<()> {
        let deleted = query(
            "
            UPDATE
                comments
            SET
                deleted_at = now(),
                updated_at = now()
            WHERE
                id = $1
                AND deleted_at IS NULL
            ",
        )
        .bind(id)
        .execute(&self.pool)
        .await?
        .rows_affected();
        if deleted == 0 {
            return Err(CatalogError::not_found("comment", id));
        }
        Ok(())
    }
}

#[async_trait]
impl RankingStore for PgStore {
    async fn ranked(&self, order: ListOrder, page: Page) -> CatalogResult<Vec<BlueprintEntry>> {
        let sql = format!(
            "
            {SCORES_CTE}
            SELECT
                b.*
            FROM
                blueprints b
                LEFT JOIN scores s ON s.blueprint_id = b.id
            WHERE
                b.deleted_at IS NULL
            ORDER BY
                {}
            OFFSET $1
            LIMIT $2
            ",
            Self::order_clause(order)
        );
        let entries = query_as::<_, BlueprintEntry>(&sql)
            .bind(page.offset)
            .bind(page.count)
            .fetch_all(&self.pool)
            .await?;
        Ok(entries)
    }

    async fn search(&self, pattern: &SearchPattern, page: Page) -> CatalogResult<Vec<BlueprintEntry>> {
        let sql = format!(
            "
            {SCORES_CTE}
            SELECT
                b.*
            FROM
                blueprints b
                LEFT JOIN scores s ON s.blueprint_id = b.id
            WHERE
                b.deleted_at IS NULL
                AND (
                    lower(b.name) ~ $1
                    OR lower(b.description) ~ $1
                    OR EXISTS (
                        SELECT 1 FROM revisions r
                        WHERE r.blueprint_id = b.id
                            AND r.deleted_at IS NULL
                            AND lower(r.changes) ~ $1
                    )
                    OR EXISTS (
                        SELECT 1 FROM blueprint_tags bt
                            JOIN tags t ON t.id = bt.tag_id
                        WHERE bt.blueprint_id = b.id
                            AND lower(t.name) ~ $1
                    )
                )
            ORDER BY
                {}
            OFFSET $2
            LIMIT $3
            ",
            Self::order_clause(ListOrder::Top)
        );
        let entries = query_as::<_, BlueprintEntry>(&sql)
            .bind(pattern.to_regex())
            .bind(page.offset)
            .bind(page.count)
            .fetch_all(&self.pool)
            .await?;
        Ok(entries)
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> CatalogResult<()> {
        query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;
    use sqlx::Executor;

    #[test]
    fn order_clauses_break_ties_by_id() {
        for order in [ListOrder::New, ListOrder::Top, ListOrder::Popular] {
            assert!(PgStore::order_clause(order).ends_with("b.id DESC"));
        }
    }

    #[test]
    fn popular_order_uses_hotness() {
        let clause = PgStore::order_clause(ListOrder::Popular);
        assert!(clause.contains("1134028003"));
        assert!(clause.contains("COALESCE(s.score, 0)"));
    }

    /// A store over a fresh, migrated schema of the database named by
    /// `DATABASE_URL`. `None` when the variable is unset.
    async fn store() -> Option<PgStore> {
        let url = std::env::var("DATABASE_URL").ok()?;
        let schema = format!("catalog_test_{}", uuid::Uuid::now_v7().simple());

        let admin = PgPool::connect(&url).await.unwrap();
        admin
            .execute(format!("CREATE SCHEMA {schema}").as_str())
            .await
            .unwrap();
        admin.close().await;

        let search_path = format!("SET search_path TO {schema}");
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .after_connect(move |conn, _| {
                let sql = search_path.clone();
                Box::pin(async move {
                    conn.execute(sql.as_str()).await?;
                    Ok(())
                })
            })
            .connect(&url)
            .await
            .unwrap();
        sqlx::migrate!("../../migrations").run(&pool).await.unwrap();
        Some(PgStore::new(pool))
    }

    fn new_entry(name: &str, tags: &[&str]) -> NewEntry {
        NewEntry {
            user_id: 1,
            name: name.to_string(),
            description: String::new(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn new_revision(checksum: &str, changes: &str) -> NewRevision {
        NewRevision {
            changes: changes.to_string(),
            checksum: checksum.to_string(),
            format_version: 0,
        }
    }

    fn ids(entries: &[BlueprintEntry]) -> Vec<BlueprintId> {
        entries.iter().map(|e| e.id).collect()
    }

    async fn tag_names(store: &PgStore, id: BlueprintId) -> Vec<String> {
        store.tags_of(id).await.unwrap().into_iter().map(|t| t.name).collect()
    }

    #[tokio::test]
    async fn revision_numbers_increase_and_survive_deletes() {
        let Some(store) = store().await else { return };
        let (entry, first) = store.insert_entry(new_entry("a", &[]), new_revision("c1", "")).await.unwrap();
        assert_eq!((entry.last_revision, first.revision), (1, 1));

        let (_, second) = store.append_revision(entry.id, new_revision("c2", "")).await.unwrap();
        assert_eq!(second.revision, 2);
        let outcome = store.delete_revision(second.id).await.unwrap();
        assert!(!outcome.entry_deleted);

        let (entry, third) = store.append_revision(entry.id, new_revision("c3", "")).await.unwrap();
        assert_eq!((entry.last_revision, third.revision), (3, 3));
        let numbers: Vec<i64> = store.revisions(entry.id).await.unwrap().iter().map(|r| r.revision).collect();
        assert_eq!(numbers, vec![1, 3]);
        assert_eq!(store.highest_revision(entry.id).await.unwrap().unwrap().id, third.id);

        store.delete_revision(third.id).await.unwrap();
        let outcome = store.delete_revision(first.id).await.unwrap();
        assert!(outcome.entry_deleted);
        assert!(store.entry(entry.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_checksum_is_rejected_until_deleted() {
        let Some(store) = store().await else { return };
        let (a, _) = store.insert_entry(new_entry("a", &["rail"]), new_revision("same", "")).await.unwrap();

        assert!(matches!(
            store.insert_entry(new_entry("b", &["oil"]), new_revision("same", "")).await,
            Err(CatalogError::DuplicateContent(d)) if d == "same"
        ));
        assert!(matches!(
            store.append_revision(a.id, new_revision("same", "")).await,
            Err(CatalogError::DuplicateContent(_))
        ));
        // the failed append rolled back the counter, the failed insert its tags
        assert_eq!(store.entry(a.id).await.unwrap().unwrap().last_revision, 1);
        assert!(store.tag_by_name("oil").await.unwrap().is_none());

        store.delete_entry(a.id).await.unwrap();
        assert!(store.insert_entry(new_entry("c", &[]), new_revision("same", "")).await.is_ok());
    }

    #[tokio::test]
    async fn tags_are_reused_case_insensitively() {
        let Some(store) = store().await else { return };
        let (a, _) = store.insert_entry(new_entry("a", &["Belt", "rail"]), new_revision("c1", "")).await.unwrap();
        let (b, _) = store.insert_entry(new_entry("b", &["belt"]), new_revision("c2", "")).await.unwrap();
        assert_eq!(tag_names(&store, a.id).await, vec!["Belt", "rail"]);
        assert_eq!(tag_names(&store, b.id).await, vec!["Belt"]);
        assert_eq!(store.insert_tag("BELT").await.unwrap().name, "Belt");

        store.update_entry(b.id, "b", "", &["oil".to_string(), "RAIL".to_string()]).await.unwrap();
        assert_eq!(tag_names(&store, b.id).await, vec!["oil", "rail"]);

        let usage = store.tags_by_usage("", 10).await.unwrap();
        let counts: Vec<(&str, i64)> = usage.iter().map(|t| (t.name.as_str(), t.usage)).collect();
        assert_eq!(counts, vec![("rail", 2), ("Belt", 1), ("oil", 1)]);

        store.delete_entry(a.id).await.unwrap();
        let usage = store.tags_by_usage("b", 10).await.unwrap();
        assert_eq!((usage[0].name.as_str(), usage[0].usage), ("Belt", 0));
    }

    #[tokio::test]
    async fn update_of_a_deleted_entry_changes_nothing() {
        let Some(store) = store().await else { return };
        let (a, _) = store.insert_entry(new_entry("a", &["rail"]), new_revision("c1", "")).await.unwrap();
        store.delete_entry(a.id).await.unwrap();
        assert!(matches!(
            store.update_entry(a.id, "b", "", &["oil".to_string()]).await,
            Err(CatalogError::NotFound(_))
        ));
        assert!(store.tag_by_name("oil").await.unwrap().is_none());
        assert_eq!(tag_names(&store, a.id).await, vec!["rail"]);
    }

    #[tokio::test]
    async fn rating_rows_are_upserted_per_pair() {
        let Some(store) = store().await else { return };
        let (_, revision) = store.insert_entry(new_entry("a", &[]), new_revision("c1", "")).await.unwrap();

        let up = store.insert_rating(7, revision.id, true).await.unwrap();
        store.delete_rating(up.id).await.unwrap();
        assert_eq!(store.tally(revision.id).await.unwrap(), VoteTally::default());

        // a second insert for the pair revives the same row
        let down = store.insert_rating(7, revision.id, false).await.unwrap();
        assert_eq!(down.id, up.id);
        assert!(down.deleted_at.is_none());
        let again = store.reactivate_rating(down.id, true).await.unwrap();
        assert!(again.thumbs_up);

        store.insert_rating(8, revision.id, false).await.unwrap();
        let tally = store.tally(revision.id).await.unwrap();
        assert_eq!((tally.thumbs_up, tally.thumbs_down), (1, 1));
    }

    #[tokio::test]
    async fn ranked_orders_match_their_definitions() {
        let Some(store) = store().await else { return };
        let (old, old_rev) = store.insert_entry(new_entry("old", &[]), new_revision("c1", "")).await.unwrap();
        let (mid, mid_rev) = store.insert_entry(new_entry("mid", &[]), new_revision("c2", "")).await.unwrap();
        let (new, _) = store.insert_entry(new_entry("new", &[]), new_revision("c3", "")).await.unwrap();

        for user in 0..5 {
            store.insert_rating(user, old_rev.id, true).await.unwrap();
        }
        store.insert_rating(0, mid_rev.id, true).await.unwrap();
        store.insert_rating(1, mid_rev.id, true).await.unwrap();

        // the old entry is days older, so its extra votes stop counting for hotness
        query("UPDATE blueprints SET created_at = now() - interval '3 days' WHERE id = $1")
            .bind(old.id)
            .execute(store.pool())
            .await
            .unwrap();

        let all = Page::new(None, None);
        assert_eq!(ids(&store.ranked(ListOrder::New, all).await.unwrap()), vec![new.id, mid.id, old.id]);
        assert_eq!(ids(&store.ranked(ListOrder::Top, all).await.unwrap()), vec![old.id, mid.id, new.id]);
        assert_eq!(ids(&store.ranked(ListOrder::Popular, all).await.unwrap()), vec![mid.id, new.id, old.id]);

        let second = Page::new(Some(1), Some(1));
        assert_eq!(ids(&store.ranked(ListOrder::Top, second).await.unwrap()), vec![mid.id]);
    }

    #[tokio::test]
    async fn top_breaks_score_ties_by_id() {
        let Some(store) = store().await else { return };
        let (a, _) = store.insert_entry(new_entry("a", &[]), new_revision("c1", "")).await.unwrap();
        let (b, _) = store.insert_entry(new_entry("b", &[]), new_revision("c2", "")).await.unwrap();
        let ranked = store.ranked(ListOrder::Top, Page::default()).await.unwrap();
        assert_eq!(ids(&ranked), vec![b.id, a.id]);
    }

    #[tokio::test]
    async fn search_covers_names_changes_and_tags() {
        let Some(store) = store().await else { return };
        let (weave, _) = store.insert_entry(new_entry("Belt Weave", &[]), new_revision("c1", "")).await.unwrap();
        let (notes, _) = store
            .insert_entry(new_entry("Smelter", &[]), new_revision("c2", "Added a WEAVE section"))
            .await
            .unwrap();
        let (tagged, _) = store.insert_entry(new_entry("Rails", &["weave"]), new_revision("c3", "")).await.unwrap();
        store.insert_entry(new_entry("a.b", &[]), new_revision("c4", "")).await.unwrap();
        store.insert_entry(new_entry("axb", &[]), new_revision("c5", "")).await.unwrap();

        let pattern = SearchPattern::parse("weave").unwrap();
        let mut found = ids(&store.search(&pattern, Page::default()).await.unwrap());
        found.sort();
        assert_eq!(found, vec![weave.id, notes.id, tagged.id]);

        // terms are literals, so the dot does not match any character
        let pattern = SearchPattern::parse("a.b").unwrap();
        let found: Vec<String> = store
            .search(&pattern, Page::default())
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(found, vec!["a.b"]);

        store.delete_entry(weave.id).await.unwrap();
        let pattern = SearchPattern::parse("belt").unwrap();
        assert!(store.search(&pattern, Page::default()).await.unwrap().is_empty());
    }
}
