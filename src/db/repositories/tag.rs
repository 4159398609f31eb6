//! Tag repository
//!
//! Database operations for tags and their article associations.
//!
//! This module provides:
//! - `TagRepository` trait defining the interface for tag data access
//! - `SqlxTagRepository` implementing the trait for PostgreSQL and SQLite
//!
//! Soft-deleted tags are excluded from every read except
//! `find_by_id_with_deleted`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::DynDatabasePool;
use crate::error::RepoError;
use crate::models::Tag;
use crate::with_pool;

/// Tag repository trait
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Get a live tag by ID
    async fn find_by_id(&self, id: Uuid) -> Result<Tag, RepoError>;

    /// Get a tag by ID even if it has been soft-deleted
    async fn find_by_id_with_deleted(&self, id: Uuid) -> Result<Tag, RepoError>;

    /// Get a live tag by its unique name
    async fn find_by_name(&self, name: &str) -> Result<Tag, RepoError>;

    /// List all live tags ordered by name
    async fn list(&self) -> Result<Vec<Tag>, RepoError>;

    /// List the live tags attached to an article
    async fn find_by_article(&self, article_id: Uuid) -> Result<Vec<Tag>, RepoError>;

    /// Create a new tag
    async fn create(&self, tag: &Tag) -> Result<Tag, RepoError>;

    /// Return the tag with this name, creating it when needed.
    ///
    /// A soft-deleted tag of that name is restored, and its `updated_at` is
    /// bumped. Soft delete keeps the `article_tags` rows, so every article
    /// that carried the tag before carries it again.
    async fn find_or_create(&self, name: &str) -> Result<Tag, RepoError>;

    /// Mark a tag as deleted
    async fn soft_delete(&self, id: Uuid) -> Result<(), RepoError>;

    /// Clear the deletion marker of a soft-deleted tag
    async fn restore(&self, id: Uuid) -> Result<(), RepoError>;

    /// Remove a tag row and its article associations
    async fn purge(&self, id: Uuid) -> Result<(), RepoError>;
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct TagRow {
    id: Uuid,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<TagRow> for Tag {
    fn from(row: TagRow) -> Self {
        Tag {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        }
    }
}

/// Load the live tags of one article, ordered by name.
///
/// Shared with the article repository, which populates `Article::tags`.
pub(crate) async fn load_article_tags(
    pool: &DynDatabasePool,
    article_id: Uuid,
) -> Result<Vec<Tag>, RepoError> {
    let sql = r#"
        SELECT t.id, t.name, t.created_at, t.updated_at, t.deleted_at
        FROM tags t
        INNER JOIN article_tags atg ON atg.tag_id = t.id
        WHERE atg.article_id = $1 AND t.deleted_at IS NULL
        ORDER BY t.name
    "#;

    let rows: Vec<TagRow> = with_pool!(pool, p => {
        sqlx::query_as(sql).bind(article_id).fetch_all(p).await
    })?;

    Ok(rows.into_iter().map(Tag::from).collect())
}

/// SQLx-based tag repository implementation
pub struct SqlxTagRepository {
    pool: DynDatabasePool,
}

impl SqlxTagRepository {
    /// Create a new SQLx tag repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TagRepository> {
        Arc::new(Self::new(pool))
    }

    async fn fetch_one_where(&self, filter: &str, key: &str) -> Result<Option<Tag>, RepoError> {
        let sql = format!(
            "SELECT id, name, created_at, updated_at, deleted_at FROM tags WHERE {}",
            filter
        );
        let row: Option<TagRow> = with_pool!(self.pool, p => {
            sqlx::query_as(&sql).bind(key).fetch_optional(p).await
        })?;
        Ok(row.map(Tag::from))
    }

    async fn fetch_by_id(&self, id: Uuid, include_deleted: bool) -> Result<Tag, RepoError> {
        let sql = if include_deleted {
            "SELECT id, name, created_at, updated_at, deleted_at FROM tags WHERE id = $1"
        } else {
            "SELECT id, name, created_at, updated_at, deleted_at FROM tags WHERE id = $1 AND deleted_at IS NULL"
        };
        let row: Option<TagRow> = with_pool!(self.pool, p => {
            sqlx::query_as(sql).bind(id).fetch_optional(p).await
        })?;

        row.map(Tag::from).ok_or_else(|| RepoError::not_found("tag", id))
    }

    async fn execute_for(&self, sql: &str, id: Uuid, now: Option<DateTime<Utc>>) -> Result<u64, RepoError> {
        let affected = with_pool!(self.pool, p => {
            let query = sqlx::query(sql);
            let query = match now {
                Some(now) => query.bind(now).bind(id),
                None => query.bind(id),
            };
            query.execute(p).await.map(|r| r.rows_affected())
        })?;
        Ok(affected)
    }
}

#[async_trait]
impl TagRepository for SqlxTagRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Tag, RepoError> {
        self.fetch_by_id(id, false).await
    }

    async fn find_by_id_with_deleted(&self, id: Uuid) -> Result<Tag, RepoError> {
        self.fetch_by_id(id, true).await
    }

    async fn find_by_name(&self, name: &str) -> Result<Tag, RepoError> {
        self.fetch_one_where("name = $1 AND deleted_at IS NULL", name)
            .await?
            .ok_or_else(|| RepoError::not_found("tag", name))
    }

    async fn list(&self) -> Result<Vec<Tag>, RepoError> {
        let sql = "SELECT id, name, created_at, updated_at, deleted_at FROM tags WHERE deleted_at IS NULL ORDER BY name";
        let rows: Vec<TagRow> = with_pool!(self.pool, p => {
            sqlx::query_as(sql).fetch_all(p).await
        })?;
        Ok(rows.into_iter().map(Tag::from).collect())
    }

    async fn find_by_article(&self, article_id: Uuid) -> Result<Vec<Tag>, RepoError> {
        load_article_tags(&self.pool, article_id).await
    }

    async fn create(&self, tag: &Tag) -> Result<Tag, RepoError> {
        let now = Utc::now();
        let sql = "INSERT INTO tags (id, name, created_at, updated_at) VALUES ($1, $2, $3, $4)";

        with_pool!(self.pool, p => {
            sqlx::query(sql)
                .bind(tag.id)
                .bind(&tag.name)
                .bind(now)
                .bind(now)
                .execute(p)
                .await
                .map(|_| ())
        })?;

        Ok(Tag {
            created_at: now,
            updated_at: now,
            deleted_at: None,
            ..tag.clone()
        })
    }

    async fn find_or_create(&self, name: &str) -> Result<Tag, RepoError> {
        let now = Utc::now();
        let sql = r#"
            INSERT INTO tags (id, name, created_at, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (name) DO UPDATE SET
                updated_at = CASE WHEN tags.deleted_at IS NULL THEN tags.updated_at ELSE excluded.updated_at END,
                deleted_at = NULL
        "#;

        with_pool!(self.pool, p => {
            sqlx::query(sql)
                .bind(Uuid::new_v4())
                .bind(name)
                .bind(now)
                .bind(now)
                .execute(p)
                .await
                .map(|_| ())
        })?;

        self.find_by_name(name).await
    }

    async fn soft_delete(&self, id: Uuid) -> Result<(), RepoError> {
        let affected = self
            .execute_for(
                "UPDATE tags SET deleted_at = $1 WHERE id = $2 AND deleted_at IS NULL",
                id,
                Some(Utc::now()),
            )
            .await?;
        if affected == 0 {
            return Err(RepoError::not_found("tag", id));
        }
        Ok(())
    }

    async fn restore(&self, id: Uuid) -> Result<(), RepoError> {
        let affected = self
            .execute_for(
                "UPDATE tags SET deleted_at = NULL, updated_at = $1 WHERE id = $2 AND deleted_at IS NOT NULL",
                id,
                Some(Utc::now()),
            )
            .await?;
        if affected == 0 {
            return Err(RepoError::not_found("tag", id));
        }
        Ok(())
    }

    async fn purge(&self, id: Uuid) -> Result<(), RepoError> {
        let affected = self
            .execute_for("DELETE FROM tags WHERE id = $1", id, None)
            .await?;
        if affected == 0 {
            return Err(RepoError::not_found("tag", id));
        }
        Ok(())
    }
}
