//! Comment repository
//!
//! Comments are read together with their author (`Comment::user`) and are
//! soft-deleted.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::DynDatabasePool;
use crate::error::RepoError;
use crate::models::{Comment, User};
use crate::with_pool;

const COMMENT_SELECT: &str = r#"
    SELECT c.id, c.content, c.article_id, c.user_id, c.created_at, c.updated_at, c.deleted_at,
           u.name AS user_name, u.email AS user_email, u.password AS user_password,
           u.avatar AS user_avatar, u.created_at AS user_created_at,
           u.updated_at AS user_updated_at
    FROM comments c
    INNER JOIN users u ON u.id = c.user_id
"#;

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Get a live comment by ID, with its author
    async fn find_by_id(&self, id: Uuid) -> Result<Comment, RepoError>;

    /// List the live comments of an article, oldest first
    async fn list_by_article(&self, article_id: Uuid) -> Result<Vec<Comment>, RepoError>;

    /// Create a new comment
    async fn create(&self, comment: &Comment) -> Result<Comment, RepoError>;

    /// Mark a comment as deleted
    async fn soft_delete(&self, id: Uuid) -> Result<(), RepoError>;

    /// Clear the deletion marker of a soft-deleted comment
    async fn restore(&self, id: Uuid) -> Result<(), RepoError>;

    /// Remove a comment row
    async fn purge(&self, id: Uuid) -> Result<(), RepoError>;
}

#[derive(Debug, sqlx::FromRow)]
struct CommentRow {
    id: Uuid,
    content: String,
    article_id: Uuid,
    user_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
    user_name: String,
    user_email: String,
    user_password: String,
    user_avatar: Option<String>,
    user_created_at: DateTime<Utc>,
    user_updated_at: DateTime<Utc>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Comment {
            id: row.id,
            content: row.content,
            article_id: row.article_id,
            user_id: row.user_id,
            user: Some(User {
                id: row.user_id,
                name: row.user_name,
                email: row.user_email,
                password: row.user_password,
                avatar: row.user_avatar.unwrap_or_default(),
                created_at: row.user_created_at,
                updated_at: row.user_updated_at,
            }),
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        }
    }
}

/// Live comments of an article, oldest first
pub(crate) async fn load_article_comments(
    pool: &DynDatabasePool,
    article_id: Uuid,
) -> Result<Vec<Comment>, RepoError> {
    let sql = format!(
        "{} WHERE c.article_id = $1 AND c.deleted_at IS NULL ORDER BY c.created_at ASC",
        COMMENT_SELECT
    );
    let rows: Vec<CommentRow> = with_pool!(pool, p => {
        sqlx::query_as(&sql).bind(article_id).fetch_all(p).await
    })?;

    Ok(rows.into_iter().map(Comment::from).collect())
}

/// SQLx-based comment repository implementation
pub struct SqlxCommentRepository {
    pool: DynDatabasePool,
}

impl SqlxCommentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Comment, RepoError> {
        let sql = format!("{} WHERE c.id = $1 AND c.deleted_at IS NULL", COMMENT_SELECT);
        let row: Option<CommentRow> = with_pool!(self.pool, p => {
            sqlx::query_as(&sql).bind(id).fetch_optional(p).await
        })?;

        row.map(Comment::from)
            .ok_or_else(|| RepoError::not_found("comment", id))
    }

    async fn list_by_article(&self, article_id: Uuid) -> Result<Vec<Comment>, RepoError> {
        load_article_comments(&self.pool, article_id).await
    }

    async fn create(&self, comment: &Comment) -> Result<Comment, RepoError> {
        let now = Utc::now();
        let sql = r#"
            INSERT INTO comments (id, content, article_id, user_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
        "#;

        with_pool!(self.pool, p => {
            sqlx::query(sql)
                .bind(comment.id)
                .bind(&comment.content)
                .bind(comment.article_id)
                .bind(comment.user_id)
                .bind(now)
                .bind(now)
                .execute(p)
                .await
                .map(|_| ())
        })?;

        self.find_by_id(comment.id).await
    }

    async fn soft_delete(&self, id: Uuid) -> Result<(), RepoError> {
        let affected = with_pool!(self.pool, p => {
            sqlx::query("UPDATE comments SET deleted_at = $1 WHERE id = $2 AND deleted_at IS NULL")
                .bind(Utc::now())
                .bind(id)
                .execute(p)
                .await
                .map(|r| r.rows_affected())
        })?;

        if affected == 0 {
            return Err(RepoError::not_found("comment", id));
        }
        Ok(())
    }

    async fn restore(&self, id: Uuid) -> Result<(), RepoError> {
        let affected = with_pool!(self.pool, p => {
            sqlx::query(
                "UPDATE comments SET deleted_at = NULL, updated_at = $1 WHERE id = $2 AND deleted_at IS NOT NULL",
            )
            .bind(Utc::now())
            .bind(id)
            .execute(p)
            .await
            .map(|r| r.rows_affected())
        })?;

        if affected == 0 {
            return Err(RepoError::not_found("comment", id));
        }
        Ok(())
    }

    async fn purge(&self, id: Uuid) -> Result<(), RepoError> {
        let affected = with_pool!(self.pool, p => {
            sqlx::query("DELETE FROM comments WHERE id = $1")
                .bind(id)
                .execute(p)
                .await
                .map(|r| r.rows_affected())
        })?;

        if affected == 0 {
            return Err(RepoError::not_found("comment", id));
        }
        Ok(())
    }
}
