//! Article repository
//!
//! Database operations for articles.
//!
//! This module provides:
//! - `ArticleRepository` trait defining the interface for article data access
//! - `SqlxArticleRepository` implementing the trait for PostgreSQL and SQLite
//!
//! Every read populates `Article::author` (joined from `users`) and
//! `Article::tags` (live tags only). Soft-deleted articles are excluded unless
//! fetched with `find_by_id_with_deleted`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use super::comment::load_article_comments;
use super::tag::load_article_tags;
use crate::db::DynDatabasePool;
use crate::error::RepoError;
use crate::models::{Article, User};
use crate::with_pool;

/// Columns selected for an article joined with its author
const ARTICLE_SELECT: &str = r#"
    SELECT a.id, a.title, a.content, a.excerpt, a.slug, a.published_at, a.author_id,
           a.created_at, a.updated_at, a.deleted_at,
           u.name AS author_name, u.email AS author_email, u.password AS author_password,
           u.avatar AS author_avatar, u.created_at AS author_created_at,
           u.updated_at AS author_updated_at
    FROM articles a
    INNER JOIN users u ON u.id = a.author_id
"#;

/// Article repository trait
#[async_trait]
pub trait ArticleRepository: Send + Sync {
    /// Get a live article by ID, with author and tags
    async fn find_by_id(&self, id: Uuid) -> Result<Article, RepoError>;

    /// Get an article by ID even if it has been soft-deleted
    async fn find_by_id_with_deleted(&self, id: Uuid) -> Result<Article, RepoError>;

    /// Get a live article by slug
    async fn find_by_slug(&self, slug: &str) -> Result<Article, RepoError>;

    /// List published, live articles, newest first
    async fn list_published(&self, limit: i64) -> Result<Vec<Article>, RepoError>;

    /// List published, live articles carrying the named tag, newest first
    async fn list_by_tag(&self, tag_name: &str) -> Result<Vec<Article>, RepoError>;

    /// List published, live articles written by one user, newest first
    async fn list_by_author(&self, author_id: Uuid) -> Result<Vec<Article>, RepoError>;

    /// Create a new article. Tags on the input are ignored; use `attach_tag`.
    async fn create(&self, article: &Article) -> Result<Article, RepoError>;

    /// Update the content fields and publication state of a live article
    async fn update(&self, article: &Article) -> Result<Article, RepoError>;

    /// Mark an article as deleted
    async fn soft_delete(&self, id: Uuid) -> Result<(), RepoError>;

    /// Clear the deletion marker of a soft-deleted article
    async fn restore(&self, id: Uuid) -> Result<(), RepoError>;

    /// Remove an article row, its comments and its tag associations
    async fn purge(&self, id: Uuid) -> Result<(), RepoError>;

    /// Associate a tag with an article. Attaching twice is a no-op.
    async fn attach_tag(&self, article_id: Uuid, tag_id: Uuid) -> Result<(), RepoError>;

    /// Remove a tag association, returning whether one existed
    async fn detach_tag(&self, article_id: Uuid, tag_id: Uuid) -> Result<bool, RepoError>;
}

/// Article row joined with its author
#[derive(Debug, sqlx::FromRow)]
struct ArticleRow {
    id: Uuid,
    title: String,
    content: String,
    excerpt: Option<String>,
    slug: String,
    published_at: Option<DateTime<Utc>>,
    author_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
    author_name: String,
    author_email: String,
    author_password: String,
    author_avatar: Option<String>,
    author_created_at: DateTime<Utc>,
    author_updated_at: DateTime<Utc>,
}

impl From<ArticleRow> for Article {
    fn from(row: ArticleRow) -> Self {
        let author = User {
            id: row.author_id,
            name: row.author_name,
            email: row.author_email,
            password: row.author_password,
            avatar: row.author_avatar.unwrap_or_default(),
            created_at: row.author_created_at,
            updated_at: row.author_updated_at,
        };

        Article {
            id: row.id,
            title: row.title,
            content: row.content,
            excerpt: row.excerpt.unwrap_or_default(),
            slug: row.slug,
            published_at: row.published_at,
            author_id: row.author_id,
            author: Some(author),
            tags: Vec::new(),
            comments: None,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        }
    }
}

/// SQLx-based article repository implementation
pub struct SqlxArticleRepository {
    pool: DynDatabasePool,
}

impl SqlxArticleRepository {
    /// Create a new SQLx article repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ArticleRepository> {
        Arc::new(Self::new(pool))
    }

    /// Convert a row and load its tags
    async fn hydrate(&self, row: ArticleRow) -> Result<Article, RepoError> {
        let mut article = Article::from(row);
        article.tags = load_article_tags(&self.pool, article.id).await?;
        Ok(article)
    }

    /// Like `hydrate`, also loading the live comments
    async fn hydrate_with_comments(&self, row: ArticleRow) -> Result<Article, RepoError> {
        let mut article = self.hydrate(row).await?;
        article.comments = Some(load_article_comments(&self.pool, article.id).await?);
        Ok(article)
    }

    async fn hydrate_all(&self, rows: Vec<ArticleRow>) -> Result<Vec<Article>, RepoError> {
        let mut articles = Vec::with_capacity(rows.len());
        for row in rows {
            articles.push(self.hydrate(row).await?);
        }
        Ok(articles)
    }

    async fn fetch_by_id(&self, id: Uuid, include_deleted: bool) -> Result<Article, RepoError> {
        let sql = if include_deleted {
            format!("{} WHERE a.id = $1", ARTICLE_SELECT)
        } else {
            format!("{} WHERE a.id = $1 AND a.deleted_at IS NULL", ARTICLE_SELECT)
        };

        let row: Option<ArticleRow> = with_pool!(self.pool, p => {
            sqlx::query_as(&sql).bind(id).fetch_optional(p).await
        })?;

        match row {
            Some(row) => self.hydrate_with_comments(row).await,
            None => Err(RepoError::not_found("article", id)),
        }
    }
}

#[async_trait]
impl ArticleRepository for SqlxArticleRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Article, RepoError> {
        self.fetch_by_id(id, false).await
    }

    async fn find_by_id_with_deleted(&self, id: Uuid) -> Result<Article, RepoError> {
        self.fetch_by_id(id, true).await
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Article, RepoError> {
        let sql = format!("{} WHERE a.slug = $1 AND a.deleted_at IS NULL", ARTICLE_SELECT);
        let row: Option<ArticleRow> = with_pool!(self.pool, p => {
            sqlx::query_as(&sql).bind(slug).fetch_optional(p).await
        })?;

        match row {
            Some(row) => self.hydrate_with_comments(row).await,
            None => Err(RepoError::not_found("article", slug)),
        }
    }

    async fn list_published(&self, limit: i64) -> Result<Vec<Article>, RepoError> {
        let sql = format!(
            "{} WHERE a.deleted_at IS NULL AND a.published_at IS NOT NULL \
             ORDER BY a.published_at DESC LIMIT $1",
            ARTICLE_SELECT
        );
        let rows: Vec<ArticleRow> = with_pool!(self.pool, p => {
            sqlx::query_as(&sql).bind(limit.max(0)).fetch_all(p).await
        })?;

        self.hydrate_all(rows).await
    }

    async fn list_by_tag(&self, tag_name: &str) -> Result<Vec<Article>, RepoError> {
        let sql = format!(
            "{} INNER JOIN article_tags atg ON atg.article_id = a.id \
             INNER JOIN tags t ON t.id = atg.tag_id \
             WHERE t.name = $1 AND t.deleted_at IS NULL \
             AND a.deleted_at IS NULL AND a.published_at IS NOT NULL \
             ORDER BY a.published_at DESC",
            ARTICLE_SELECT
        );
        let rows: Vec<ArticleRow> = with_pool!(self.pool, p => {
            sqlx::query_as(&sql).bind(tag_name).fetch_all(p).await
        })?;

        self.hydrate_all(rows).await
    }

    async fn list_by_author(&self, author_id: Uuid) -> Result<Vec<Article>, RepoError> {
        let sql = format!(
            "{} WHERE a.author_id = $1 AND a.deleted_at IS NULL AND a.published_at IS NOT NULL \
             ORDER BY a.published_at DESC",
            ARTICLE_SELECT
        );
        let rows: Vec<ArticleRow> = with_pool!(self.pool, p => {
            sqlx::query_as(&sql).bind(author_id).fetch_all(p).await
        })?;

        self.hydrate_all(rows).await
    }

    async fn create(&self, article: &Article) -> Result<Article, RepoError> {
        let now = Utc::now();
        let sql = r#"
            INSERT INTO articles (id, title, content, excerpt, slug, published_at, author_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#;

        with_pool!(self.pool, p => {
            sqlx::query(sql)
                .bind(article.id)
                .bind(&article.title)
                .bind(&article.content)
                .bind(&article.excerpt)
                .bind(&article.slug)
                .bind(article.published_at)
                .bind(article.author_id)
                .bind(now)
                .bind(now)
                .execute(p)
                .await
                .map(|_| ())
        })?;

        tracing::debug!(article_id = %article.id, slug = %article.slug, "Article created");

        self.find_by_id(article.id).await
    }

    async fn update(&self, article: &Article) -> Result<Article, RepoError> {
        let sql = r#"
            UPDATE articles
            SET title = $1, content = $2, excerpt = $3, slug = $4, published_at = $5, updated_at = $6
            WHERE id = $7 AND deleted_at IS NULL
        "#;

        let affected = with_pool!(self.pool, p => {
            sqlx::query(sql)
                .bind(&article.title)
                .bind(&article.content)
                .bind(&article.excerpt)
                .bind(&article.slug)
                .bind(article.published_at)
                .bind(Utc::now())
                .bind(article.id)
                .execute(p)
                .await
                .map(|r| r.rows_affected())
        })?;

        if affected == 0 {
            return Err(RepoError::not_found("article", article.id));
        }

        self.find_by_id(article.id).await
    }

    async fn soft_delete(&self, id: Uuid) -> Result<(), RepoError> {
        let affected = with_pool!(self.pool, p => {
            sqlx::query("UPDATE articles SET deleted_at = $1 WHERE id = $2 AND deleted_at IS NULL")
                .bind(Utc::now())
                .bind(id)
                .execute(p)
                .await
                .map(|r| r.rows_affected())
        })?;

        if affected == 0 {
            return Err(RepoError::not_found("article", id));
        }
        Ok(())
    }

    async fn restore(&self, id: Uuid) -> Result<(), RepoError> {
        let affected = with_pool!(self.pool, p => {
            sqlx::query(
                "UPDATE articles SET deleted_at = NULL, updated_at = $1 WHERE id = $2 AND deleted_at IS NOT NULL",
            )
            .bind(Utc::now())
            .bind(id)
            .execute(p)
            .await
            .map(|r| r.rows_affected())
        })?;

        if affected == 0 {
            return Err(RepoError::not_found("article", id));
        }
        Ok(())
    }

    async fn purge(&self, id: Uuid) -> Result<(), RepoError> {
        let affected = with_pool!(self.pool, p => {
            sqlx::query("DELETE FROM articles WHERE id = $1")
                .bind(id)
                .execute(p)
                .await
                .map(|r| r.rows_affected())
        })?;

        if affected == 0 {
            return Err(RepoError::not_found("article", id));
        }
        Ok(())
    }

    async fn attach_tag(&self, article_id: Uuid, tag_id: Uuid) -> Result<(), RepoError> {
        let sql = r#"
            INSERT INTO article_tags (article_id, tag_id)
            VALUES ($1, $2)
            ON CONFLICT (article_id, tag_id) DO NOTHING
        "#;

        with_pool!(self.pool, p => {
            sqlx::query(sql).bind(article_id).bind(tag_id).execute(p).await.map(|_| ())
        })?;
        Ok(())
    }

    async fn detach_tag(&self, article_id: Uuid, tag_id: Uuid) -> Result<bool, RepoError> {
        let affected = with_pool!(self.pool, p => {
            sqlx::query("DELETE FROM article_tags WHERE article_id = $1 AND tag_id = $2")
                .bind(article_id)
                .bind(tag_id)
                .execute(p)
                .await
                .map(|r| r.rows_affected())
        })?;
        Ok(affected > 0)
    }
}
