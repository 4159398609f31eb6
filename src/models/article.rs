//! Article model
//!
//! This module provides:
//! - `Article` entity representing a blog article
//! - `ArticleTag` join row linking articles and tags
//!
//! An article with no `published_at` is a draft. Articles are soft-deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Comment, Tag, User};

/// Words per minute used for the reading time estimate
const READING_WORDS_PER_MINUTE: usize = 200;

/// Article entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Article {
    /// Unique identifier
    pub id: Uuid,
    /// Article title
    pub title: String,
    /// Markdown content
    pub content: String,
    /// Short summary shown in listings
    pub excerpt: String,
    /// URL-friendly slug (unique)
    pub slug: String,
    /// Publication timestamp, `None` for drafts
    pub published_at: Option<DateTime<Utc>>,
    /// Author user ID
    pub author_id: Uuid,
    /// Author, populated on reads
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub author: Option<User>,
    /// Tags, populated on reads
    #[serde(default)]
    pub tags: Vec<Tag>,
    /// Live comments, oldest first. Loaded by single-article reads only.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub comments: Option<Vec<Comment>>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker
    #[serde(skip)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Article {
    /// Create a new draft article with a freshly generated identifier.
    pub fn new(
        title: String,
        content: String,
        excerpt: String,
        slug: String,
        author_id: Uuid,
    ) -> Self {
        Self::with_id(Uuid::new_v4(), title, content, excerpt, slug, author_id)
    }

    /// Create a draft article with a caller-supplied identifier.
    pub fn with_id(
        id: Uuid,
        title: String,
        content: String,
        excerpt: String,
        slug: String,
        author_id: Uuid,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            title,
            content,
            excerpt,
            slug,
            published_at: None,
            author_id,
            author: None,
            tags: Vec::new(),
            comments: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Mark the article as published at the given instant
    pub fn publish(&mut self, at: DateTime<Utc>) {
        self.published_at = Some(at);
    }

    /// Drafts have no publication timestamp
    pub fn is_draft(&self) -> bool {
        self.published_at.is_none()
    }

    /// Whether the article has been soft-deleted
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Estimated reading time in whole minutes (at least one)
    pub fn reading_time_minutes(&self) -> usize {
        let words = self.content.split_whitespace().count();
        words.div_ceil(READING_WORDS_PER_MINUTE).max(1)
    }
}

/// Join row between an article and a tag.
///
/// Rows have no lifecycle of their own: they are created and removed when the
/// article/tag association changes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ArticleTag {
    pub article_id: Uuid,
    pub tag_id: Uuid,
}

impl ArticleTag {
    pub fn new(article_id: Uuid, tag_id: Uuid) -> Self {
        Self { article_id, tag_id }
    }
}
