//! Comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::User;

/// Comment entity. Belongs to exactly one article and one user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub id: Uuid,
    pub content: String,
    pub article_id: Uuid,
    pub user_id: Uuid,
    /// Comment author, populated on reads
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub user: Option<User>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Comment {
    pub fn new(content: String, article_id: Uuid, user_id: Uuid) -> Self {
        Self::with_id(Uuid::new_v4(), content, article_id, user_id)
    }

    pub fn with_id(id: Uuid, content: String, article_id: Uuid, user_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id,
            content,
            article_id,
            user_id,
            user: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_new() {
        let article_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let comment = Comment::new("Nice post".to_string(), article_id, user_id);

        assert_eq!(comment.article_id, article_id);
        assert_eq!(comment.user_id, user_id);
        assert!(comment.user.is_none());
        assert!(!comment.is_deleted());
    }
}
