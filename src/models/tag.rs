//! Tag model
//!
//! Tags label articles across the blog. Tag names are unique and tags are
//! soft-deleted rather than removed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tag entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tag {
    /// Unique identifier
    pub id: Uuid,
    /// Tag name (unique)
    pub name: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker
    #[serde(skip)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Tag {
    /// Create a new Tag with a freshly generated identifier.
    pub fn new(name: String) -> Self {
        Self::with_id(Uuid::new_v4(), name)
    }

    /// Create a Tag with a caller-supplied identifier.
    pub fn with_id(id: Uuid, name: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            name,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Whether the tag has been soft-deleted
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_new() {
        let tag = Tag::new("Rust".to_string());

        assert!(!tag.id.is_nil());
        assert_eq!(tag.name, "Rust");
        assert!(!tag.is_deleted());
    }

    #[test]
    fn test_deleted_at_not_serialized() {
        let mut tag = Tag::new("Go".to_string());
        tag.deleted_at = Some(Utc::now());

        let json = serde_json::to_value(&tag).unwrap();
        assert!(json.get("deleted_at").is_none());
        assert!(tag.is_deleted());
    }
}
