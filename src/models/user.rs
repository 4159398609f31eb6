//! User model
//!
//! Users author articles and comments. The password column is write-only:
//! it is never serialized and never exposed through the GraphQL schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User entity representing a registered user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    /// Unique identifier
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// Email address (unique)
    pub email: String,
    /// Password, never serialized outward
    #[serde(skip_serializing, default)]
    pub password: String,
    /// Avatar reference (URL or storage key)
    pub avatar: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new User with a freshly generated identifier.
    ///
    /// Timestamps are placeholders; the repository sets them on insert.
    pub fn new(name: String, email: String, password: String, avatar: String) -> Self {
        Self::with_id(Uuid::new_v4(), name, email, password, avatar)
    }

    /// Create a User with a caller-supplied identifier.
    pub fn with_id(id: Uuid, name: String, email: String, password: String, avatar: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            name,
            email,
            password,
            avatar,
            created_at: now,
            updated_at: now,
        }
    }
}
