//! User repository
//!
//! Database operations for users.
//!
//! This module provides:
//! - `UserRepository` trait defining the interface for user data access
//! - `SqlxUserRepository` implementing the trait for PostgreSQL and SQLite

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::DynDatabasePool;
use crate::error::RepoError;
use crate::models::User;
use crate::with_pool;

const USER_COLUMNS: &str = "id, name, email, password, avatar, created_at, updated_at";

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Get user by ID
    async fn find_by_id(&self, id: Uuid) -> Result<User, RepoError>;

    /// Get user by email
    async fn find_by_email(&self, email: &str) -> Result<User, RepoError>;

    /// Create a new user
    async fn create(&self, user: &User) -> Result<User, RepoError>;

    /// Update name, email, password and avatar of a user
    async fn update(&self, user: &User) -> Result<User, RepoError>;

    /// Delete a user. Users have no soft-delete column.
    async fn delete(&self, id: Uuid) -> Result<(), RepoError>;
}

/// Row shape of the `users` table
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password: String,
    avatar: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            name: row.name,
            email: row.email,
            password: row.password,
            avatar: row.avatar.unwrap_or_default(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// SQLx-based user repository implementation
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    /// Create a new SQLx user repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<User, RepoError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row: Option<UserRow> = with_pool!(self.pool, p => {
            sqlx::query_as(&sql).bind(id).fetch_optional(p).await
        })?;

        row.map(User::from)
            .ok_or_else(|| RepoError::not_found("user", id))
    }

    async fn find_by_email(&self, email: &str) -> Result<User, RepoError> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        let row: Option<UserRow> = with_pool!(self.pool, p => {
            sqlx::query_as(&sql).bind(email).fetch_optional(p).await
        })?;

        row.map(User::from)
            .ok_or_else(|| RepoError::not_found("user", email))
    }

    async fn create(&self, user: &User) -> Result<User, RepoError> {
        let now = Utc::now();
        let sql = r#"
            INSERT INTO users (id, name, email, password, avatar, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#;

        with_pool!(self.pool, p => {
            sqlx::query(sql)
                .bind(user.id)
                .bind(&user.name)
                .bind(&user.email)
                .bind(&user.password)
                .bind(&user.avatar)
                .bind(now)
                .bind(now)
                .execute(p)
                .await
                .map(|_| ())
        })?;

        tracing::debug!(user_id = %user.id, "User created");

        Ok(User {
            created_at: now,
            updated_at: now,
            ..user.clone()
        })
    }

    async fn update(&self, user: &User) -> Result<User, RepoError> {
        let now = Utc::now();
        let sql = r#"
            UPDATE users
            SET name = $1, email = $2, password = $3, avatar = $4, updated_at = $5
            WHERE id = $6
        "#;

        let result = with_pool!(self.pool, p => {
            sqlx::query(sql)
                .bind(&user.name)
                .bind(&user.email)
                .bind(&user.password)
                .bind(&user.avatar)
                .bind(now)
                .bind(user.id)
                .execute(p)
                .await
                .map(|r| r.rows_affected())
        })?;

        if result == 0 {
            return Err(RepoError::not_found("user", user.id));
        }

        self.find_by_id(user.id).await
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let affected = with_pool!(self.pool, p => {
            sqlx::query("DELETE FROM users WHERE id = $1")
                .bind(id)
                .execute(p)
                .await
                .map(|r| r.rows_affected())
        })?;

        if affected == 0 {
            return Err(RepoError::not_found("user", id));
        }
        Ok(())
    }
}
