//! Database layer
//!
//! This module provides the persistence gateway for the blog backend:
//! - PostgreSQL (production, reached over TCP or a managed-instance socket)
//! - SQLite (tests and local runs)
//!
//! # Usage
//!
//! ```ignore
//! use s_blog::config::Config;
//! use s_blog::db::{create_pool, migrations};
//!
//! let config = Config::from_env()?;
//! let pool = create_pool(&config.database).await?;
//! migrations::migrate(&pool, config.app_env).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    connect_options, create_pool, create_sqlite_pool, create_test_pool, Backend, DatabaseDriver,
    DatabasePool, DynDatabasePool, PostgresDatabase, SqliteDatabase,
};

#[cfg(test)]
pub(crate) use pool::create_postgres_test_pool;
