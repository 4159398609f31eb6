//! Database connection pool abstraction
//!
//! This module provides a unified interface for database operations that works
//! with both PostgreSQL and SQLite backends. PostgreSQL is the production store;
//! SQLite backs tests and throwaway local runs.

use async_trait::async_trait;
use sqlx::{
    postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode},
    sqlite::{SqlitePool, SqlitePoolOptions},
};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{DatabaseAddress, DatabaseConfig};
use crate::error::RepoError;

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseDriver {
    Postgres,
    Sqlite,
}

/// Borrowed view of the concrete pool behind a [`DatabasePool`]
#[derive(Debug, Clone, Copy)]
pub enum Backend<'a> {
    Postgres(&'a PgPool),
    Sqlite(&'a SqlitePool),
}

/// Database pool trait that abstracts over different database backends.
///
/// A single pool is shared by every handler and repository; it is safe to use
/// concurrently without extra locking.
#[async_trait]
pub trait DatabasePool: Send + Sync {
    /// Execute a raw SQL statement that doesn't return rows
    async fn execute(&self, query: &str) -> Result<u64, RepoError>;

    /// Trivial round-trip query used by the health check
    async fn ping(&self) -> Result<(), RepoError>;

    /// Close the connection pool
    async fn close(&self);

    /// Get the database driver type
    fn driver(&self) -> DatabaseDriver;

    /// Borrow the concrete pool
    fn backend(&self) -> Backend<'_>;

    /// Get the underlying PostgreSQL pool if this is a PostgreSQL connection
    fn as_postgres(&self) -> Option<&PgPool> {
        match self.backend() {
            Backend::Postgres(pool) => Some(pool),
            Backend::Sqlite(_) => None,
        }
    }

    /// Get the underlying SQLite pool if this is a SQLite connection
    fn as_sqlite(&self) -> Option<&SqlitePool> {
        match self.backend() {
            Backend::Sqlite(pool) => Some(pool),
            Backend::Postgres(_) => None,
        }
    }
}

/// Build PostgreSQL connect options from configuration.
///
/// The managed-instance socket is used whenever an instance connection name is
/// configured; otherwise host and port.
pub fn connect_options(config: &DatabaseConfig) -> PgConnectOptions {
    let options = PgConnectOptions::new()
        .username(&config.user)
        .password(&config.password)
        .database(&config.name);

    match config.address() {
        DatabaseAddress::Tcp { host, port } => {
            options.host(&host).port(port).ssl_mode(PgSslMode::Disable)
        }
        DatabaseAddress::Socket { path } => options.socket(path),
    }
}

/// PostgreSQL connection pool implementation
pub struct PostgresDatabase {
    pool: PgPool,
}

impl PostgresDatabase {
    /// Open a PostgreSQL pool
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, RepoError> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .connect_with(connect_options(config))
            .await
            .map_err(RepoError::Connection)?;

        Ok(Self { pool })
    }

    /// Get a reference to the underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl DatabasePool for PostgresDatabase {
    async fn execute(&self, query: &str) -> Result<u64, RepoError> {
        let result = sqlx::query(query).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<(), RepoError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }

    fn driver(&self) -> DatabaseDriver {
        DatabaseDriver::Postgres
    }

    fn backend(&self) -> Backend<'_> {
        Backend::Postgres(&self.pool)
    }
}

/// SQLite connection pool implementation
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    /// Create a new SQLite connection pool
    pub async fn new(url: &str) -> Result<Self, RepoError> {
        // Ensure the database directory exists for file-based SQLite
        if !url.starts_with(":memory:") && !url.starts_with("sqlite::memory:") {
            let path = url.trim_start_matches("sqlite:");
            if let Some(parent) = std::path::Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .map_err(|e| RepoError::Connection(sqlx::Error::Io(e)))?;
                }
            }
        }

        let connection_url = if url.starts_with("sqlite:") {
            if url.contains('?') {
                url.to_string()
            } else {
                format!("{}?mode=rwc", url)
            }
        } else if url == ":memory:" {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite:{}?mode=rwc", url)
        };

        // Every in-memory connection is its own database, so keep exactly one
        let in_memory = connection_url.contains(":memory:");
        let mut options = SqlitePoolOptions::new().max_connections(if in_memory { 1 } else { 5 });
        if in_memory {
            options = options
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>);
        }

        let pool = options
            .connect(&connection_url)
            .await
            .map_err(RepoError::Connection)?;

        // Foreign keys are off by default in SQLite
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&pool)
            .await
            .map_err(RepoError::Connection)?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl DatabasePool for SqliteDatabase {
    async fn execute(&self, query: &str) -> Result<u64, RepoError> {
        let result = sqlx::query(query).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<(), RepoError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }

    fn driver(&self) -> DatabaseDriver {
        DatabaseDriver::Sqlite
    }

    fn backend(&self) -> Backend<'_> {
        Backend::Sqlite(&self.pool)
    }
}

/// Type alias for the shared database handle
pub type DynDatabasePool = Arc<dyn DatabasePool>;

/// Open the shared PostgreSQL pool described by the configuration.
///
/// # Errors
///
/// Returns [`RepoError::Connection`] if the database cannot be reached.
pub async fn create_pool(config: &DatabaseConfig) -> Result<DynDatabasePool, RepoError> {
    let db = PostgresDatabase::connect(config).await?;
    Ok(Arc::new(db))
}

/// Open a SQLite pool from a path or `sqlite:` URL
pub async fn create_sqlite_pool(url: &str) -> Result<DynDatabasePool, RepoError> {
    let db = SqliteDatabase::new(url).await?;
    Ok(Arc::new(db))
}

/// Create a SQLite in-memory database pool for testing
pub async fn create_test_pool() -> Result<DynDatabasePool, RepoError> {
    create_sqlite_pool(":memory:").await
}

/// Connect to the PostgreSQL server named by the `DATABASE_*` variables.
///
/// Tests using it drop tables, so point them at a throwaway database and run
/// them with `--ignored --test-threads=1`.
#[cfg(test)]
pub(crate) async fn create_postgres_test_pool() -> DynDatabasePool {
    let config = crate::config::Config::from_env().expect("DATABASE_* variables must be set");
    create_pool(&config.database)
        .await
        .expect("Failed to connect to PostgreSQL")
}

/// Run `$body` against the concrete pool, binding it to `$p`.
///
/// The body is expanded once per backend, so the same query code is checked
/// against both the PostgreSQL and the SQLite driver.
#[macro_export]
macro_rules! with_pool {
    ($pool:expr, $p:ident => $body:expr) => {
        match $pool.backend() {
            $crate::db::Backend::Postgres($p) => $body,
            $crate::db::Backend::Sqlite($p) => $body,
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config(instance: &str) -> DatabaseConfig {
        DatabaseConfig {
            user: "blog".to_string(),
            password: "pw".to_string(),
            instance_connection_name: instance.to_string(),
            host: "db.internal".to_string(),
            port: 5432,
            name: "blog".to_string(),
            socket_dir: "/cloudsql".to_string(),
        }
    }

    #[test]
    fn test_connect_options_tcp() {
        let options = connect_options(&sample_config(""));
        assert_eq!(options.get_host(), "db.internal");
        assert_eq!(options.get_port(), 5432);
        assert!(options.get_socket().is_none());
        assert_eq!(options.get_database(), Some("blog"));
        assert_eq!(options.get_username(), "blog");
    }

    #[test]
    fn test_connect_options_socket() {
        let options = connect_options(&sample_config("proj:region:inst"));
        assert_eq!(
            options.get_socket().map(|p| p.to_string_lossy().into_owned()),
            Some("/cloudsql/proj:region:inst".to_string())
        );
    }

    #[tokio::test]
    async fn test_sqlite_pool_creation() {
        let pool = create_test_pool().await.expect("Failed to create pool");
        assert_eq!(pool.driver(), DatabaseDriver::Sqlite);
        assert!(pool.as_sqlite().is_some());
        assert!(pool.as_postgres().is_none());
    }

    #[tokio::test]
    async fn test_sqlite_pool_ping() {
        let pool = create_test_pool().await.expect("Failed to create pool");
        pool.ping().await.expect("Ping should succeed");
    }

    #[tokio::test]
    async fn test_sqlite_pool_execute() {
        let pool = create_test_pool().await.expect("Failed to create pool");

        pool.execute("CREATE TABLE test (id INTEGER PRIMARY KEY, name TEXT)")
            .await
            .expect("Failed to create table");

        let affected = pool
            .execute("INSERT INTO test (name) VALUES ('test')")
            .await
            .expect("Failed to insert");
        assert_eq!(affected, 1);
    }

    #[tokio::test]
    async fn test_sqlite_nested_directory_creation() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("nested").join("dir").join("blog.db");

        let pool = create_sqlite_pool(&db_path.to_string_lossy())
            .await
            .expect("Failed to create pool");
        pool.ping().await.expect("Ping should succeed");

        assert!(db_path.exists());
    }

    #[tokio::test]
    async fn test_ping_fails_after_close() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        pool.close().await;

        let err = pool.ping().await.expect_err("Ping should fail on a closed pool");
        assert!(matches!(err, RepoError::Connection(_)));
    }

    #[tokio::test]
    async fn test_with_pool_macro_dispatches() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        let value: i64 = with_pool!(pool, p => sqlx::query_scalar("SELECT 41 + 1").fetch_one(p).await)
            .expect("query should succeed");
        assert_eq!(value, 42);
    }

    #[tokio::test]
    #[ignore = "Requires PostgreSQL server"]
    async fn test_postgres_pool_ping() {
        let pool = create_postgres_test_pool().await;
        assert_eq!(pool.driver(), DatabaseDriver::Postgres);
        pool.ping().await.expect("Ping should succeed");
    }
}
