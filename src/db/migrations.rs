//! Schema migration
//!
//! The schema is declared once as a table of [`TableDef`]s (columns, keys,
//! foreign keys, indexes) and rendered to DDL for the active backend. Entity
//! structs carry no storage mapping of their own.
//!
//! # Modes
//!
//! - Development: drop the five known tables (absent tables are ignored),
//!   then create them again.
//! - Any other mode: create missing tables and add missing columns. Existing
//!   rows are never touched.
//!
//! ```ignore
//! use s_blog::db::{create_pool, migrations};
//!
//! let pool = create_pool(&config.database).await?;
//! migrations::migrate(&pool, config.app_env).await?;
//! ```

use std::collections::HashSet;

use super::{Backend, DatabaseDriver, DynDatabasePool};
use crate::config::AppEnv;
use crate::error::RepoError;
use crate::with_pool;

/// Logical column type, rendered per backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Uuid,
    Varchar(u16),
    Text,
    Timestamp,
}

impl ColumnType {
    fn render(&self, driver: DatabaseDriver) -> String {
        match (self, driver) {
            (ColumnType::Uuid, DatabaseDriver::Postgres) => "UUID".to_string(),
            // sqlx stores UUIDs as 16-byte blobs in SQLite
            (ColumnType::Uuid, DatabaseDriver::Sqlite) => "BLOB".to_string(),
            (ColumnType::Varchar(len), _) => format!("VARCHAR({})", len),
            (ColumnType::Text, _) => "TEXT".to_string(),
            (ColumnType::Timestamp, DatabaseDriver::Postgres) => "TIMESTAMPTZ".to_string(),
            (ColumnType::Timestamp, DatabaseDriver::Sqlite) => "TIMESTAMP".to_string(),
        }
    }
}

/// A column in a table definition
#[derive(Debug, Clone, Copy)]
pub struct ColumnDef {
    pub name: &'static str,
    pub column_type: ColumnType,
    pub nullable: bool,
    pub unique: bool,
}

impl ColumnDef {
    const fn required(name: &'static str, column_type: ColumnType) -> Self {
        Self {
            name,
            column_type,
            nullable: false,
            unique: false,
        }
    }

    const fn optional(name: &'static str, column_type: ColumnType) -> Self {
        Self {
            name,
            column_type,
            nullable: true,
            unique: false,
        }
    }

    const fn unique(name: &'static str, column_type: ColumnType) -> Self {
        Self {
            name,
            column_type,
            nullable: false,
            unique: true,
        }
    }
}

/// A foreign key from one column to another table
#[derive(Debug, Clone, Copy)]
pub struct ForeignKeyDef {
    pub column: &'static str,
    pub references: &'static str,
    pub on_delete_cascade: bool,
}

/// A non-unique index
#[derive(Debug, Clone, Copy)]
pub struct IndexDef {
    pub name: &'static str,
    pub columns: &'static [&'static str],
}

/// Declarative table definition consumed by the migration routine
#[derive(Debug, Clone, Copy)]
pub struct TableDef {
    pub name: &'static str,
    pub columns: &'static [ColumnDef],
    pub primary_key: &'static [&'static str],
    pub foreign_keys: &'static [ForeignKeyDef],
    pub indexes: &'static [IndexDef],
}

use ColumnType::{Text, Timestamp, Uuid, Varchar};

/// The five tables of the blog schema, in creation order (parents first).
pub const TABLES: &[TableDef] = &[
    TableDef {
        name: "users",
        columns: &[
            ColumnDef::required("id", Uuid),
            ColumnDef::required("name", Varchar(100)),
            ColumnDef::unique("email", Varchar(100)),
            ColumnDef::required("password", Varchar(100)),
            ColumnDef::optional("avatar", Varchar(255)),
            ColumnDef::required("created_at", Timestamp),
            ColumnDef::required("updated_at", Timestamp),
        ],
        primary_key: &["id"],
        foreign_keys: &[],
        indexes: &[],
    },
    TableDef {
        name: "tags",
        columns: &[
            ColumnDef::required("id", Uuid),
            ColumnDef::unique("name", Varchar(50)),
            ColumnDef::required("created_at", Timestamp),
            ColumnDef::required("updated_at", Timestamp),
            ColumnDef::optional("deleted_at", Timestamp),
        ],
        primary_key: &["id"],
        foreign_keys: &[],
        indexes: &[IndexDef {
            name: "idx_tags_deleted_at",
            columns: &["deleted_at"],
        }],
    },
    TableDef {
        name: "articles",
        columns: &[
            ColumnDef::required("id", Uuid),
            ColumnDef::required("title", Varchar(200)),
            ColumnDef::required("content", Text),
            ColumnDef::optional("excerpt", Varchar(500)),
            ColumnDef::unique("slug", Varchar(200)),
            ColumnDef::optional("published_at", Timestamp),
            ColumnDef::required("author_id", Uuid),
            ColumnDef::required("created_at", Timestamp),
            ColumnDef::required("updated_at", Timestamp),
            ColumnDef::optional("deleted_at", Timestamp),
        ],
        primary_key: &["id"],
        foreign_keys: &[ForeignKeyDef {
            column: "author_id",
            references: "users",
            on_delete_cascade: false,
        }],
        indexes: &[
            IndexDef {
                name: "idx_articles_author_id",
                columns: &["author_id"],
            },
            IndexDef {
                name: "idx_articles_published_at",
                columns: &["published_at"],
            },
            IndexDef {
                name: "idx_articles_deleted_at",
                columns: &["deleted_at"],
            },
        ],
    },
    TableDef {
        name: "comments",
        columns: &[
            ColumnDef::required("id", Uuid),
            ColumnDef::required("content", Text),
            ColumnDef::required("article_id", Uuid),
            ColumnDef::required("user_id", Uuid),
            ColumnDef::required("created_at", Timestamp),
            ColumnDef::required("updated_at", Timestamp),
            ColumnDef::optional("deleted_at", Timestamp),
        ],
        primary_key: &["id"],
        foreign_keys: &[
            ForeignKeyDef {
                column: "article_id",
                references: "articles",
                on_delete_cascade: true,
            },
            ForeignKeyDef {
                column: "user_id",
                references: "users",
                on_delete_cascade: false,
            },
        ],
        indexes: &[
            IndexDef {
                name: "idx_comments_article_id",
                columns: &["article_id"],
            },
            IndexDef {
                name: "idx_comments_deleted_at",
                columns: &["deleted_at"],
            },
        ],
    },
    TableDef {
        name: "article_tags",
        columns: &[
            ColumnDef::required("article_id", Uuid),
            ColumnDef::required("tag_id", Uuid),
        ],
        primary_key: &["article_id", "tag_id"],
        foreign_keys: &[
            ForeignKeyDef {
                column: "article_id",
                references: "articles",
                on_delete_cascade: true,
            },
            ForeignKeyDef {
                column: "tag_id",
                references: "tags",
                on_delete_cascade: true,
            },
        ],
        indexes: &[IndexDef {
            name: "idx_article_tags_tag_id",
            columns: &["tag_id"],
        }],
    },
];

/// Names of the known tables, in creation order
pub fn table_names() -> Vec<&'static str> {
    TABLES.iter().map(|t| t.name).collect()
}

/// What a migration run changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Tables dropped (development mode only)
    pub dropped: Vec<&'static str>,
    /// Tables that did not exist before this run
    pub created: Vec<&'static str>,
    /// Columns added to existing tables, as `table.column`
    pub added_columns: Vec<String>,
}

/// Render a column definition for CREATE TABLE
fn render_column(column: &ColumnDef, driver: DatabaseDriver) -> String {
    let mut sql = format!("{} {}", column.name, column.column_type.render(driver));
    if !column.nullable {
        sql.push_str(" NOT NULL");
    }
    if column.unique {
        sql.push_str(" UNIQUE");
    }
    sql
}

/// Render `CREATE TABLE IF NOT EXISTS` for a table definition
pub fn render_create_table(table: &TableDef, driver: DatabaseDriver) -> String {
    let mut parts: Vec<String> = table
        .columns
        .iter()
        .map(|c| render_column(c, driver))
        .collect();

    parts.push(format!("PRIMARY KEY ({})", table.primary_key.join(", ")));

    for fk in table.foreign_keys {
        let mut clause = format!(
            "FOREIGN KEY ({}) REFERENCES {}(id)",
            fk.column, fk.references
        );
        if fk.on_delete_cascade {
            clause.push_str(" ON DELETE CASCADE");
        }
        parts.push(clause);
    }

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
        table.name,
        parts.join(",\n    ")
    )
}

/// Render the index statements for a table definition
pub fn render_indexes(table: &TableDef) -> Vec<String> {
    table
        .indexes
        .iter()
        .map(|idx| {
            format!(
                "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
                idx.name,
                table.name,
                idx.columns.join(", ")
            )
        })
        .collect()
}

/// Render a drop statement that ignores absent tables
fn render_drop_table(table: &TableDef, driver: DatabaseDriver) -> String {
    match driver {
        DatabaseDriver::Postgres => format!("DROP TABLE IF EXISTS {} CASCADE", table.name),
        DatabaseDriver::Sqlite => format!("DROP TABLE IF EXISTS {}", table.name),
    }
}

/// Render `ALTER TABLE ... ADD COLUMN` for a column missing from an existing
/// table. Added columns are nullable and not unique, since existing rows have
/// no value for them.
fn render_add_column(table: &TableDef, column: &ColumnDef, driver: DatabaseDriver) -> String {
    format!(
        "ALTER TABLE {} ADD COLUMN {} {}",
        table.name,
        column.name,
        column.column_type.render(driver)
    )
}

async fn run_statement(pool: &DynDatabasePool, table: &str, sql: &str) -> Result<(), RepoError> {
    with_pool!(pool, p => sqlx::query(sql).execute(p).await.map(|_| ()))
        .map_err(|source| RepoError::Migration {
            table: table.to_string(),
            source,
        })
}

/// List which of the known tables currently exist
pub async fn existing_tables(pool: &DynDatabasePool) -> Result<Vec<&'static str>, RepoError> {
    let names: Vec<String> = match pool.backend() {
        Backend::Postgres(p) => {
            sqlx::query_scalar(
                "SELECT table_name::text FROM information_schema.tables WHERE table_schema = current_schema()",
            )
            .fetch_all(p)
            .await?
        }
        Backend::Sqlite(p) => {
            sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table'")
                .fetch_all(p)
                .await?
        }
    };

    let present: HashSet<String> = names.into_iter().collect();
    Ok(TABLES
        .iter()
        .map(|t| t.name)
        .filter(|name| present.contains(*name))
        .collect())
}

async fn existing_columns(pool: &DynDatabasePool, table: &str) -> Result<HashSet<String>, RepoError> {
    let names: Vec<String> = match pool.backend() {
        Backend::Postgres(p) => {
            sqlx::query_scalar(
                "SELECT column_name::text FROM information_schema.columns \
                 WHERE table_schema = current_schema() AND table_name = $1",
            )
            .bind(table)
            .fetch_all(p)
            .await?
        }
        Backend::Sqlite(p) => {
            sqlx::query_scalar("SELECT name FROM pragma_table_info($1)")
                .bind(table)
                .fetch_all(p)
                .await?
        }
    };
    Ok(names.into_iter().collect())
}

/// Drop every known table, children first. Absent tables are skipped.
pub async fn drop_all(pool: &DynDatabasePool) -> Result<Vec<&'static str>, RepoError> {
    let driver = pool.driver();
    let mut dropped = Vec::new();

    for table in TABLES.iter().rev() {
        tracing::info!(table = table.name, "Dropping table");
        run_statement(pool, table.name, &render_drop_table(table, driver)).await?;
        dropped.push(table.name);
    }

    Ok(dropped)
}

/// Create missing tables, indexes and columns without touching existing data.
async fn create_or_update(pool: &DynDatabasePool) -> Result<MigrationReport, RepoError> {
    let driver = pool.driver();
    let before: HashSet<&'static str> = existing_tables(pool).await?.into_iter().collect();
    let mut report = MigrationReport::default();

    for table in TABLES {
        if before.contains(table.name) {
            let columns = existing_columns(pool, table.name).await?;
            for column in table.columns.iter().filter(|c| !columns.contains(c.name)) {
                tracing::warn!(
                    table = table.name,
                    column = column.name,
                    "Adding missing column as nullable"
                );
                run_statement(pool, table.name, &render_add_column(table, column, driver)).await?;
                report
                    .added_columns
                    .push(format!("{}.{}", table.name, column.name));
            }
        } else {
            tracing::info!(table = table.name, "Creating table");
            report.created.push(table.name);
        }

        run_statement(pool, table.name, &render_create_table(table, driver)).await?;
        for index in render_indexes(table) {
            run_statement(pool, table.name, &index).await?;
        }
    }

    Ok(report)
}

/// Run the schema migration for the given execution mode.
///
/// Failures are meant to be fatal to startup; nothing is retried.
pub async fn migrate(pool: &DynDatabasePool, env: AppEnv) -> Result<MigrationReport, RepoError> {
    let dropped = if env.is_development() {
        tracing::info!("Development mode: dropping existing tables");
        drop_all(pool).await?
    } else {
        Vec::new()
    };

    let mut report = create_or_update(pool).await?;
    report.dropped = dropped;

    tracing::info!(
        dropped = report.dropped.len(),
        created = report.created.len(),
        added_columns = report.added_columns.len(),
        "Database migration completed"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_postgres_test_pool, create_test_pool};
    use sqlx::Row;

    async fn count_rows(pool: &DynDatabasePool, table: &str) -> i64 {
        let sql = format!("SELECT COUNT(*) FROM {}", table);
        with_pool!(pool, p => sqlx::query_scalar(&sql).fetch_one(p).await)
            .expect("Failed to count rows")
    }

    async fn insert_user(pool: &DynDatabasePool, email: &str) -> uuid::Uuid {
        let id = uuid::Uuid::new_v4();
        let now = chrono::Utc::now();
        let sql = "INSERT INTO users (id, name, email, password, avatar, created_at, updated_at) \
                   VALUES ($1, $2, $3, $4, $5, $6, $7)";
        with_pool!(pool, p => {
            sqlx::query(sql)
                .bind(id)
                .bind("Test User")
                .bind(email)
                .bind("secret")
                .bind("")
                .bind(now)
                .bind(now)
                .execute(p)
                .await
                .map(|_| ())
        })
        .expect("Failed to insert user");
        id
    }

    #[test]
    fn test_five_tables_defined() {
        assert_eq!(
            table_names(),
            vec!["users", "tags", "articles", "comments", "article_tags"]
        );
    }

    #[test]
    fn test_render_create_table_postgres() {
        let sql = render_create_table(&TABLES[0], DatabaseDriver::Postgres);
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS users"));
        assert!(sql.contains("id UUID NOT NULL"));
        assert!(sql.contains("email VARCHAR(100) NOT NULL UNIQUE"));
        assert!(sql.contains("created_at TIMESTAMPTZ NOT NULL"));
        assert!(sql.contains("PRIMARY KEY (id)"));
    }

    #[test]
    fn test_render_join_table() {
        let sql = render_create_table(&TABLES[4], DatabaseDriver::Sqlite);
        assert!(sql.contains("PRIMARY KEY (article_id, tag_id)"));
        assert!(sql.contains("FOREIGN KEY (article_id) REFERENCES articles(id) ON DELETE CASCADE"));
        assert!(sql.contains("FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE"));
    }

    #[test]
    fn test_render_drop_is_tolerant() {
        assert_eq!(
            render_drop_table(&TABLES[0], DatabaseDriver::Postgres),
            "DROP TABLE IF EXISTS users CASCADE"
        );
        assert_eq!(
            render_drop_table(&TABLES[0], DatabaseDriver::Sqlite),
            "DROP TABLE IF EXISTS users"
        );
    }

    #[tokio::test]
    async fn test_migrate_creates_all_tables() {
        let pool = create_test_pool().await.expect("Failed to create test pool");

        let report = migrate(&pool, AppEnv::Production).await.expect("Failed to migrate");
        assert_eq!(report.created.len(), 5);
        assert!(report.dropped.is_empty());

        let tables = existing_tables(&pool).await.expect("Failed to list tables");
        assert_eq!(tables, table_names());
    }

    #[tokio::test]
    async fn test_development_migrate_twice_is_idempotent() {
        let pool = create_test_pool().await.expect("Failed to create test pool");

        migrate(&pool, AppEnv::Development).await.expect("First migration failed");
        insert_user(&pool, "dev@example.com").await;

        let report = migrate(&pool, AppEnv::Development).await.expect("Second migration failed");
        assert_eq!(report.dropped.len(), 5);
        assert_eq!(report.created.len(), 5);

        let tables = existing_tables(&pool).await.expect("Failed to list tables");
        assert_eq!(tables, table_names());

        let sqlite_pool = pool.as_sqlite().unwrap();
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN \
             ('users', 'tags', 'articles', 'comments', 'article_tags')",
        )
        .fetch_one(sqlite_pool)
        .await
        .expect("Failed to count tables");
        assert_eq!(total, 5);

        // Development mode starts from empty tables
        assert_eq!(count_rows(&pool, "users").await, 0);
    }

    #[tokio::test]
    async fn test_development_migrate_on_empty_database() {
        let pool = create_test_pool().await.expect("Failed to create test pool");

        let report = migrate(&pool, AppEnv::Development).await.expect("Failed to migrate");
        assert_eq!(report.dropped.len(), 5);
        assert_eq!(existing_tables(&pool).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_production_migrate_keeps_rows() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrate(&pool, AppEnv::Production).await.expect("Failed to migrate");

        insert_user(&pool, "a@example.com").await;
        insert_user(&pool, "b@example.com").await;
        assert_eq!(count_rows(&pool, "users").await, 2);

        let report = migrate(&pool, AppEnv::Production).await.expect("Failed to re-migrate");
        assert!(report.dropped.is_empty());
        assert!(report.created.is_empty());
        assert!(report.added_columns.is_empty());

        assert_eq!(count_rows(&pool, "users").await, 2);
        assert_eq!(existing_tables(&pool).await.unwrap(), table_names());
    }

    #[tokio::test]
    async fn test_production_migrate_adds_missing_columns() {
        let pool = create_test_pool().await.expect("Failed to create test pool");

        // An older tags table without the soft-delete column
        pool.execute(
            "CREATE TABLE tags (id BLOB NOT NULL PRIMARY KEY, name VARCHAR(50) NOT NULL UNIQUE, \
             created_at TIMESTAMP NOT NULL, updated_at TIMESTAMP NOT NULL)",
        )
        .await
        .expect("Failed to create legacy table");

        let now = chrono::Utc::now();
        sqlx::query("INSERT INTO tags (id, name, created_at, updated_at) VALUES ($1, $2, $3, $4)")
            .bind(uuid::Uuid::new_v4())
            .bind("rust")
            .bind(now)
            .bind(now)
            .execute(pool.as_sqlite().unwrap())
            .await
            .expect("Failed to insert legacy tag");

        let report = migrate(&pool, AppEnv::Production).await.expect("Failed to migrate");
        assert_eq!(report.added_columns, vec!["tags.deleted_at".to_string()]);
        assert!(!report.created.contains(&"tags"));
        assert_eq!(count_rows(&pool, "tags").await, 1);
    }

    #[tokio::test]
    async fn test_foreign_key_constraints() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrate(&pool, AppEnv::Production).await.expect("Failed to migrate");

        let now = chrono::Utc::now();
        let result = sqlx::query(
            "INSERT INTO articles (id, title, content, excerpt, slug, author_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(uuid::Uuid::new_v4())
        .bind("Orphan")
        .bind("Content")
        .bind("")
        .bind("orphan")
        .bind(uuid::Uuid::new_v4()) // Non-existent author
        .bind(now)
        .bind(now)
        .execute(pool.as_sqlite().unwrap())
        .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_unique_constraints() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrate(&pool, AppEnv::Production).await.expect("Failed to migrate");

        insert_user(&pool, "dup@example.com").await;

        let now = chrono::Utc::now();
        let result = sqlx::query(
            "INSERT INTO users (id, name, email, password, avatar, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(uuid::Uuid::new_v4())
        .bind("Other")
        .bind("dup@example.com")
        .bind("secret")
        .bind("")
        .bind(now)
        .bind(now)
        .execute(pool.as_sqlite().unwrap())
        .await
        .map_err(RepoError::from);

        assert!(matches!(result, Err(RepoError::Conflict { .. })));
    }

    #[tokio::test]
    #[ignore = "Requires PostgreSQL server"]
    async fn test_postgres_development_migrate_twice() {
        let pool = create_postgres_test_pool().await;

        migrate(&pool, AppEnv::Development).await.expect("First migration failed");
        insert_user(&pool, "dev@example.com").await;

        let report = migrate(&pool, AppEnv::Development).await.expect("Second migration failed");
        assert_eq!(report.dropped.len(), 5);
        assert_eq!(report.created.len(), 5);
        assert_eq!(existing_tables(&pool).await.unwrap(), table_names());
        assert_eq!(count_rows(&pool, "users").await, 0);
    }

    #[tokio::test]
    #[ignore = "Requires PostgreSQL server"]
    async fn test_postgres_production_migrate_keeps_rows() {
        let pool = create_postgres_test_pool().await;
        migrate(&pool, AppEnv::Development).await.expect("Failed to reset schema");

        insert_user(&pool, "a@example.com").await;
        insert_user(&pool, "b@example.com").await;

        let report = migrate(&pool, AppEnv::Production).await.expect("Failed to re-migrate");
        assert!(report.dropped.is_empty());
        assert!(report.created.is_empty());
        assert!(report.added_columns.is_empty());
        assert_eq!(count_rows(&pool, "users").await, 2);
    }
}
