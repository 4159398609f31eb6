//! Standalone schema migration.
//!
//! Usage: `cargo run --bin migrate`
//!
//! Reads the same environment as the server, migrates the schema and exits.
//! With `APP_ENV=development` all tables are dropped first.

use anyhow::{Context, Result};

use s_blog::{
    config::Config,
    db::{self, migrations},
    logging,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("Failed to load configuration")?;
    logging::init_tracing(&config.log).context("Failed to initialize tracing")?;

    let pool = db::create_pool(&config.database)
        .await
        .context("Failed to connect to database")?;

    let report = migrations::migrate(&pool, config.app_env)
        .await
        .context("Failed to migrate database")?;

    let tables = migrations::existing_tables(&pool)
        .await
        .context("Failed to list tables")?;
    pool.close().await;

    tracing::info!(
        dropped = ?report.dropped,
        created = ?report.created,
        added_columns = ?report.added_columns,
        tables = ?tables,
        "Migration finished"
    );

    Ok(())
}
