//! s-blog - blog backend server

use anyhow::{Context, Result};

use s_blog::{
    api::{self, AppState},
    config::Config,
    db::{self, migrations},
    logging,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Optional .env, real environment variables win
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("Failed to load configuration")?;

    logging::init_tracing(&config.log).context("Failed to initialize tracing")?;
    tracing::info!(app_env = ?config.app_env, "Starting s-blog...");

    if let Err(e) = run(config).await {
        tracing::error!(error = ?e, "Fatal error");
        return Err(e);
    }
    Ok(())
}

async fn run(config: Config) -> Result<()> {
    // Initialize database
    let pool = db::create_pool(&config.database)
        .await
        .context("Failed to connect to database")?;
    tracing::info!(address = ?config.database.address(), "Database connected");

    // Run migrations
    let report = migrations::migrate(&pool, config.app_env)
        .await
        .context("Failed to migrate database")?;
    tracing::info!(created = ?report.created, dropped = ?report.dropped, "Database migrations completed");

    // Build router
    let state = AppState::new(pool.clone());
    let app = api::build_router(state, &config.server.cors_origins);

    // Start server
    let addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Server listening on http://{}", addr);

    api::serve(listener, app, api::HEADER_READ_TIMEOUT, shutdown_signal())
        .await
        .context("Server error")?;

    pool.close().await;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
