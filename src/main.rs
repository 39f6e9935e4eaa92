//! hookgate webhook ingestion gate.
//!
//! Main entry point for the hookgate server. Loads configuration, builds the
//! event store and secret cache, and serves until a shutdown signal.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use hookgate_api::{start_server, AppState, Config, Pipeline, StoreBackend};
use hookgate_core::{CachedSecrets, EventStore, InMemoryEventStore, PostgresEventStore};
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    init_tracing(&config)?;

    info!("Starting hookgate webhook ingestion gate");
    info!(
        store_backend = ?config.store_backend,
        database_url = %config.database_url_masked(),
        max_body_bytes = config.max_body_bytes,
        request_timeout_secs = config.request_timeout,
        "Configuration loaded"
    );

    let (store, pool) = build_store(&config).await?;

    // Secrets are loaded on the first request, not here, so a missing
    // variable surfaces as a 500 and a failing health check.
    let secrets = Arc::new(CachedSecrets::new(Arc::new(config.secret_provider())));
    let options = config.to_server_options();
    let pipeline = Pipeline::new(secrets, store).with_secret_timeout(options.request_timeout);

    let addr = config.parse_server_addr()?;
    start_server(AppState::new(pipeline), options, addr)
        .await
        .context("HTTP server failed")?;

    if let Some(pool) = pool {
        pool.close().await;
        info!("Database connections closed");
    }

    info!("hookgate shutdown complete");
    Ok(())
}

/// Initializes tracing with the configured filter.
fn init_tracing(config: &Config) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_new(&config.rust_log).context("Invalid RUST_LOG filter")?;

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
    Ok(())
}

async fn build_store(config: &Config) -> Result<(Arc<dyn EventStore>, Option<PgPool>)> {
    match config.store_backend {
        StoreBackend::Memory => {
            warn!("Using in-memory event store; events do not survive a restart");
            Ok((Arc::new(InMemoryEventStore::new()), None))
        },
        StoreBackend::Postgres => {
            let pool = create_database_pool(config).await?;
            info!("Database connection pool established");

            let store = PostgresEventStore::new(pool.clone());
            store.migrate().await.context("Failed to run database migrations")?;
            info!("Database migrations completed");

            Ok((Arc::new(store), Some(pool)))
        },
    }
}

/// Creates the database connection pool with retry logic.
async fn create_database_pool(config: &Config) -> Result<PgPool> {
    const MAX_RETRIES: u32 = 5;
    const RETRY_DELAY: Duration = Duration::from_secs(2);

    let mut retries = 0;

    loop {
        match PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connection_timeout))
            .connect(&config.database_url)
            .await
        {
            Ok(pool) => {
                sqlx::query("SELECT 1")
                    .execute(&pool)
                    .await
                    .context("Failed to verify database connection")?;

                return Ok(pool);
            },
            Err(e) if retries < MAX_RETRIES => {
                retries += 1;
                warn!(
                    attempt = retries,
                    max_retries = MAX_RETRIES,
                    error = %e,
                    "Database connection failed, retrying"
                );
                tokio::time::sleep(RETRY_DELAY).await;
            },
            Err(e) => {
                return Err(e).context("Failed to create database connection pool after retries");
            },
        }
    }
}
