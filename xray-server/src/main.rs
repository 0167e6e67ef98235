use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use xray_server::api::{self, AppState};
use xray_server::config::{Config, StoreBackend};
use xray_server::db;
use xray_server::repository::{MemoryTraceStore, PgTraceStore, TraceStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "xray_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting X-Ray server...");

    let config = Config::from_env()?;

    let store: Arc<dyn TraceStore> = match &config.store {
        StoreBackend::Postgres { database_url } => {
            tracing::info!("Connecting to database...");

            let pool = db::create_pool(
                database_url,
                config.db_max_connections,
                config.db_acquire_timeout,
            )
            .await
            .context("Failed to create database pool")?;

            tracing::info!("Database connection pool created");

            db::run_migrations(&pool)
                .await
                .context("Failed to run database migrations")?;

            Arc::new(PgTraceStore::new(pool))
        }
        StoreBackend::Memory => {
            tracing::warn!("DATABASE_URL not set, traces are kept in memory only");
            Arc::new(MemoryTraceStore::new())
        }
    };

    // Build router with all API endpoints
    let app = api::create_router(AppState::new(store), config.request_timeout);

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .await
        .context("Failed to start server")?;

    Ok(())
}
