// Ripple API server
// Decision: In-memory dev mode when DATABASE_URL is unset
// Decision: Aggregator is rebuilt at startup from the last hour of stored events

use anyhow::{Context, Result};
use ripple_api::{build_app, AppState, ServerConfig};
use ripple_core::SystemClock;
use ripple_storage::StorageBackend;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ripple_api=debug,ripple_core=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("ripple-api starting...");

    let config = ServerConfig::from_env();

    // Initialize storage
    let storage = match &config.database_url {
        Some(url) => {
            let storage = StorageBackend::postgres(url)
                .await
                .context("Failed to connect to database")?;
            tracing::info!("Connected to database");
            if config.run_migrations {
                storage.run_migrations().await?;
                tracing::info!("Migrations applied");
            }
            storage
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory storage (data is lost on restart)");
            StorageBackend::in_memory()
        }
    };

    tracing::info!(
        heartbeat_secs = config.live.heartbeat_interval.as_secs(),
        channel_capacity = config.live.channel_capacity,
        max_lag_strikes = config.live.max_lag_strikes,
        "Live stream configured"
    );

    let state = AppState::new(storage, config.live.clone(), Arc::new(SystemClock));

    // Rebuild sliding-window counts from stored events
    state
        .ingestion
        .warm_up()
        .await
        .context("Failed to warm up analytics")?;

    let sweeper = state
        .aggregator
        .clone()
        .spawn_sweeper(config.analytics_sweep_interval);

    if !config.api_prefix.is_empty() {
        tracing::info!(prefix = %config.api_prefix, "API prefix configured");
    }

    let cors_origins = config.cors_origins();
    if cors_origins.is_empty() {
        tracing::info!("CORS not configured (same-origin requests only)");
    } else {
        tracing::info!(origins = ?cors_origins, "CORS origins configured");
    }

    let app = build_app(state, &config.api_prefix, cors_origins);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .context("Failed to bind to address")?;
    tracing::info!("Listening on {}", config.bind_addr);

    let served = axum::serve(listener, app).await.context("Server error");
    sweeper.abort();
    served
}
