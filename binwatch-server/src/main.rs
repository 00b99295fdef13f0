//! binwatch HTTP server: dashboard data, reading ingestion, and route planning.

use std::fs;
use std::future;
use std::sync::Arc;

use anyhow::{Context, Result};
use binwatch_core::{BinwatchService, InMemoryBinRepository};
use binwatch_provider_google::GoogleDirectionsPort;
use binwatch_server::{AppState, Config, build_router, cors, trace};
use dotenv::dotenv;
use reqwest::Client;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing `.env` file is fine, a broken one is not.
    if let Err(err) = dotenv()
        && !err.not_found()
    {
        return Err(err).context("failed to load .env");
    }

    let config = Config::from_env()?;
    trace::initialize_tracing(&config.log_level);

    // HTTP + service setup
    let client = Client::builder()
        .user_agent("binwatch/0.1")
        .timeout(config.directions_timeout)
        .build()?;

    let repository = match &config.bins_file {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            InMemoryBinRepository::from_json(&raw)?
        }
        None => {
            tracing::warn!("BINS_FILE not set, starting with no bins");
            InMemoryBinRepository::default()
        }
    };

    let directions = GoogleDirectionsPort::new(client, config.google_maps_api_key.clone());
    let service = BinwatchService::new(Arc::new(repository), Arc::new(directions));

    let app = build_router(AppState::new(service)).layer(cors(&config.allowed_origins));

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "Starting server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        // Keep serving; the process can still be killed.
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
