//! Query service binary for Geomark.
//!
//! Loads configuration, opens the configured spatial index, and serves
//! the HTTP API until `Ctrl-C`.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `geomark-config.yaml` (or `GEOMARK_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Open the spatial index (in-memory or Dragonfly)
//! 4. Serve until `Ctrl-C`, then drain in-flight requests

mod error;

use std::path::Path;
use std::sync::Arc;

use geomark_core::config::{self, GeomarkConfig, LoggingConfig, StoreBackend, StoreConfig};
use geomark_db::{DragonflyConfig, MarkerIndex, MarkerStore};
use geomark_service::{AppState, ServerConfig};
use geomark_types::UuidIdSource;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::ServerBinError;

/// Application entry point for the query service.
///
/// # Errors
///
/// Returns an error if configuration, the index connection, or the
/// server fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = config::config_path();
    let config = load_config(&config_path)?;
    init_logging(&config.logging);
    log_config_source(&config_path);

    info!(
        backend = ?config.store.backend,
        host = config.service.host,
        port = config.service.port,
        query_limit = config.service.query_limit,
        "geomark-server starting"
    );

    let index = open_index(&config.store).await?;
    let store = MarkerStore::new(index, Arc::new(UuidIdSource))
        .with_query_limit(config.service.query_limit);
    let state = Arc::new(AppState::new(store));

    let server_config = ServerConfig {
        host: config.service.host.clone(),
        port: config.service.port,
    };
    geomark_service::start_server(&server_config, state, shutdown_signal())
        .await
        .map_err(ServerBinError::from)?;

    info!("geomark-server stopped");
    Ok(())
}

/// Load configuration from the configured path, or defaults plus
/// environment overrides if the file is absent.
fn load_config(path: &Path) -> Result<GeomarkConfig, ServerBinError> {
    if path.exists() {
        Ok(GeomarkConfig::from_file(path)?)
    } else {
        Ok(GeomarkConfig::from_env()?)
    }
}

fn log_config_source(path: &Path) {
    if path.exists() {
        info!(path = %path.display(), "Configuration loaded");
    } else {
        info!(path = %path.display(), "Config file not found, using defaults");
    }
}

fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    if logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

async fn open_index(store: &StoreConfig) -> Result<MarkerIndex, ServerBinError> {
    match store.backend {
        StoreBackend::Memory => {
            info!("Using in-memory spatial index");
            Ok(MarkerIndex::memory())
        }
        StoreBackend::Dragonfly => {
            let dragonfly = DragonflyConfig {
                url: store.url.clone(),
                username: store.username.clone(),
                password: store.password.clone(),
            };
            Ok(MarkerIndex::dragonfly(&dragonfly).await?)
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C; shutting down");
    }
    info!("Shutdown signal received");
}
