//! Load generator binary for Geomark.
//!
//! Seeds a population of markers through the query service and then
//! random-walks every marker, one sweep after another, until `Ctrl-C` or a
//! configured limit.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `geomark-config.yaml` (or `GEOMARK_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Build the HTTP sink for the query service
//! 4. Reset the store so the run starts from a clean population
//! 5. Seed `population` markers
//! 6. Run sweeps until stopped, then log the result

mod error;
mod http_sink;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use geomark_core::config::{self, GeomarkConfig, LoggingConfig};
use geomark_core::control::SimulationControl;
use geomark_core::population::Roster;
use geomark_core::simulation::{self, SimulationEngine};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::SimError;
use crate::http_sink::HttpSink;

/// Application entry point for the load generator.
///
/// # Errors
///
/// Returns an error if configuration fails, the startup reset or seeding
/// fails, or a sweep gives up on a marker.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = config::config_path();
    let config = load_config(&config_path)?;
    init_logging(&config.logging);
    log_config_source(&config_path);

    let sim = &config.simulation;
    info!(
        service_url = sim.service_url,
        population = sim.population,
        step = sim.step,
        concurrency = sim.concurrency,
        seed = ?sim.seed,
        "geomark-sim starting"
    );

    let sink = HttpSink::new(&sim.service_url, Duration::from_millis(sim.request_timeout_ms))
        .map_err(SimError::from)?;
    info!(service_url = sink.base_url(), "Query service sink ready");
    let roster = Roster::new(sim.names.iter().cloned()).map_err(SimError::from)?;
    let mut engine = SimulationEngine::new(Arc::new(sink), sim).map_err(SimError::from)?;

    let control = Arc::new(SimulationControl::new(
        sim.pause_ms,
        sim.max_iterations,
        sim.max_real_time_seconds,
    ));
    spawn_stop_on_ctrl_c(Arc::clone(&control));

    engine.reset_store().await.map_err(SimError::from)?;
    let mut working_set = engine
        .populate(sim.population, &roster)
        .await
        .map_err(SimError::from)?;

    let result = engine
        .run(&mut working_set, &control)
        .await
        .map_err(SimError::from)?;
    simulation::log_simulation_end(&result);

    Ok(())
}

/// Load configuration from the configured path, or defaults plus
/// environment overrides if the file is absent.
fn load_config(path: &Path) -> Result<GeomarkConfig, SimError> {
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

/// Request a clean stop on the first `Ctrl-C`. In-flight puts finish
/// before the run loop returns.
fn spawn_stop_on_ctrl_c(control: Arc<SimulationControl>) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received, stopping after in-flight puts");
                control.request_stop();
            }
            Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C"),
        }
    });
}
