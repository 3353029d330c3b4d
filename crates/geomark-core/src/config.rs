//! Configuration loading and typed config structures.
//!
//! The canonical configuration lives in `geomark-config.yaml` next to the
//! binaries. This module defines strongly-typed structs that mirror the
//! YAML structure and a loader that reads and validates the file. Every
//! field has a default, so an empty file (or no file) is a valid config.

use std::path::{Path, PathBuf};

use geomark_types::Geofence;
use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// An environment override could not be applied.
    #[error("invalid value for {var}: {message}")]
    Env {
        /// The offending variable.
        var: &'static str,
        /// What was wrong with it.
        message: String,
    },

    /// The configuration parsed but is not usable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Configuration file read when `GEOMARK_CONFIG` is unset.
pub const DEFAULT_CONFIG_FILE: &str = "geomark-config.yaml";

/// Path of the configuration file: `GEOMARK_CONFIG` if set, otherwise
/// [`DEFAULT_CONFIG_FILE`] in the working directory.
pub fn config_path() -> PathBuf {
    std::env::var_os("GEOMARK_CONFIG").map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from)
}

/// Top-level Geomark configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GeomarkConfig {
    /// Spatial index backend and connection settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Query service listen address and limits.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Load generator parameters.
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl GeomarkConfig {
    /// Load configuration from a YAML file, then apply environment
    /// overrides and validate.
    ///
    /// Environment variables:
    /// - `GEOMARK_STORE_URL` overrides `store.url`
    /// - `GEOMARK_STORE_USERNAME` overrides `store.username`
    /// - `GEOMARK_STORE_PASSWORD` overrides `store.password`
    /// - `GEOMARK_SERVICE_URL` overrides `simulation.service_url`
    /// - `GEOMARK_LISTEN_PORT` overrides `service.port`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, an
    /// override is malformed, or validation fails.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Built-in defaults with environment overrides applied, for when no
    /// configuration file exists.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an override is malformed or the result
    /// fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string. No environment overrides
    /// are applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML for
    /// this schema.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Apply overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Env`] if `GEOMARK_LISTEN_PORT` is not a port.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|var| std::env::var(var).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Env`] if `GEOMARK_LISTEN_PORT` is not a port.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(val) = lookup("GEOMARK_STORE_URL") {
            self.store.url = val;
        }
        if let Some(val) = lookup("GEOMARK_STORE_USERNAME") {
            self.store.username = Some(val);
        }
        if let Some(val) = lookup("GEOMARK_STORE_PASSWORD") {
            self.store.password = Some(val);
        }
        if let Some(val) = lookup("GEOMARK_SERVICE_URL") {
            self.simulation.service_url = val;
        }
        if let Some(val) = lookup("GEOMARK_LISTEN_PORT") {
            self.service.port = val.parse().map_err(|e| ConfigError::Env {
                var: "GEOMARK_LISTEN_PORT",
                message: format!("{val:?}: {e}"),
            })?;
        }
        Ok(())
    }

    /// Check cross-field constraints that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sim = &self.simulation;
        if !(sim.step.is_finite() && sim.step > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "simulation.step must be a positive number, got {}",
                sim.step
            )));
        }
        if sim.concurrency == 0 {
            return Err(ConfigError::Invalid(String::from(
                "simulation.concurrency must be at least 1",
            )));
        }
        if sim.names.iter().all(String::is_empty) {
            return Err(ConfigError::Invalid(String::from(
                "simulation.names must contain at least one non-empty name",
            )));
        }
        if self.service.query_limit == 0 {
            return Err(ConfigError::Invalid(String::from(
                "service.query_limit must be at least 1",
            )));
        }
        Ok(())
    }
}

/// Which spatial index backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// In-process index; contents are lost on restart.
    #[default]
    Memory,
    /// `Dragonfly` (Redis-compatible) index.
    Dragonfly,
}

/// Spatial index backend and connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoreConfig {
    /// Backend selection.
    #[serde(default)]
    pub backend: StoreBackend,

    /// Dragonfly (Redis-compatible) URL.
    #[serde(default = "default_store_url")]
    pub url: String,

    /// ACL user name for the store.
    #[serde(default)]
    pub username: Option<String>,

    /// Password for the store.
    #[serde(default)]
    pub password: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            url: default_store_url(),
            username: None,
            password: None,
        }
    }
}

/// Query service settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Maximum markers returned by one `/list` call.
    #[serde(default = "default_query_limit")]
    pub query_limit: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            query_limit: default_query_limit(),
        }
    }
}

/// Load generator parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Base URL of the query service the simulator pushes to.
    #[serde(default = "default_service_url")]
    pub service_url: String,

    /// Random seed; a fresh OS seed is used when absent.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Number of markers to seed.
    #[serde(default = "default_population")]
    pub population: usize,

    /// Random-walk step size per axis.
    #[serde(default = "default_step")]
    pub step: f64,

    /// Pause between sweeps in milliseconds.
    #[serde(default = "default_pause_ms")]
    pub pause_ms: u64,

    /// Maximum outstanding put tasks during a sweep.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Number of sweeps before stopping (0 = until stopped).
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u64,

    /// Wall-clock seconds before stopping (0 = unlimited).
    #[serde(default)]
    pub max_real_time_seconds: u64,

    /// Retries for a failed put before the sweep is aborted.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base backoff between retries; attempt `n` waits `n` times this.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Per-request timeout for the HTTP sink.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Area the markers walk in and the point they drift towards.
    #[serde(default)]
    pub geofence: Geofence,

    /// Display names drawn uniformly for seeded markers.
    #[serde(default = "default_names")]
    pub names: Vec<String>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            service_url: default_service_url(),
            seed: None,
            population: default_population(),
            step: default_step(),
            pause_ms: default_pause_ms(),
            concurrency: default_concurrency(),
            max_iterations: default_max_iterations(),
            max_real_time_seconds: 0,
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            geofence: Geofence::default(),
            names: default_names(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_store_url() -> String {
    "redis://127.0.0.1:6379".to_owned()
}

fn default_host() -> String {
    "127.0.0.1".to_owned()
}

const fn default_port() -> u16 {
    8080
}

const fn default_query_limit() -> usize {
    geomark_db::DEFAULT_QUERY_LIMIT
}

fn default_service_url() -> String {
    "http://127.0.0.1:8080".to_owned()
}

const fn default_population() -> usize {
    1000
}

const fn default_step() -> f64 {
    crate::walk::DEFAULT_STEP
}

const fn default_pause_ms() -> u64 {
    10
}

const fn default_concurrency() -> usize {
    1
}

const fn default_max_iterations() -> u64 {
    1_000_000
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_retry_backoff_ms() -> u64 {
    100
}

const fn default_request_timeout_ms() -> u64 {
    5000
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_names() -> Vec<String> {
    [
        "Боня", "Ася", "Алиса", "Багира", "Бусинка", "Аврора", "Муся", "Агния", "Ева", "Агата",
        "Василиса", "Соня", "Мурка", "Нюша", "Симка", "Дымка", "Масяня", "Даша", "Альфа",
        "Бэлла", "Амели", "Ириска", "Китти", "Айрис", "Барсик", "Кузя", "Персик", "Абрикос",
        "Тимоша", "Саймон", "Марсик", "Маркиз", "Дымок", "Симба", "Пушок", "Алмаз", "Кекс",
        "Макс", "Феликс", "Гарфилд", "Том", "Тишка", "Цезарь", "Васька", "Зевс", "Лео",
    ]
    .into_iter()
    .map(str::to_owned)
    .collect()
}
