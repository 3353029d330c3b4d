//! Error types for the query service binary.

/// Top-level error for the query service binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum ServerBinError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: geomark_core::config::ConfigError,
    },

    /// The spatial index could not be opened.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: geomark_db::DbError,
    },

    /// The HTTP server failed to bind or serve.
    #[error("server error: {source}")]
    Server {
        /// The underlying server error.
        #[from]
        source: geomark_service::ServerError,
    },
}
