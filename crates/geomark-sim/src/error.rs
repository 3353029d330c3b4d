//! Error types for the load generator binary.

/// Top-level error for the load generator.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: geomark_core::config::ConfigError,
    },

    /// The HTTP sink could not be built.
    #[error("sink error: {source}")]
    Sink {
        /// The underlying sink error.
        #[from]
        source: geomark_core::sink::SinkError,
    },

    /// Seeding or running the simulation failed.
    #[error("simulation error: {source}")]
    Simulation {
        /// The underlying simulation error.
        #[from]
        source: geomark_core::simulation::SimulationError,
    },
}
