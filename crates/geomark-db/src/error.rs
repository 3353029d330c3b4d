//! Error types for the data layer.
//!
//! All storage failures are propagated via [`DbError`], which wraps the
//! underlying [`fred`] and [`serde_json`] errors and adds the validation
//! failures the store itself detects.

use geomark_types::{MarkerId, RectError};

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `Dragonfly`/Redis operation failed.
    #[error("Dragonfly error: {0}")]
    Dragonfly(#[from] fred::error::Error),

    /// A serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The marker cannot be stored as given.
    #[error("invalid marker {id}: {reason}")]
    InvalidMarker {
        /// Id of the rejected marker (empty if unassigned).
        id: MarkerId,
        /// What was wrong with it.
        reason: String,
    },

    /// The query rectangle is malformed.
    #[error("invalid rectangle: {0}")]
    InvalidRect(#[from] RectError),

    /// A record in the index could not be interpreted.
    #[error("corrupt index entry {key}: {reason}")]
    Corrupt {
        /// Key or field of the bad entry.
        key: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}
