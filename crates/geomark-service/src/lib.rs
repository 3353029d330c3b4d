//! Query service for the Geomark marker store.
//!
//! This crate exposes a [`MarkerStore`] over HTTP with JSON bodies:
//!
//! - **`POST /put`** upserts one marker and echoes the stored record
//! - **`GET /list?rect=[x0,y0,x1,y1]`** returns markers inside a rectangle
//! - **`POST /reset`** clears the store (used by the simulator at startup)
//! - **`GET /health`** reports liveness and the marker count
//!
//! Any failure, whether a malformed request or a store error, is answered
//! with `500` and the error text.
//!
//! [`MarkerStore`]: geomark_db::MarkerStore

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;

// Re-export primary types for convenience.
pub use error::ServiceError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use startup::{RunningService, spawn_service};
pub use state::AppState;
