//! Data layer for Geomark: spatial index backends and the marker store.
//!
//! # Architecture
//!
//! ```text
//! MarkerStore (id assignment, validation, query limit)
//!     |
//!     +-- MarkerIndex::Memory ----> MemoryIndex    (in-process, BTreeSet by x)
//!     |
//!     +-- MarkerIndex::Dragonfly -> DragonflyIndex (hash + sorted set by x)
//! ```
//!
//! # Modules
//!
//! - [`store`] -- [`MarkerStore`]: put, query, reset
//! - [`index`] -- [`MarkerIndex`] backend dispatch
//! - [`memory`] -- In-process index
//! - [`dragonfly`] -- `Dragonfly` (Redis-compatible) index
//! - [`error`] -- Shared error types

pub mod dragonfly;
pub mod error;
pub mod index;
pub mod memory;
pub mod store;

// Re-export primary types for convenience.
pub use dragonfly::{DragonflyConfig, DragonflyIndex};
pub use error::DbError;
pub use index::MarkerIndex;
pub use memory::MemoryIndex;
pub use store::{DEFAULT_QUERY_LIMIT, MarkerStore};
