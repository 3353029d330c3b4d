//! Shared type definitions for the Geomark workspace.
//!
//! This crate is the single source of truth for the marker data model used
//! by the store, the query service, and the simulator. The wire types are
//! exported to `TypeScript` via `ts-rs` for the map front end.
//!
//! # Modules
//!
//! - [`ids`] -- Opaque marker ids and the [`IdSource`] capability
//! - [`structs`] -- [`Marker`], [`Coordinates`], [`Rect`], and [`Geofence`]

pub mod ids;
pub mod structs;

pub use ids::{IdSource, MarkerId, SequentialIdSource, UuidIdSource};
pub use structs::{Coordinates, Geofence, GeofenceError, GeofenceSpec, Marker, Rect, RectError};
