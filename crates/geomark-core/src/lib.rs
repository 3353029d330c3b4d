//! Configuration, random walk, and simulation engine for Geomark.
//!
//! The load generator seeds a population of markers inside a geofence and
//! then keeps every marker moving with a center-seeking random walk,
//! pushing each new position to the marker store under a concurrency
//! throttle.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `geomark-config.yaml` into
//!   strongly-typed structs.
//! - [`control`] -- Stop, pause, and pacing state shared with the run loop.
//! - [`population`] -- Initial population generator, name roster, and the
//!   simulator's working set.
//! - [`simulation`] -- [`SimulationEngine`] sweep and run loop.
//! - [`sink`] -- [`MarkerSink`] trait and retry policy.
//! - [`walk`] -- The per-marker random-walk step.
//!
//! [`SimulationEngine`]: simulation::SimulationEngine
//! [`MarkerSink`]: sink::MarkerSink

pub mod config;
pub mod control;
pub mod population;
pub mod simulation;
pub mod sink;
pub mod walk;
