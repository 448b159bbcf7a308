//! # Flood-aware least-risk route selection
//!
//! A routing provider supplies a few alternative paths per leg. This crate
//! orders the destinations, combines per-leg alternatives into whole-route
//! candidates and keeps the one with the lowest cost, where cost blends travel
//! time, distance and exposure to mapped flood extents.

pub mod api;
pub mod assembler;
pub mod config;
pub mod cost;
pub mod error;
pub mod flood;
pub mod geocode;
pub mod hazard;
pub mod model;
pub mod optimizer;
pub mod provider;
pub mod sequencer;

pub use error::{Error, Result};
pub use model::{GeoPoint, RouteCandidate, RouteSegment, RouteSummary, ScoredRoute};
pub use optimizer::Optimizer;
