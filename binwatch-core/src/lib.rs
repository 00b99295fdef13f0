//! Core types and service wiring for the binwatch waste bin monitor.

/// Fill-state derivation and the full-state transition.
pub mod fill;
/// In-memory implementation of the bin repository.
pub mod memory;
/// Domain models and identifiers.
pub mod model;
/// Collection route planning.
pub mod planner;
/// Traits describing storage, directions, and realtime backends.
pub mod ports;
/// High-level service facade used by clients.
pub mod service;

pub use fill::*;
pub use memory::*;
pub use model::*;
pub use planner::*;
pub use ports::*;
pub use service::*;
