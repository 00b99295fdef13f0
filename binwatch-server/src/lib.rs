//! HTTP server for binwatch.
//!
//! # Endpoints
//!
//! - `GET /health` - liveness probe
//! - `GET /api/bins` - every bin with its current fill state
//! - `POST /api/bins/{id}/readings` - ingest a sensor reading
//! - `POST /api/route` - plan an optimized collection route
//! - `POST /api/realtime/token` - issue a realtime messaging token

/// Environment-driven configuration.
pub mod config;
/// API errors and their responses.
pub mod error;
/// Router and handlers.
pub mod routes;
/// Handler state.
pub mod state;
/// Log subscriber setup.
pub mod trace;

pub use config::{Config, ConfigError};
pub use routes::{build_router, cors};
pub use state::AppState;
