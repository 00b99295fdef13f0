//! Shared state for HTTP handlers.

use std::sync::Arc;

use binwatch_core::BinwatchService;

/// State cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    /// Service facade over the configured backends.
    pub service: Arc<BinwatchService>,
}

impl AppState {
    /// Wrap a service for use as router state.
    #[must_use]
    pub fn new(service: BinwatchService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}
