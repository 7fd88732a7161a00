//! Shared application state for the solve server.

use ricrob::Dispatcher;

/// Shared state accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Runs every configured solver; one independent dispatch per request.
    pub dispatcher: Dispatcher,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }
}
