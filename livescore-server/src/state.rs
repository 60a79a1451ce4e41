//! Application state shared across all request handlers.

use livescore_core::processors::Aggregator;
use std::sync::Arc;
use tokio::sync::watch;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    /// Aggregation pipeline over all configured sources.
    pub aggregator: Arc<Aggregator>,
    /// Flips to `true` when the server starts shutting down; live sessions
    /// stop on it.
    pub shutdown_rx: watch::Receiver<bool>,
}

impl AppState {
    pub fn new(aggregator: Arc<Aggregator>, shutdown_rx: watch::Receiver<bool>) -> Self {
        Self {
            aggregator,
            shutdown_rx,
        }
    }
}
