//! Shared application state.

use std::{sync::Arc, time::Duration};

use tokio::sync::watch;

use crate::usecase::CollabService;

/// Per-connection transport settings
#[derive(Debug, Clone, Copy)]
pub struct TransportSettings {
    /// Capacity of each connection's outbound queue
    pub outbound_buffer: usize,
    /// Interval between server pings
    pub heartbeat_interval: Duration,
    /// A connection that sends nothing (pongs included) for this long is reaped
    pub idle_timeout: Duration,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            outbound_buffer: 256,
            heartbeat_interval: Duration::from_secs(15),
            idle_timeout: Duration::from_secs(45),
        }
    }
}

/// Shared application state
pub struct AppState {
    /// All use cases
    pub service: Arc<CollabService>,
    pub transport: TransportSettings,
    /// Flipped to `true` when the server starts shutting down
    pub shutdown: watch::Sender<bool>,
}
