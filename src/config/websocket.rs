//! WebSocket configuration types.

use super::defaults::{default_heartbeat_throttle_secs, default_outbound_queue_capacity};
use serde::{Deserialize, Serialize};

/// WebSocket configuration.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WebSocketConfig {
    /// Capacity of each connection's outbound queue. When a client cannot
    /// keep up, frames beyond this are dropped rather than blocking the room.
    #[serde(default = "default_outbound_queue_capacity")]
    pub outbound_queue_capacity: usize,
    /// Threshold for heartbeat throttling (seconds).
    /// Controls how frequently heartbeat timestamps are recorded.
    /// Set to 0 to disable throttling (update on every heartbeat).
    #[serde(default = "default_heartbeat_throttle_secs")]
    pub heartbeat_throttle_secs: u64,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            outbound_queue_capacity: default_outbound_queue_capacity(),
            heartbeat_throttle_secs: default_heartbeat_throttle_secs(),
        }
    }
}

impl WebSocketConfig {
    /// Validate WebSocket configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.outbound_queue_capacity == 0 {
            anyhow::bail!("websocket.outbound_queue_capacity must be at least 1");
        }
        if self.outbound_queue_capacity > 65536 {
            anyhow::bail!(
                "websocket.outbound_queue_capacity must not exceed 65536 (configured: {})",
                self.outbound_queue_capacity
            );
        }
        if self.heartbeat_throttle_secs > 300 {
            anyhow::bail!(
                "websocket.heartbeat_throttle_secs must not exceed 300 seconds (configured: {})",
                self.heartbeat_throttle_secs
            );
        }
        Ok(())
    }
}
