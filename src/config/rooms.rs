//! Room lifecycle configuration types.

use super::defaults::{
    default_cleanup_interval, default_empty_room_timeout, default_inactive_room_timeout,
    default_reconnect_grace_secs,
};
use serde::{Deserialize, Serialize};

/// Timeouts driving the maintenance sweep.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RoomConfig {
    /// Time after creation when empty rooms expire (seconds)
    #[serde(default = "default_empty_room_timeout")]
    pub empty_room_timeout: u64,
    /// Time after last activity when rooms with players expire (seconds)
    #[serde(default = "default_inactive_room_timeout")]
    pub inactive_room_timeout: u64,
    /// Interval for the maintenance sweep task (seconds)
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval: u64,
    /// Window after a disconnect during which the player's state is retained
    /// awaiting a reconnect; afterwards a leave is synthesized (seconds)
    #[serde(default = "default_reconnect_grace_secs")]
    pub reconnect_grace_secs: u64,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            empty_room_timeout: default_empty_room_timeout(),
            inactive_room_timeout: default_inactive_room_timeout(),
            cleanup_interval: default_cleanup_interval(),
            reconnect_grace_secs: default_reconnect_grace_secs(),
        }
    }
}
