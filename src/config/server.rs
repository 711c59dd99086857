//! Server behavior configuration types.

use super::defaults::{
    default_cors_origins, default_host, default_max_connections_per_ip, default_max_message_size,
};
use serde::{Deserialize, Serialize};

/// Server configuration for the listener and connection limits.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Bind address for the listener
    #[serde(default = "default_host")]
    pub host: String,
    /// Maximum concurrent WebSocket connections per client IP
    #[serde(default = "default_max_connections_per_ip")]
    pub max_connections_per_ip: usize,
    /// Maximum inbound frame size in bytes; larger frames are rejected
    /// before parsing
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    /// Comma-separated list of allowed CORS origins, or `*` for any
    #[serde(default = "default_cors_origins")]
    pub cors_allowed_origins: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            max_connections_per_ip: default_max_connections_per_ip(),
            max_message_size: default_max_message_size(),
            cors_allowed_origins: default_cors_origins(),
        }
    }
}
