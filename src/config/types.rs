//! Root configuration types.

use super::content::ContentConfig;
use super::defaults::default_port;
use super::game::GameConfig;
use super::logging::LoggingConfig;
use super::protocol::ProtocolConfig;
use super::rooms::RoomConfig;
use super::server::ServerConfig;
use super::websocket::WebSocketConfig;
use serde::{Deserialize, Serialize};

/// Root configuration struct for the quiz raid server.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub rooms: RoomConfig,
    #[serde(default)]
    pub websocket: WebSocketConfig,
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub protocol: ProtocolConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            server: ServerConfig::default(),
            game: GameConfig::default(),
            rooms: RoomConfig::default(),
            websocket: WebSocketConfig::default(),
            content: ContentConfig::default(),
            protocol: ProtocolConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
