//! Configuration module for Quiz Raid.
//!
//! This module provides configuration management with support for:
//! - JSON configuration files
//! - Environment variable overrides
//! - Stdin input
//! - Sensible defaults
//!
//! # Module Structure
//!
//! - [`crate::config::types`]: Root `Config` struct
//! - [`server`]: Server behavior configuration (bind address, connection caps)
//! - [`game`]: Battle tuning (boss health, lives, countdown, teams, revives)
//! - [`rooms`]: Room lifecycle timeouts and cleanup cadence
//! - [`content`]: External content source settings (bosses, question pools)
//! - [`protocol`]: Protocol field limits
//! - [`logging`]: Logging configuration
//! - [`websocket`]: WebSocket connection settings
//! - [`crate::config::loader`]: Configuration loading functions
//! - [`crate::config::validation`]: Configuration validation functions
//! - [`crate::config::defaults`]: Default value functions

// Submodules
pub mod content;
pub mod defaults;
pub mod game;
pub mod loader;
pub mod logging;
pub mod protocol;
pub mod rooms;
pub mod server;
pub mod types;
pub mod validation;
pub mod websocket;

// Re-exports for convenience
pub use content::ContentConfig;

pub use game::GameConfig;

pub use loader::load;

pub use logging::{LogFormat, LogLevel, LoggingConfig};

pub use protocol::ProtocolConfig;

pub use rooms::RoomConfig;

pub use server::ServerConfig;

pub use types::Config;

pub use validation::validate_config;

pub use websocket::WebSocketConfig;
