//! Default value functions for configuration fields.
//!
//! This module contains all the default value functions used by serde's
//! `#[serde(default = ...)]` attributes throughout the configuration system.
//! Functions are organized by section for easier maintenance.

use super::logging::LogFormat;

// =============================================================================
// Port & Root Config
// =============================================================================

pub const fn default_port() -> u16 {
    4800
}

// =============================================================================
// Server Defaults
// =============================================================================

pub fn default_host() -> String {
    "0.0.0.0".to_string()
}

pub const fn default_max_connections_per_ip() -> usize {
    10
}

pub const fn default_max_message_size() -> usize {
    65536 // 64KB
}

pub fn default_cors_origins() -> String {
    "*".to_string()
}

// =============================================================================
// Game Defaults
// =============================================================================

pub const fn default_base_boss_health() -> f64 {
    30.0
}

pub const fn default_health_per_player() -> f64 {
    5.0
}

pub const fn default_min_players_to_start() -> usize {
    2
}

pub const fn default_question_time_limit_secs() -> u32 {
    30
}

pub const fn default_starting_lives() -> u8 {
    3
}

pub const fn default_max_members_per_team() -> usize {
    4
}

pub const fn default_max_revives_per_player() -> u32 {
    3
}

pub const fn default_revival_window_secs() -> u64 {
    60
}

// =============================================================================
// Room Lifecycle Defaults
// =============================================================================

pub const fn default_empty_room_timeout() -> u64 {
    300 // 5 minutes
}

pub const fn default_inactive_room_timeout() -> u64 {
    3600 // 1 hour
}

pub const fn default_cleanup_interval() -> u64 {
    60
}

pub const fn default_reconnect_grace_secs() -> u64 {
    60
}

// =============================================================================
// WebSocket Defaults
// =============================================================================

pub const fn default_outbound_queue_capacity() -> usize {
    64
}

/// Default threshold for heartbeat throttling (seconds).
/// Controls how frequently heartbeat timestamps are recorded.
pub const fn default_heartbeat_throttle_secs() -> u64 {
    30
}

// =============================================================================
// Content Source Defaults
// =============================================================================

pub const fn default_content_timeout_secs() -> u64 {
    2
}

pub fn default_boss_id() -> String {
    "crystal-golem".to_string()
}

pub fn default_category_id() -> String {
    "general".to_string()
}

// =============================================================================
// Protocol Defaults
// =============================================================================

pub const fn default_max_player_id_length() -> usize {
    64
}

pub const fn default_max_room_id_length() -> usize {
    64
}

pub const fn default_max_player_name_length() -> usize {
    32
}

pub const fn default_max_answer_length() -> usize {
    256
}

pub const fn default_revival_code_length() -> usize {
    6
}

// =============================================================================
// Logging Defaults
// =============================================================================

pub fn default_log_dir() -> String {
    "logs".to_string()
}

pub fn default_log_filename() -> String {
    "server.log".to_string()
}

pub fn default_rotation() -> String {
    "daily".to_string()
}

pub const fn default_enable_file_logging() -> bool {
    true
}

pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}
