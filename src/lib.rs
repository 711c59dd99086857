#![cfg_attr(not(test), deny(clippy::panic))]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::struct_excessive_bools,
    clippy::too_many_arguments,
    clippy::too_many_lines,
    clippy::similar_names
)]

//! # Quiz Raid Server
//!
//! A server-authoritative WebSocket coordinator for cooperative boss-battle
//! quiz games: players in a room answer trivia under a shared countdown,
//! correct answers damage the boss, wrong answers cost lives, and knocked-out
//! players come back through teammate revival codes.
//!
//! Everything is in-memory: no database, no cloud services. Run the binary
//! and connect via WebSocket at `/game/{room_id}`.

/// Pre-serialized broadcast frames and fan-out targets
pub mod broadcast;

/// Server configuration and environment variables
pub mod config;

/// Outbound connection capability used by game logic
pub mod connection;

/// Battle state: rooms, players, teams, content sourcing
pub mod game;

/// Structured logging configuration
pub mod logging;

/// WebSocket message protocol definitions
pub mod protocol;

/// Main server orchestration
pub mod server;

/// WebSocket connection handling
pub mod websocket;
