//! Protocol configuration types: wire-level validation limits.

use super::defaults::{
    default_max_answer_length, default_max_player_id_length, default_max_player_name_length,
    default_max_room_id_length, default_revival_code_length,
};
use serde::{Deserialize, Serialize};

/// Protocol configuration.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProtocolConfig {
    /// Maximum length for client-chosen player ids
    #[serde(default = "default_max_player_id_length")]
    pub max_player_id_length: usize,
    /// Maximum length for room ids taken from the connection path
    #[serde(default = "default_max_room_id_length")]
    pub max_room_id_length: usize,
    /// Maximum length for display names
    #[serde(default = "default_max_player_name_length")]
    pub max_player_name_length: usize,
    /// Maximum length for submitted answer text and question options
    #[serde(default = "default_max_answer_length")]
    pub max_answer_length: usize,
    /// Length of generated revival codes
    #[serde(default = "default_revival_code_length")]
    pub revival_code_length: usize,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            max_player_id_length: default_max_player_id_length(),
            max_room_id_length: default_max_room_id_length(),
            max_player_name_length: default_max_player_name_length(),
            max_answer_length: default_max_answer_length(),
            revival_code_length: default_revival_code_length(),
        }
    }
}
