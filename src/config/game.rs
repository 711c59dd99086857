//! Battle rule configuration types.

use super::defaults::{
    default_base_boss_health, default_health_per_player, default_max_members_per_team,
    default_max_revives_per_player, default_min_players_to_start, default_question_time_limit_secs,
    default_revival_window_secs, default_starting_lives,
};
use serde::{Deserialize, Serialize};

/// Rules governing a battle. A room captures a copy of this at creation, so
/// changing the configuration never alters battles already in flight.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GameConfig {
    /// Boss health before per-player scaling
    #[serde(default = "default_base_boss_health")]
    pub base_boss_health: f64,
    /// Extra boss health granted per joined player while Waiting
    #[serde(default = "default_health_per_player")]
    pub health_per_player: f64,
    /// Player count at which a Waiting room auto-starts
    #[serde(default = "default_min_players_to_start")]
    pub min_players_to_start: usize,
    /// Shared countdown length; also the damage-formula time limit
    #[serde(default = "default_question_time_limit_secs")]
    pub question_time_limit_secs: u32,
    /// Lives handed to a joining player; also the revive cap
    #[serde(default = "default_starting_lives")]
    pub starting_lives: u8,
    #[serde(default = "default_max_members_per_team")]
    pub max_members_per_team: usize,
    /// Teammate revives a player may receive before the quota is spent
    #[serde(default = "default_max_revives_per_player")]
    pub max_revives_per_player: u32,
    /// Seconds a knockout stays revivable before the countdown sweep
    /// resolves it
    #[serde(default = "default_revival_window_secs")]
    pub revival_window_secs: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            base_boss_health: default_base_boss_health(),
            health_per_player: default_health_per_player(),
            min_players_to_start: default_min_players_to_start(),
            question_time_limit_secs: default_question_time_limit_secs(),
            starting_lives: default_starting_lives(),
            max_members_per_team: default_max_members_per_team(),
            max_revives_per_player: default_max_revives_per_player(),
            revival_window_secs: default_revival_window_secs(),
        }
    }
}
