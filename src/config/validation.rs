//! Configuration validation functions.

use super::Config;

/// Validate the loaded configuration.
///
/// The loader calls this warn-only so a misconfigured field never prevents
/// startup with defaults; main calls it again and propagates the error when
/// the operator asked for `--validate-config`.
pub fn validate_config(config: &Config) -> anyhow::Result<()> {
    if config.port == 0 {
        anyhow::bail!("port must be non-zero");
    }

    let game = &config.game;
    if game.min_players_to_start == 0 {
        anyhow::bail!("game.min_players_to_start must be at least 1");
    }
    if !(5..=300).contains(&game.question_time_limit_secs) {
        anyhow::bail!(
            "game.question_time_limit_secs must be between 5 and 300 (configured: {})",
            game.question_time_limit_secs
        );
    }
    if !(1..=3).contains(&game.starting_lives) {
        anyhow::bail!(
            "game.starting_lives must be between 1 and 3 (configured: {})",
            game.starting_lives
        );
    }
    if game.max_members_per_team == 0 {
        anyhow::bail!("game.max_members_per_team must be at least 1");
    }
    if !game.base_boss_health.is_finite() || game.base_boss_health <= 0.0 {
        anyhow::bail!(
            "game.base_boss_health must be a positive number (configured: {})",
            game.base_boss_health
        );
    }
    if !game.health_per_player.is_finite() || game.health_per_player < 0.0 {
        anyhow::bail!(
            "game.health_per_player must be a non-negative number (configured: {})",
            game.health_per_player
        );
    }
    if game.revival_window_secs == 0 {
        anyhow::bail!("game.revival_window_secs must be at least 1");
    }

    let rooms = &config.rooms;
    if rooms.cleanup_interval == 0 {
        anyhow::bail!("rooms.cleanup_interval must be at least 1 second");
    }
    if rooms.empty_room_timeout == 0 || rooms.inactive_room_timeout == 0 {
        anyhow::bail!("rooms timeouts must be at least 1 second");
    }

    let server = &config.server;
    if server.max_connections_per_ip == 0 {
        anyhow::bail!("server.max_connections_per_ip must be at least 1");
    }
    if server.max_message_size < 1024 {
        anyhow::bail!(
            "server.max_message_size must be at least 1024 bytes (configured: {})",
            server.max_message_size
        );
    }

    let protocol = &config.protocol;
    if protocol.max_player_id_length == 0
        || protocol.max_room_id_length == 0
        || protocol.max_player_name_length == 0
        || protocol.max_answer_length == 0
    {
        anyhow::bail!("protocol length limits must be at least 1");
    }
    if !(4..=12).contains(&protocol.revival_code_length) {
        anyhow::bail!(
            "protocol.revival_code_length must be between 4 and 12 (configured: {})",
            protocol.revival_code_length
        );
    }

    if config.content.request_timeout_secs == 0 || config.content.request_timeout_secs > 30 {
        anyhow::bail!(
            "content.request_timeout_secs must be between 1 and 30 (configured: {})",
            config.content.request_timeout_secs
        );
    }

    config.websocket.validate()?;

    Ok(())
}
