use crate::config::ProtocolConfig;

use super::types::Question;

/// Shared identifier rule: player and room ids travel in URLs and logs, so
/// they are restricted to ASCII alphanumerics plus `-` and `_`.
fn validate_identifier(value: &str, what: &str, max_length: usize) -> Result<(), String> {
    if value.is_empty() {
        return Err(format!("{what} cannot be empty"));
    }
    if value.len() > max_length {
        return Err(format!("{what} too long (max {max_length} characters)"));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(format!("{what} contains invalid characters"));
    }
    Ok(())
}

pub fn validate_player_id_with_config(id: &str, config: &ProtocolConfig) -> Result<(), String> {
    validate_identifier(id, "Player id", config.max_player_id_length)
}

pub fn validate_room_id_with_config(id: &str, config: &ProtocolConfig) -> Result<(), String> {
    validate_identifier(id, "Room id", config.max_room_id_length)
}

pub fn validate_player_name_with_config(name: &str, config: &ProtocolConfig) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Player name cannot be blank".to_string());
    }
    if name.len() > config.max_player_name_length {
        return Err(format!(
            "Player name too long (max {} characters)",
            config.max_player_name_length
        ));
    }
    if name.trim().len() != name.len() {
        return Err("Player name cannot have leading or trailing whitespace".to_string());
    }
    for ch in name.chars() {
        if ch.is_alphanumeric() || ch == ' ' || ch == '-' || ch == '_' || ch == '.' {
            continue;
        }
        return Err("Player name contains invalid characters".to_string());
    }
    Ok(())
}

pub fn validate_answer_text_with_config(answer: &str, config: &ProtocolConfig) -> Result<(), String> {
    if answer.trim().is_empty() {
        return Err("Answer cannot be empty".to_string());
    }
    if answer.len() > config.max_answer_length {
        return Err(format!(
            "Answer too long (max {} characters)",
            config.max_answer_length
        ));
    }
    Ok(())
}

/// Basic sanity for client-reported damage. Anything non-finite or
/// non-positive is rejected before it reaches the room.
pub fn validate_damage_amount(damage: f64) -> Result<(), String> {
    if !damage.is_finite() {
        return Err("Damage must be a finite number".to_string());
    }
    if damage <= 0.0 {
        return Err("Damage must be positive".to_string());
    }
    Ok(())
}

/// Feeder-path questions are appended to the shared pool, so they get the
/// same scrutiny as content-source questions.
pub fn validate_question_with_config(
    question: &Question,
    config: &ProtocolConfig,
) -> Result<(), String> {
    if question.id.trim().is_empty() {
        return Err("Question id cannot be empty".to_string());
    }
    if question.text.trim().is_empty() {
        return Err("Question text cannot be empty".to_string());
    }
    if question.correct_answer.trim().is_empty() {
        return Err("Question must carry a correct answer".to_string());
    }
    if !(5..=300).contains(&question.time_limit_seconds) {
        return Err("Question time limit must be between 5 and 300 seconds".to_string());
    }
    if question.options.len() > 16 {
        return Err("Question cannot have more than 16 options".to_string());
    }
    for option in &question.options {
        if option.len() > config.max_answer_length {
            return Err(format!(
                "Question option too long (max {} characters)",
                config.max_answer_length
            ));
        }
    }
    Ok(())
}

// Legacy validation functions using default limits for call sites without
// a config handle.
#[allow(dead_code)]
pub fn validate_player_id(id: &str) -> Result<(), &'static str> {
    let cfg = ProtocolConfig::default();
    match validate_player_id_with_config(id, &cfg) {
        Ok(()) => Ok(()),
        Err(_) => Err("Invalid player id"),
    }
}

#[allow(dead_code)]
pub fn validate_room_id(id: &str) -> Result<(), &'static str> {
    let cfg = ProtocolConfig::default();
    match validate_room_id_with_config(id, &cfg) {
        Ok(()) => Ok(()),
        Err(_) => Err("Invalid room id"),
    }
}

#[allow(dead_code)]
pub fn validate_player_name(name: &str) -> Result<(), &'static str> {
    let cfg = ProtocolConfig::default();
    match validate_player_name_with_config(name, &cfg) {
        Ok(()) => Ok(()),
        Err(_) => Err("Invalid player name"),
    }
}
