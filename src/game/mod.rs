// Game module: battle state machines and content sourcing

pub mod content;
pub mod player;
pub mod room;
pub mod team;

pub use content::{
    check_answer_locally, resolve_boss, resolve_questions, ContentError, ContentSource,
    FallbackContent,
};
pub use player::{Player, PlayerStats};
pub use room::{
    AnswerDisposition, AnswerOutcome, DamageOutcome, GameRoom, JoinOutcome, LeaveOutcome,
    ReviveOutcome, TickOutcome,
};
pub use team::Team;

use crate::protocol::{ErrorCode, PlayerId};

#[cfg(test)]
pub(crate) mod test_support {
    //! Room builders shared by server-layer tests.

    use std::collections::HashMap;
    use std::sync::Arc;

    use super::GameRoom;
    use crate::config::GameConfig;
    use crate::connection::RecordingConnection;
    use crate::protocol::{Boss, GameStatus, Question};

    pub fn sample_boss(base_health: f64) -> Boss {
        Boss {
            id: "boss-1".to_string(),
            name: "Crystal Golem".to_string(),
            base_health,
            category_id: None,
        }
    }

    pub fn sample_questions(count: usize) -> Vec<Question> {
        (1..=count)
            .map(|n| Question {
                id: format!("q{n}"),
                text: format!("question {n}"),
                time_limit_seconds: 30,
                options: vec!["alpha".to_string(), "beta".to_string()],
                correct_answer: "alpha".to_string(),
            })
            .collect()
    }

    pub fn waiting_room(room_id: &str) -> GameRoom {
        GameRoom::new(
            room_id.to_string(),
            sample_boss(30.0),
            sample_questions(6),
            GameConfig::default(),
        )
    }

    /// Builds a started room with the given players, each bound to a
    /// recording connection keyed by player id. Needs at least two players
    /// so the default start threshold is met.
    pub fn active_room_with_players(
        players: &[&str],
    ) -> (GameRoom, HashMap<String, Arc<RecordingConnection>>) {
        assert!(players.len() >= 2);
        let mut room = waiting_room("room-test");
        let mut connections = HashMap::new();
        for name in players {
            let player_id = (*name).to_string();
            room.add_player(player_id.clone(), player_id.clone())
                .unwrap();
            let conn = RecordingConnection::new();
            if let Some(player) = room.player_mut(&player_id) {
                player.bind_connection(conn.clone());
            }
            connections.insert(player_id, conn);
        }
        assert_eq!(room.status(), GameStatus::Active);
        (room, connections)
    }
}

/// Domain errors produced by room operations.
///
/// These are ordinary values returned to the dispatch layer and surfaced to
/// clients as `error` frames. Nothing in here is ever allowed to panic a
/// room.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("player {0} is not in this room")]
    PlayerNotFound(PlayerId),
    #[error("player {0} is knocked out or dead and cannot act")]
    PlayerNotActive(PlayerId),
    #[error("answer targets question {submitted}, but the current question is {current}")]
    QuestionMismatch { submitted: String, current: String },
    #[error("player {0} has no question assigned")]
    NoQuestionAssigned(PlayerId),
    #[error("player {0} is not knocked out")]
    PlayerNotKnockedOut(PlayerId),
    #[error("revival code does not match")]
    InvalidRevivalCode,
    #[error("player {0} has exhausted their revive quota")]
    ReviveQuotaExceeded(PlayerId),
    #[error("the battle has not started")]
    GameNotActive,
    #[error("the battle is already over")]
    GameCompleted,
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl GameError {
    /// Wire-level code for this error.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::PlayerNotFound(_) => ErrorCode::PlayerNotFound,
            Self::PlayerNotActive(_) => ErrorCode::PlayerNotActive,
            Self::QuestionMismatch { .. } => ErrorCode::QuestionMismatch,
            Self::NoQuestionAssigned(_) => ErrorCode::NoQuestionAssigned,
            Self::PlayerNotKnockedOut(_) => ErrorCode::PlayerNotKnockedOut,
            Self::InvalidRevivalCode => ErrorCode::InvalidRevivalCode,
            Self::ReviveQuotaExceeded(_) => ErrorCode::ReviveQuotaExceeded,
            Self::GameNotActive => ErrorCode::GameNotActive,
            Self::GameCompleted => ErrorCode::GameAlreadyCompleted,
            Self::InvalidInput(_) => ErrorCode::InvalidInput,
        }
    }
}
