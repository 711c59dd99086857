use serde::{Deserialize, Serialize};

use super::error_codes::ErrorCode;
use super::types::{
    GameSnapshot, LeaderboardEntry, PlayerId, Question, QuestionPayload, RoomId, TeamId,
};

/// Milliseconds since the Unix epoch, as carried in every message envelope.
///
/// Kept as `f64` because clients produce these with `Date.now()`-style calls
/// and some runtimes emit fractional values.
pub fn now_millis() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64
}

/// Message types sent from client to server.
///
/// The envelope is internally tagged: `{"type": "...", "timestamp": ..., ...}`
/// with type-specific fields flattened alongside the tag. Unknown types and
/// missing required fields fail deserialization, which the socket layer
/// reports back as a protocol error without closing the connection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Bind this connection to a player and room (MUST precede battle traffic)
    #[serde(rename_all = "camelCase")]
    JoinGame {
        player_id: PlayerId,
        game_room_id: RoomId,
        /// Display name; defaults to the player id when absent
        #[serde(default, skip_serializing_if = "Option::is_none")]
        player_name: Option<String>,
        timestamp: f64,
    },
    /// Answer the player's current question; buffered until the shared
    /// countdown expires unless the deadline is already at hand
    #[serde(rename_all = "camelCase")]
    SubmitAnswer {
        player_id: PlayerId,
        question_id: String,
        answer: String,
        /// Seconds the player took, measured client-side
        time_elapsed: f64,
        timestamp: f64,
    },
    /// Client-reported direct damage (mini-events, scripted phases)
    #[serde(rename_all = "camelCase")]
    BossDamage {
        player_id: PlayerId,
        damage: f64,
        question_id: String,
        timestamp: f64,
    },
    /// Client-driven knockout carrying the revival code it chose to display
    #[serde(rename_all = "camelCase")]
    PlayerKnockedOut {
        player_id: PlayerId,
        revival_code: String,
        timestamp: f64,
    },
    /// Enter a teammate's revival code on their behalf
    #[serde(rename_all = "camelCase")]
    RevivePlayer {
        player_id: PlayerId,
        target_player_id: PlayerId,
        revival_code: String,
        timestamp: f64,
    },
    /// Leave the battle and release all per-player state
    #[serde(rename_all = "camelCase")]
    LeaveGame { player_id: PlayerId, timestamp: f64 },
    /// Ask for a fresh full snapshot
    #[serde(rename_all = "camelCase")]
    RequestGameState { player_id: PlayerId, timestamp: f64 },
    /// Ask for the player's current question again
    #[serde(rename_all = "camelCase")]
    RequestQuestion { player_id: PlayerId, timestamp: f64 },
    /// Feeder path: push an extra question into the room's shared pool
    #[serde(rename_all = "camelCase")]
    QuestionData { question: Question, timestamp: f64 },
    /// Feeder path: the external question source has nothing to offer
    #[serde(rename_all = "camelCase")]
    NoQuestionsAvailable { message: String, timestamp: f64 },
    /// Application-level liveness signal
    #[serde(rename_all = "camelCase")]
    Heartbeat {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        player_id: Option<PlayerId>,
        timestamp: f64,
    },
}

impl ClientMessage {
    /// The `type` tag as it appears on the wire, for logging and error text.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::JoinGame { .. } => "join_game",
            Self::SubmitAnswer { .. } => "submit_answer",
            Self::BossDamage { .. } => "boss_damage",
            Self::PlayerKnockedOut { .. } => "player_knocked_out",
            Self::RevivePlayer { .. } => "revive_player",
            Self::LeaveGame { .. } => "leave_game",
            Self::RequestGameState { .. } => "request_game_state",
            Self::RequestQuestion { .. } => "request_question",
            Self::QuestionData { .. } => "question_data",
            Self::NoQuestionsAvailable { .. } => "no_questions_available",
            Self::Heartbeat { .. } => "heartbeat",
        }
    }

    /// The player id this message claims to act for, when it carries one.
    pub fn claimed_player_id(&self) -> Option<&PlayerId> {
        match self {
            Self::JoinGame { player_id, .. }
            | Self::SubmitAnswer { player_id, .. }
            | Self::BossDamage { player_id, .. }
            | Self::PlayerKnockedOut { player_id, .. }
            | Self::RevivePlayer { player_id, .. }
            | Self::LeaveGame { player_id, .. }
            | Self::RequestGameState { player_id, .. }
            | Self::RequestQuestion { player_id, .. } => Some(player_id),
            Self::Heartbeat { player_id, .. } => player_id.as_ref(),
            Self::QuestionData { .. } | Self::NoQuestionsAvailable { .. } => None,
        }
    }
}

/// Message types sent from server to client.
///
/// Same internally tagged envelope as [`ClientMessage`]. These types are
/// never accepted inbound.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Connection accepted and registered; sent before any join
    #[serde(rename_all = "camelCase")]
    ConnectionAck { room_id: RoomId, timestamp: f64 },
    /// Protocol or domain error; the connection stays open
    #[serde(rename_all = "camelCase")]
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        error_code: Option<ErrorCode>,
        timestamp: f64,
    },
    /// Full authoritative snapshot (boxed to reduce enum size)
    #[serde(rename_all = "camelCase")]
    GameStateUpdate {
        game_state: Box<GameSnapshot>,
        timestamp: f64,
    },
    /// Outcome of one evaluated answer, delivered to the answering player
    #[serde(rename_all = "camelCase")]
    AnswerResult {
        player_id: PlayerId,
        question_id: String,
        correct: bool,
        damage: f64,
        score: u64,
        lives: u8,
        boss_health: f64,
        /// Present when this answer knocked the player out
        #[serde(skip_serializing_if = "Option::is_none")]
        revival_code: Option<String>,
        timestamp: f64,
    },
    /// A player joined the room
    #[serde(rename_all = "camelCase")]
    PlayerJoined {
        player_id: PlayerId,
        player_name: String,
        team_id: TeamId,
        player_count: usize,
        max_boss_health: f64,
        timestamp: f64,
    },
    /// A player left the room
    #[serde(rename_all = "camelCase")]
    PlayerLeft {
        player_id: PlayerId,
        player_count: usize,
        timestamp: f64,
    },
    /// A knocked-out player returned to the battle
    #[serde(rename_all = "camelCase")]
    PlayerRevived {
        player_id: PlayerId,
        /// Teammate who entered the code; absent for countdown auto-revives
        #[serde(skip_serializing_if = "Option::is_none")]
        revived_by: Option<PlayerId>,
        lives: u8,
        timestamp: f64,
    },
    /// The recipient's current question changed (or was re-requested)
    #[serde(rename_all = "camelCase")]
    QuestionChanged {
        question: QuestionPayload,
        timestamp: f64,
    },
    /// Boss defeated; terminal for the room
    #[serde(rename_all = "camelCase")]
    GameCompleted {
        leaderboard: Vec<LeaderboardEntry>,
        timestamp: f64,
    },
    /// Standings changed
    #[serde(rename_all = "camelCase")]
    LeaderboardUpdate {
        leaderboard: Vec<LeaderboardEntry>,
        timestamp: f64,
    },
}

impl ServerMessage {
    /// Error with explicit text and optional code.
    pub fn error(message: impl Into<String>, error_code: Option<ErrorCode>) -> Self {
        Self::Error {
            message: message.into(),
            error_code,
            timestamp: now_millis(),
        }
    }

    /// Error whose text is the code's canned description.
    pub fn error_from_code(error_code: ErrorCode) -> Self {
        Self::Error {
            message: error_code.description().to_string(),
            error_code: Some(error_code),
            timestamp: now_millis(),
        }
    }

    pub fn connection_ack(room_id: RoomId) -> Self {
        Self::ConnectionAck {
            room_id,
            timestamp: now_millis(),
        }
    }

    pub fn game_state_update(snapshot: GameSnapshot) -> Self {
        Self::GameStateUpdate {
            game_state: Box::new(snapshot),
            timestamp: now_millis(),
        }
    }

    pub fn question_changed(question: QuestionPayload) -> Self {
        Self::QuestionChanged {
            question,
            timestamp: now_millis(),
        }
    }

    pub fn leaderboard_update(leaderboard: Vec<LeaderboardEntry>) -> Self {
        Self::LeaderboardUpdate {
            leaderboard,
            timestamp: now_millis(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_game_wire_shape() {
        let raw = r#"{
            "type": "join_game",
            "playerId": "alice",
            "gameRoomId": "r1",
            "timestamp": 1700000000000
        }"#;
        let msg: ClientMessage = serde_json::from_str(raw).unwrap();
        match msg {
            ClientMessage::JoinGame {
                player_id,
                game_room_id,
                player_name,
                ..
            } => {
                assert_eq!(player_id, "alice");
                assert_eq!(game_room_id, "r1");
                assert_eq!(player_name, None);
            }
            other => panic!("parsed wrong variant: {other:?}"),
        }
    }

    #[test]
    fn submit_answer_requires_all_fields() {
        let missing_elapsed = r#"{
            "type": "submit_answer",
            "playerId": "alice",
            "questionId": "q1",
            "answer": "42",
            "timestamp": 1700000000000
        }"#;
        assert!(serde_json::from_str::<ClientMessage>(missing_elapsed).is_err());
    }

    #[test]
    fn unknown_type_is_rejected() {
        let raw = r#"{"type": "warp_to_moon", "timestamp": 1}"#;
        assert!(serde_json::from_str::<ClientMessage>(raw).is_err());
    }

    #[test]
    fn heartbeat_player_id_is_optional() {
        let bare: ClientMessage =
            serde_json::from_str(r#"{"type": "heartbeat", "timestamp": 2}"#).unwrap();
        assert_eq!(bare.claimed_player_id(), None);

        let named: ClientMessage = serde_json::from_str(
            r#"{"type": "heartbeat", "playerId": "bob", "timestamp": 2}"#,
        )
        .unwrap();
        assert_eq!(named.claimed_player_id().map(String::as_str), Some("bob"));
    }

    #[test]
    fn server_error_serializes_with_camel_case_code() {
        let msg = ServerMessage::error_from_code(ErrorCode::InvalidRevivalCode);
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["errorCode"], "INVALID_REVIVAL_CODE");
        assert!(json["message"].as_str().unwrap().contains("revival code"));
        assert!(json["timestamp"].as_f64().unwrap() > 0.0);
    }

    #[test]
    fn answer_result_omits_absent_revival_code() {
        let msg = ServerMessage::AnswerResult {
            player_id: "alice".into(),
            question_id: "q1".into(),
            correct: true,
            damage: 1.5,
            score: 10,
            lives: 3,
            boss_health: 38.5,
            revival_code: None,
            timestamp: 5.0,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "answer_result");
        assert!(json.get("revivalCode").is_none());
        assert_eq!(json["bossHealth"], 38.5);
    }

    #[test]
    fn type_names_match_wire_tags() {
        let msg = ClientMessage::LeaveGame {
            player_id: "p".into(),
            timestamp: 0.0,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], msg.type_name());
    }
}
