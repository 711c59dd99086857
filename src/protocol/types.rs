use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default constants for validation (can be overridden by config)
/// These are used when no config is available
#[allow(dead_code)]
pub const DEFAULT_MAX_PLAYER_ID_LENGTH: usize = 64;
#[allow(dead_code)]
pub const DEFAULT_MAX_ROOM_ID_LENGTH: usize = 64;
#[allow(dead_code)]
pub const DEFAULT_MAX_PLAYER_NAME_LENGTH: usize = 32;
pub const DEFAULT_REVIVAL_CODE_LENGTH: usize = 6;
/// Longest answer text accepted before the frame is rejected as invalid.
pub const DEFAULT_MAX_ANSWER_LENGTH: usize = 256;

/// Player identifiers are chosen by the client on join so that a reconnecting
/// client can re-bind to its previous state by presenting the same id.
pub type PlayerId = String;
/// Room identifiers come from the connection path (`/game/{room_id}`).
pub type RoomId = String;
/// Ordinal team identifiers of the form `team-N`.
pub type TeamId = String;
/// Server-generated identifier for a single socket.
pub type ConnectionId = Uuid;

/// Authoritative room lifecycle. Transitions only move forward.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    #[default]
    Waiting,
    Active,
    Completed,
}

impl GameStatus {
    /// Ordering used to enforce forward-only transitions.
    pub fn phase(self) -> u8 {
        match self {
            Self::Waiting => 0,
            Self::Active => 1,
            Self::Completed => 2,
        }
    }
}

/// Authoritative player lifecycle. Booleans like "is knocked out" are derived
/// from this at the call site, never stored alongside it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlayerStatus {
    #[default]
    Active,
    KnockedOut,
    Dead,
}

/// A trivia question as held by the server. The correct answer never leaves
/// the server; clients receive the [`QuestionPayload`] projection instead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub text: String,
    #[serde(default = "default_time_limit")]
    pub time_limit_seconds: u32,
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_answer: String,
}

fn default_time_limit() -> u32 {
    30
}

/// Client-facing projection of a [`Question`] with the answer stripped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionPayload {
    pub id: String,
    pub text: String,
    pub time_limit_seconds: u32,
    pub options: Vec<String>,
}

impl From<&Question> for QuestionPayload {
    fn from(question: &Question) -> Self {
        Self {
            id: question.id.clone(),
            text: question.text.clone(),
            time_limit_seconds: question.time_limit_seconds,
            options: question.options.clone(),
        }
    }
}

/// Boss metadata supplied by the content source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Boss {
    pub id: String,
    pub name: String,
    pub base_health: f64,
    /// Question category the boss draws from.
    #[serde(default)]
    pub category_id: Option<String>,
}

/// Result of checking an answer against a question.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerCheck {
    /// False when the answer could not be judged at all (unknown question,
    /// empty text). Distinct from simply being wrong.
    pub valid: bool,
    pub correct: bool,
}

/// One row of the room leaderboard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub player_id: PlayerId,
    pub player_name: String,
    pub team_id: TeamId,
    pub score: u64,
    pub total_damage: f64,
}

/// Per-player summary embedded in team listings and snapshots.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSummary {
    pub id: PlayerId,
    pub name: String,
    pub status: PlayerStatus,
    pub lives: u8,
    pub score: u64,
    pub total_damage: f64,
    pub correct_answers: u32,
}

/// Team roster as serialized into snapshots.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TeamSummary {
    pub id: TeamId,
    pub name: String,
    pub members: Vec<PlayerSummary>,
    pub max_members: usize,
}

/// A knocked-out player as visible to the whole room. The revival code itself
/// is delivered only to its owner; teammates learn it out of band.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KnockoutView {
    pub player_id: PlayerId,
    pub player_name: String,
    /// Seconds left before the revival window closes and the countdown sweep
    /// resolves the knockout.
    pub revival_window_remaining: u32,
}

/// Immutable room snapshot safe to serialize to clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub room_id: RoomId,
    pub status: GameStatus,
    pub boss_health: f64,
    pub max_boss_health: f64,
    pub boss_name: String,
    pub player_count: usize,
    pub teams: Vec<TeamSummary>,
    pub leaderboard: Vec<LeaderboardEntry>,
    pub knocked_out: Vec<KnockoutView>,
    pub question_time_remaining: u32,
}
