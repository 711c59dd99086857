// Protocol module: message types, validation, and revival codes

pub mod error_codes;
pub mod messages;
pub mod revival_codes;
pub mod types;
pub mod validation;

// Re-export everything for backward compatibility
// This allows external code to use `use crate::protocol::*`

// From error_codes
pub use error_codes::ErrorCode;

// From types
pub use types::{
    AnswerCheck, Boss, ConnectionId, GameSnapshot, GameStatus, KnockoutView, LeaderboardEntry,
    PlayerId, PlayerStatus, PlayerSummary, Question, QuestionPayload, RoomId, TeamId, TeamSummary,
    DEFAULT_MAX_ANSWER_LENGTH, DEFAULT_MAX_PLAYER_ID_LENGTH, DEFAULT_MAX_PLAYER_NAME_LENGTH,
    DEFAULT_MAX_ROOM_ID_LENGTH, DEFAULT_REVIVAL_CODE_LENGTH,
};

// From messages
pub use messages::{now_millis, ClientMessage, ServerMessage};

// From revival_codes
pub use revival_codes::{generate_revival_code, normalize_revival_code};
