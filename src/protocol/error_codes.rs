use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes for structured error handling
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Protocol errors (1xxx)
    InvalidMessage,
    MessageTooLarge,
    NotJoined,
    IdentityMismatch,
    RoomMismatch,

    // Validation errors (2xxx)
    InvalidInput,
    InvalidPlayerId,
    InvalidRoomId,
    InvalidPlayerName,
    InvalidAnswer,
    InvalidDamage,
    InvalidQuestion,

    // Room errors (3xxx)
    RoomNotFound,
    PlayerNotFound,
    AlreadyJoined,
    GameNotActive,
    GameAlreadyCompleted,

    // Battle errors (4xxx)
    QuestionMismatch,
    NoQuestionAssigned,
    PlayerNotKnockedOut,
    PlayerNotActive,
    InvalidRevivalCode,
    ReviveQuotaExceeded,

    // Resource errors (5xxx)
    TooManyConnections,

    // Server errors (9xxx)
    InternalError,
}

impl ErrorCode {
    /// Returns a human-readable description of this error code.
    ///
    /// These are the fallback messages surfaced to clients in `error` frames
    /// when no more specific text is available.
    pub fn description(&self) -> &'static str {
        match self {
            // Protocol errors (1xxx)
            Self::InvalidMessage => {
                "The message could not be parsed. Check the envelope shape and required fields."
            }
            Self::MessageTooLarge => {
                "The message size exceeds the maximum allowed limit. Please send a smaller message."
            }
            Self::NotJoined => {
                "This connection has not joined a game yet. Send join_game before other messages."
            }
            Self::IdentityMismatch => {
                "The playerId in this message does not match the player bound to this connection."
            }
            Self::RoomMismatch => {
                "The gameRoomId in this message does not match the room this connection is attached to."
            }

            // Validation errors (2xxx)
            Self::InvalidInput => {
                "The provided input is invalid or malformed. Check your request parameters."
            }
            Self::InvalidPlayerId => {
                "The player id is invalid. Ids must be non-empty and use letters, digits, dashes or underscores."
            }
            Self::InvalidRoomId => {
                "The room id is invalid. Room ids must be non-empty and use letters, digits, dashes or underscores."
            }
            Self::InvalidPlayerName => {
                "The player name is invalid. Player names must be non-empty and meet length requirements."
            }
            Self::InvalidAnswer => {
                "The answer text is empty or too long to be judged. Send a shorter answer."
            }
            Self::InvalidDamage => {
                "The damage amount is invalid. It must be a finite, positive number."
            }
            Self::InvalidQuestion => {
                "The supplied question is malformed. It needs an id, text and a correct answer."
            }

            // Room errors (3xxx)
            Self::RoomNotFound => {
                "The requested room could not be found. It may have been closed already."
            }
            Self::PlayerNotFound => {
                "No player with that id is present in this room. They may have left the battle."
            }
            Self::AlreadyJoined => {
                "A player with that id is already connected to this room from another session."
            }
            Self::GameNotActive => {
                "The battle has not started yet. Wait for enough players to join."
            }
            Self::GameAlreadyCompleted => {
                "The battle is over. No further answers or damage are accepted."
            }

            // Battle errors (4xxx)
            Self::QuestionMismatch => {
                "The answer targets a question that is not this player's current question."
            }
            Self::NoQuestionAssigned => {
                "This player has no question assigned right now. Request a question first."
            }
            Self::PlayerNotKnockedOut => {
                "The target player is not knocked out, so there is nothing to revive."
            }
            Self::PlayerNotActive => {
                "The player is knocked out or dead and cannot perform this action."
            }
            Self::InvalidRevivalCode => {
                "The revival code does not match. Double-check it with your teammate."
            }
            Self::ReviveQuotaExceeded => {
                "This player has already been revived the maximum number of times this battle."
            }

            // Resource errors (5xxx)
            Self::TooManyConnections => {
                "You have too many active connections. Close some connections before opening new ones."
            }

            // Server errors (9xxx)
            Self::InternalError => {
                "An internal server error occurred. Please try again or contact support if the issue persists."
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}
