//! Fan-out helpers shared by every handler.
//!
//! All of these run while the caller holds the room lock. Delivery is a
//! non-blocking queue push per recipient, so holding the lock across a
//! broadcast is safe; a full or closed queue drops the frame for that
//! recipient and logs, it never stalls the room.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::broadcast::{BroadcastFrame, BroadcastTarget, PlayerIdList};
use crate::connection::{Connection, SendError};
use crate::game::{AnswerOutcome, GameRoom};
use crate::protocol::{now_millis, ErrorCode, PlayerId, ServerMessage};

fn note_send_failure(context: &str, err: &SendError) {
    match err {
        SendError::Closed => debug!(context, "Recipient connection closed, frame dropped"),
        SendError::QueueFull => warn!(context, "Outbound queue full, frame dropped"),
        SendError::Serialization(detail) => {
            warn!(context, detail, "Failed to serialize outbound message");
        }
    }
}

/// Sends directly to a socket, joined or not.
pub(crate) fn send_to_connection(connection: &Arc<dyn Connection>, message: &ServerMessage) {
    if let Err(err) = connection.send(message) {
        note_send_failure("direct", &err);
    }
}

pub(crate) fn send_error(connection: &Arc<dyn Connection>, code: ErrorCode) {
    send_to_connection(connection, &ServerMessage::error_from_code(code));
}

pub(crate) fn send_error_text(
    connection: &Arc<dyn Connection>,
    message: impl Into<String>,
    code: ErrorCode,
) {
    send_to_connection(connection, &ServerMessage::error(message.into(), Some(code)));
}

/// Sends to one player through their bound connection, if any.
pub(crate) fn send_to_player(room: &GameRoom, player_id: &PlayerId, message: &ServerMessage) {
    let Some(connection) = room.player(player_id).and_then(|p| p.connection()) else {
        return;
    };
    if let Err(err) = connection.send(message) {
        note_send_failure("player", &err);
    }
}

/// Serializes once and pushes the same frame to every connected player.
pub(crate) fn broadcast_room(room: &GameRoom, message: ServerMessage) {
    let frame = match BroadcastFrame::new(message) {
        Ok(frame) => frame,
        Err(err) => {
            note_send_failure("broadcast", &err);
            return;
        }
    };
    for connection in room.connected_recipients() {
        if let Err(err) = connection.send_frame(frame.bytes()) {
            note_send_failure("broadcast", &err);
        }
    }
}

/// Pushes an already serialized frame to every connected player. The
/// countdown task uses this with its reusable serialization buffer.
pub(crate) fn broadcast_frame(room: &GameRoom, frame: bytes::Bytes) {
    for connection in room.connected_recipients() {
        if let Err(err) = connection.send_frame(frame.clone()) {
            note_send_failure("broadcast", &err);
        }
    }
}

/// Broadcasts to every connected player except one, typically the player
/// whose own action triggered the announcement.
pub(crate) fn broadcast_except(room: &GameRoom, except: &PlayerId, message: ServerMessage) {
    let frame = match BroadcastFrame::new(message) {
        Ok(frame) => frame,
        Err(err) => {
            note_send_failure("broadcast", &err);
            return;
        }
    };
    let connected: PlayerIdList = room
        .players()
        .filter(|p| p.is_connected())
        .map(|p| p.id.clone())
        .collect();
    let target = BroadcastTarget::room_except(connected, except.clone());
    for player_id in target.recipients() {
        let Some(connection) = room.player(player_id).and_then(|p| p.connection()) else {
            continue;
        };
        if let Err(err) = connection.send_frame(frame.bytes()) {
            note_send_failure("broadcast", &err);
        }
    }
}

/// Delivers one evaluated answer to its owner: the personal result first,
/// then the next question when one was assigned.
pub(crate) fn deliver_answer_outcome(room: &GameRoom, outcome: &AnswerOutcome) {
    send_to_player(
        room,
        &outcome.player_id,
        &ServerMessage::AnswerResult {
            player_id: outcome.player_id.clone(),
            question_id: outcome.question_id.clone(),
            correct: outcome.correct,
            damage: outcome.damage,
            score: outcome.score,
            lives: outcome.lives,
            boss_health: outcome.boss_health,
            revival_code: outcome.revival_code.clone(),
            timestamp: now_millis(),
        },
    );
    if let Some(question) = &outcome.next_question {
        send_to_player(
            room,
            &outcome.player_id,
            &ServerMessage::question_changed(question.clone()),
        );
    }
}

/// Announces the end of the battle with the final standings.
pub(crate) fn broadcast_completion(room: &GameRoom) {
    broadcast_room(
        room,
        ServerMessage::GameCompleted {
            leaderboard: room.leaderboard().to_vec(),
            timestamp: now_millis(),
        },
    );
}
