//! Join, leave, disconnect and snapshot handlers.

use super::{countdown, messaging, BattleServer};
use crate::game::{GameRoom, LeaveOutcome};
use crate::protocol::validation;
use crate::protocol::{
    now_millis, ConnectionId, ErrorCode, GameStatus, PlayerId, QuestionPayload, RoomId,
    ServerMessage,
};

/// Removes a player and tells the remaining room. Shared by explicit leaves
/// and the cleanup pass that expires reconnect grace.
pub(super) fn apply_leave(room: &mut GameRoom, player_id: &PlayerId) -> Option<LeaveOutcome> {
    let outcome = match room.remove_player(player_id) {
        Ok(outcome) => outcome,
        Err(err) => {
            tracing::debug!(player_id = %player_id, error = %err, "Leave ignored");
            return None;
        }
    };
    messaging::broadcast_room(
        room,
        ServerMessage::PlayerLeft {
            player_id: player_id.clone(),
            player_count: outcome.player_count,
            timestamp: now_millis(),
        },
    );
    Some(outcome)
}

impl BattleServer {
    /// Binds a connection to a player and inserts them into the room named
    /// by the connection path, creating the room on first join. When the
    /// join brings the room to its start threshold the battle begins.
    pub(crate) async fn handle_join_game(
        &self,
        connection_id: ConnectionId,
        player_id: PlayerId,
        game_room_id: RoomId,
        player_name: Option<String>,
    ) {
        let Some(client) = self.connections.lookup(&connection_id) else {
            return;
        };

        if let Err(reason) =
            validation::validate_player_id_with_config(&player_id, &self.config.protocol)
        {
            messaging::send_error_text(&client.connection, reason, ErrorCode::InvalidPlayerId);
            return;
        }
        if game_room_id != client.room_id {
            messaging::send_error_text(
                &client.connection,
                format!(
                    "join names room {game_room_id}, but this connection is for room {}",
                    client.room_id
                ),
                ErrorCode::RoomMismatch,
            );
            return;
        }
        if let Some(name) = &player_name {
            if let Err(reason) =
                validation::validate_player_name_with_config(name, &self.config.protocol)
            {
                messaging::send_error_text(&client.connection, reason, ErrorCode::InvalidPlayerName);
                return;
            }
        }
        if client.player_id.is_some() {
            messaging::send_error_text(
                &client.connection,
                "this connection has already joined",
                ErrorCode::AlreadyJoined,
            );
            return;
        }
        let display_name = player_name.unwrap_or_else(|| player_id.clone());

        let room_join_span = tracing::info_span!(
            "room.join",
            player_id = %player_id,
            room_id = %client.room_id,
            team_id = tracing::field::Empty,
            reconnected = tracing::field::Empty
        );

        let cell = self.room_or_create(&client.room_id).await;
        let started = {
            let mut room = cell.room.lock().await;
            let _span_guard = room_join_span.enter();

            let outcome = match room.add_player(player_id.clone(), display_name.clone()) {
                Ok(outcome) => outcome,
                Err(err) => {
                    messaging::send_error_text(
                        &client.connection,
                        err.to_string(),
                        err.error_code(),
                    );
                    return;
                }
            };
            room_join_span.record("team_id", tracing::field::display(&outcome.team_id));
            room_join_span.record("reconnected", outcome.reconnected);

            // A rejoin on a fresh socket takes the seat over. The stale
            // socket loses its binding and is closed; its late disconnect
            // is ignored (handle_disconnect checks the bound handle).
            self.connections.unbind_player(&client.room_id, &player_id);
            let stale = room
                .player_mut(&player_id)
                .and_then(|player| player.bind_connection(client.connection.clone()));
            if let Some(stale) = stale {
                if !std::sync::Arc::ptr_eq(&stale, &client.connection) {
                    stale.close();
                    tracing::info!(
                        room_id = %client.room_id,
                        player_id = %player_id,
                        "Seat taken over by a new connection"
                    );
                }
            }
            self.connections.bind_player(&connection_id, player_id.clone());

            tracing::info!(
                room_id = %client.room_id,
                player_id = %player_id,
                team_id = %outcome.team_id,
                player_count = outcome.player_count,
                reconnected = outcome.reconnected,
                "Player joined"
            );

            if !outcome.reconnected {
                messaging::broadcast_except(
                    &room,
                    &player_id,
                    ServerMessage::PlayerJoined {
                        player_id: player_id.clone(),
                        player_name: display_name,
                        team_id: outcome.team_id.clone(),
                        player_count: outcome.player_count,
                        max_boss_health: outcome.max_boss_health,
                        timestamp: now_millis(),
                    },
                );
            }

            if outcome.started {
                // Everyone sees the battle flip to Active, then each player
                // receives their own opening question.
                messaging::broadcast_room(
                    &room,
                    ServerMessage::game_state_update(room.game_state()),
                );
                send_current_questions(&room);
            } else {
                messaging::send_to_connection(
                    &client.connection,
                    &ServerMessage::game_state_update(room.game_state()),
                );
                if room.status() == GameStatus::Active {
                    send_question_to(&room, &player_id);
                }
            }
            outcome.started
        };

        if started {
            countdown::spawn_countdown(cell);
        }
    }

    /// Explicit leave: removes the player, confirms to the leaver, and
    /// destroys the room once nobody is left.
    pub(crate) async fn handle_leave_game(&self, connection_id: ConnectionId, player_id: &PlayerId) {
        let Some(client) = self.connections.lookup(&connection_id) else {
            return;
        };
        self.connections.clear_player(&connection_id);

        let Some(cell) = self.room(&client.room_id) else {
            return;
        };
        let leave_span = tracing::info_span!(
            "room.leave",
            player_id = %player_id,
            room_id = %client.room_id,
            player_count = tracing::field::Empty
        );
        let outcome = {
            let mut room = cell.room.lock().await;
            apply_leave(&mut room, player_id)
        };
        let Some(outcome) = outcome else {
            return;
        };
        leave_span.record("player_count", outcome.player_count);
        let _span_guard = leave_span.enter();

        // The leaver is no longer a room recipient, so confirm directly.
        messaging::send_to_connection(
            &client.connection,
            &ServerMessage::PlayerLeft {
                player_id: player_id.clone(),
                player_count: outcome.player_count,
                timestamp: now_millis(),
            },
        );
        tracing::info!(room_id = %client.room_id, player_id = %player_id, "Player left");

        if outcome.room_empty {
            self.destroy_room(&client.room_id, "last player left");
        }
    }

    pub(crate) async fn handle_request_game_state(
        &self,
        connection_id: ConnectionId,
        _player_id: &PlayerId,
    ) {
        let Some(client) = self.connections.lookup(&connection_id) else {
            return;
        };
        let Some(cell) = self.room(&client.room_id) else {
            messaging::send_error(&client.connection, ErrorCode::RoomNotFound);
            return;
        };
        let mut room = cell.room.lock().await;
        room.touch();
        messaging::send_to_connection(
            &client.connection,
            &ServerMessage::game_state_update(room.game_state()),
        );
    }

    pub(crate) async fn handle_request_question(
        &self,
        connection_id: ConnectionId,
        player_id: &PlayerId,
    ) {
        let Some(client) = self.connections.lookup(&connection_id) else {
            return;
        };
        let Some(cell) = self.room(&client.room_id) else {
            messaging::send_error(&client.connection, ErrorCode::RoomNotFound);
            return;
        };
        let mut room = cell.room.lock().await;
        room.touch();
        match room.current_question(player_id) {
            Ok(question) => {
                let payload = QuestionPayload::from(question);
                messaging::send_to_connection(
                    &client.connection,
                    &ServerMessage::question_changed(payload),
                );
            }
            Err(err) => {
                messaging::send_error_text(&client.connection, err.to_string(), err.error_code());
            }
        }
    }

    /// Socket teardown. The player stays in the room with their connection
    /// unbound; the cleanup pass removes them if the reconnect grace window
    /// expires first.
    pub async fn handle_disconnect(&self, connection_id: ConnectionId) {
        let Some(client) = self.connections.remove(&connection_id) else {
            return;
        };
        let Some(player_id) = client.player_id else {
            return;
        };
        let Some(cell) = self.room(&client.room_id) else {
            return;
        };
        let mut room = cell.room.lock().await;
        if let Some(player) = room.player_mut(&player_id) {
            // A reconnect may already have re-bound the seat; only unbind
            // when the dropped socket is still the one attached.
            let same_socket = player
                .connection()
                .is_some_and(|bound| std::sync::Arc::ptr_eq(bound, &client.connection));
            if same_socket {
                player.unbind_connection();
                tracing::info!(
                    room_id = %client.room_id,
                    player_id = %player_id,
                    "Player disconnected, reconnect grace started"
                );
            }
        }
    }
}

/// Sends every standing player their current question.
fn send_current_questions(room: &GameRoom) {
    for player in room.players() {
        let Some(connection) = player.connection() else {
            continue;
        };
        if let Ok(question) = room.current_question(&player.id) {
            messaging::send_to_connection(
                connection,
                &ServerMessage::question_changed(QuestionPayload::from(question)),
            );
        }
    }
}

fn send_question_to(room: &GameRoom, player_id: &PlayerId) {
    if let (Some(connection), Ok(question)) = (
        room.player(player_id).and_then(|p| p.connection()),
        room.current_question(player_id),
    ) {
        messaging::send_to_connection(
            connection,
            &ServerMessage::question_changed(QuestionPayload::from(question)),
        );
    }
}
