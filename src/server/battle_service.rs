//! Battle traffic: answers, direct damage, knockouts, revives, and the
//! feeder path that keeps the question pool stocked.

use super::{messaging, BattleServer};
use crate::game::{AnswerDisposition, FallbackContent};
use crate::protocol::validation;
use crate::protocol::{now_millis, ConnectionId, ErrorCode, PlayerId, Question, ServerMessage};

impl BattleServer {
    /// Accepts an answer for the player's current question. Most answers
    /// are buffered until the shared countdown resolves them; submissions
    /// arriving at the deadline are evaluated on the spot.
    pub(crate) async fn handle_submit_answer(
        &self,
        connection_id: ConnectionId,
        player_id: &PlayerId,
        question_id: &str,
        answer: String,
        time_elapsed: f64,
    ) {
        let Some(client) = self.connections.lookup(&connection_id) else {
            return;
        };
        if let Err(reason) =
            validation::validate_answer_text_with_config(&answer, &self.config.protocol)
        {
            messaging::send_error_text(&client.connection, reason, ErrorCode::InvalidAnswer);
            return;
        }
        let Some(cell) = self.room(&client.room_id) else {
            messaging::send_error(&client.connection, ErrorCode::RoomNotFound);
            return;
        };

        let completed = {
            let mut room = cell.room.lock().await;
            match room.process_answer(player_id, question_id, answer, time_elapsed) {
                Ok(AnswerDisposition::Buffered) => {
                    tracing::debug!(
                        room_id = %client.room_id,
                        player_id = %player_id,
                        question_id,
                        "Answer buffered for countdown resolution"
                    );
                    false
                }
                Ok(AnswerDisposition::Evaluated(outcome)) => {
                    tracing::debug!(
                        room_id = %client.room_id,
                        player_id = %player_id,
                        question_id,
                        correct = outcome.correct,
                        "Answer evaluated at the deadline"
                    );
                    messaging::deliver_answer_outcome(&room, &outcome);
                    messaging::broadcast_room(
                        &room,
                        ServerMessage::leaderboard_update(room.leaderboard().to_vec()),
                    );
                    if outcome.completed {
                        messaging::broadcast_completion(&room);
                    }
                    outcome.completed
                }
                Err(err) => {
                    messaging::send_error_text(&client.connection, err.to_string(), err.error_code());
                    false
                }
            }
        };

        if completed {
            cell.countdown.cancel();
        }
    }

    /// Client-reported direct damage, outside the answer flow.
    pub(crate) async fn handle_boss_damage(
        &self,
        connection_id: ConnectionId,
        player_id: &PlayerId,
        damage: f64,
        question_id: &str,
    ) {
        let Some(client) = self.connections.lookup(&connection_id) else {
            return;
        };
        if let Err(reason) = validation::validate_damage_amount(damage) {
            messaging::send_error_text(&client.connection, reason, ErrorCode::InvalidDamage);
            return;
        }
        let Some(cell) = self.room(&client.room_id) else {
            messaging::send_error(&client.connection, ErrorCode::RoomNotFound);
            return;
        };

        let completed = {
            let mut room = cell.room.lock().await;
            match room.apply_boss_damage(player_id, damage) {
                Ok(outcome) => {
                    tracing::info!(
                        room_id = %client.room_id,
                        player_id = %player_id,
                        question_id,
                        damage,
                        boss_health = outcome.boss_health,
                        "Direct boss damage applied"
                    );
                    messaging::broadcast_room(
                        &room,
                        ServerMessage::game_state_update(room.game_state()),
                    );
                    if outcome.completed {
                        messaging::broadcast_completion(&room);
                    }
                    outcome.completed
                }
                Err(err) => {
                    messaging::send_error_text(&client.connection, err.to_string(), err.error_code());
                    false
                }
            }
        };

        if completed {
            cell.countdown.cancel();
        }
    }

    /// Client-driven knockout. The room stores the canonical form of the
    /// code the client is already displaying.
    pub(crate) async fn handle_player_knocked_out(
        &self,
        connection_id: ConnectionId,
        player_id: &PlayerId,
        revival_code: &str,
    ) {
        let Some(client) = self.connections.lookup(&connection_id) else {
            return;
        };
        let Some(cell) = self.room(&client.room_id) else {
            messaging::send_error(&client.connection, ErrorCode::RoomNotFound);
            return;
        };

        let mut room = cell.room.lock().await;
        match room.knock_out_player(player_id, revival_code) {
            Ok(_code) => {
                tracing::info!(
                    room_id = %client.room_id,
                    player_id = %player_id,
                    "Player reported knocked out"
                );
                messaging::broadcast_room(
                    &room,
                    ServerMessage::game_state_update(room.game_state()),
                );
            }
            Err(err) => {
                messaging::send_error_text(&client.connection, err.to_string(), err.error_code());
            }
        }
    }

    /// Entering a teammate's revival code on their behalf.
    pub(crate) async fn handle_revive_player(
        &self,
        connection_id: ConnectionId,
        player_id: &PlayerId,
        target_player_id: &PlayerId,
        revival_code: &str,
    ) {
        let Some(client) = self.connections.lookup(&connection_id) else {
            return;
        };
        let Some(cell) = self.room(&client.room_id) else {
            messaging::send_error(&client.connection, ErrorCode::RoomNotFound);
            return;
        };

        let mut room = cell.room.lock().await;
        match room.revive_player(target_player_id, revival_code) {
            Ok(outcome) => {
                tracing::info!(
                    room_id = %client.room_id,
                    target = %target_player_id,
                    revived_by = %player_id,
                    revive_count = outcome.revive_count,
                    "Player revived by teammate"
                );
                messaging::broadcast_room(
                    &room,
                    ServerMessage::PlayerRevived {
                        player_id: target_player_id.clone(),
                        revived_by: Some(player_id.clone()),
                        lives: outcome.lives,
                        timestamp: now_millis(),
                    },
                );
            }
            Err(err) => {
                messaging::send_error_text(&client.connection, err.to_string(), err.error_code());
            }
        }
    }

    /// Feeder path: appends one vetted question to the room's shared pool.
    pub(crate) async fn handle_question_data(&self, connection_id: ConnectionId, question: Question) {
        let Some(client) = self.connections.lookup(&connection_id) else {
            return;
        };
        if let Err(reason) =
            validation::validate_question_with_config(&question, &self.config.protocol)
        {
            messaging::send_error_text(&client.connection, reason, ErrorCode::InvalidQuestion);
            return;
        }
        let Some(cell) = self.room(&client.room_id) else {
            tracing::warn!(
                room_id = %client.room_id,
                question_id = %question.id,
                "Dropping feeder question for a room that does not exist"
            );
            return;
        };

        let mut room = cell.room.lock().await;
        tracing::info!(
            room_id = %client.room_id,
            question_id = %question.id,
            "Feeder question added to the pool"
        );
        room.add_question_to_pool(question);
    }

    /// Feeder path: the external source came up empty. Logged always; when
    /// the pool has actually run dry the built-in set is swapped in so the
    /// battle can continue.
    pub(crate) async fn handle_no_questions_available(
        &self,
        connection_id: ConnectionId,
        message: &str,
    ) {
        let Some(client) = self.connections.lookup(&connection_id) else {
            return;
        };
        tracing::warn!(
            room_id = %client.room_id,
            detail = message,
            "Feeder reports no questions available"
        );
        let Some(cell) = self.room(&client.room_id) else {
            return;
        };
        let mut room = cell.room.lock().await;
        if room.pool_is_empty() {
            tracing::info!(
                room_id = %client.room_id,
                "Question pool is dry, refilling with the built-in set"
            );
            room.replace_pool(FallbackContent::builtin_questions());
        }
    }
}
