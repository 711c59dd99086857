use super::messaging;
use super::BattleServer;
use crate::protocol::{ClientMessage, ConnectionId, ErrorCode, PlayerId};

impl BattleServer {
    /// Routes one decoded client message to its handler.
    ///
    /// Player-scoped operations are gated here: the connection must have
    /// joined, and the player id it claims must match the one it joined as.
    /// Feeder messages (question_data, no_questions_available) and
    /// heartbeats are accepted from any registered connection.
    pub async fn handle_client_message(&self, connection_id: ConnectionId, message: ClientMessage) {
        match message {
            ClientMessage::JoinGame {
                player_id,
                game_room_id,
                player_name,
                ..
            } => {
                self.handle_join_game(connection_id, player_id, game_room_id, player_name)
                    .await;
            }
            ClientMessage::SubmitAnswer {
                player_id,
                question_id,
                answer,
                time_elapsed,
                ..
            } => {
                let Some(player_id) = self.authorized_player(&connection_id, &player_id) else {
                    return;
                };
                self.handle_submit_answer(
                    connection_id,
                    &player_id,
                    &question_id,
                    answer,
                    time_elapsed,
                )
                .await;
            }
            ClientMessage::BossDamage {
                player_id,
                damage,
                question_id,
                ..
            } => {
                let Some(player_id) = self.authorized_player(&connection_id, &player_id) else {
                    return;
                };
                self.handle_boss_damage(connection_id, &player_id, damage, &question_id)
                    .await;
            }
            ClientMessage::PlayerKnockedOut {
                player_id,
                revival_code,
                ..
            } => {
                let Some(player_id) = self.authorized_player(&connection_id, &player_id) else {
                    return;
                };
                self.handle_player_knocked_out(connection_id, &player_id, &revival_code)
                    .await;
            }
            ClientMessage::RevivePlayer {
                player_id,
                target_player_id,
                revival_code,
                ..
            } => {
                let Some(player_id) = self.authorized_player(&connection_id, &player_id) else {
                    return;
                };
                self.handle_revive_player(connection_id, &player_id, &target_player_id, &revival_code)
                    .await;
            }
            ClientMessage::LeaveGame { player_id, .. } => {
                let Some(player_id) = self.authorized_player(&connection_id, &player_id) else {
                    return;
                };
                self.handle_leave_game(connection_id, &player_id).await;
            }
            ClientMessage::RequestGameState { player_id, .. } => {
                let Some(player_id) = self.authorized_player(&connection_id, &player_id) else {
                    return;
                };
                self.handle_request_game_state(connection_id, &player_id).await;
            }
            ClientMessage::RequestQuestion { player_id, .. } => {
                let Some(player_id) = self.authorized_player(&connection_id, &player_id) else {
                    return;
                };
                self.handle_request_question(connection_id, &player_id).await;
            }
            ClientMessage::QuestionData { question, .. } => {
                self.handle_question_data(connection_id, question).await;
            }
            ClientMessage::NoQuestionsAvailable { message, .. } => {
                self.handle_no_questions_available(connection_id, &message)
                    .await;
            }
            ClientMessage::Heartbeat { player_id, .. } => {
                self.handle_heartbeat(connection_id, player_id.as_ref()).await;
            }
        }
    }

    /// Resolves the claimed player id against the connection's binding.
    /// Sends the appropriate error and returns `None` when the claim does
    /// not hold.
    fn authorized_player(
        &self,
        connection_id: &ConnectionId,
        claimed: &PlayerId,
    ) -> Option<PlayerId> {
        let client = self.connections.lookup(connection_id)?;
        match client.player_id {
            Some(bound) if bound == *claimed => Some(bound),
            Some(bound) => {
                tracing::warn!(
                    %connection_id,
                    claimed = %claimed,
                    bound = %bound,
                    "Rejecting message claiming another player's id"
                );
                messaging::send_error(&client.connection, ErrorCode::IdentityMismatch);
                None
            }
            None => {
                messaging::send_error(&client.connection, ErrorCode::NotJoined);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::Config;
    use crate::connection::RecordingConnection;
    use crate::game::FallbackContent;
    use crate::protocol::{now_millis, ServerMessage};

    async fn server_with_connection() -> (
        Arc<BattleServer>,
        ConnectionId,
        Arc<RecordingConnection>,
    ) {
        let config = Config::default();
        let content = Arc::new(FallbackContent::new(config.game.base_boss_health));
        let server = BattleServer::new(config, content);
        let connection = RecordingConnection::new();
        let connection_id = uuid::Uuid::new_v4();
        server
            .register_connection(
                connection_id,
                connection.clone(),
                std::net::SocketAddr::from(([127, 0, 0, 1], 5000)),
                "room-1".to_string(),
            )
            .unwrap();
        (server, connection_id, connection)
    }

    fn error_code_of(message: &ServerMessage) -> Option<ErrorCode> {
        match message {
            ServerMessage::Error { error_code, .. } => *error_code,
            _ => None,
        }
    }

    #[tokio::test]
    async fn player_operations_require_a_join() {
        let (server, connection_id, connection) = server_with_connection().await;

        server
            .handle_client_message(
                connection_id,
                ClientMessage::SubmitAnswer {
                    player_id: "alice".to_string(),
                    question_id: "q1".to_string(),
                    answer: "alpha".to_string(),
                    time_elapsed: 1.0,
                    timestamp: now_millis(),
                },
            )
            .await;

        let sent = connection.take_sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(error_code_of(&sent[0]), Some(ErrorCode::NotJoined));
    }

    #[tokio::test]
    async fn claiming_another_players_id_is_rejected() {
        let (server, connection_id, connection) = server_with_connection().await;
        server
            .handle_client_message(
                connection_id,
                ClientMessage::JoinGame {
                    player_id: "alice".to_string(),
                    game_room_id: "room-1".to_string(),
                    player_name: None,
                    timestamp: now_millis(),
                },
            )
            .await;
        connection.take_sent();

        server
            .handle_client_message(
                connection_id,
                ClientMessage::BossDamage {
                    player_id: "mallory".to_string(),
                    damage: 5.0,
                    question_id: "q1".to_string(),
                    timestamp: now_millis(),
                },
            )
            .await;

        let sent = connection.take_sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(error_code_of(&sent[0]), Some(ErrorCode::IdentityMismatch));
    }

    #[tokio::test]
    async fn feeder_messages_do_not_require_a_join() {
        let (server, connection_id, connection) = server_with_connection().await;

        server
            .handle_client_message(
                connection_id,
                ClientMessage::NoQuestionsAvailable {
                    message: "pool exhausted".to_string(),
                    timestamp: now_millis(),
                },
            )
            .await;

        // No error reply; the report is logged and absorbed.
        assert!(connection.take_sent().is_empty());
    }
}
