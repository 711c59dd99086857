use super::BattleServer;
use crate::protocol::{ConnectionId, PlayerId};

impl BattleServer {
    /// Handle an application-level heartbeat.
    ///
    /// Heartbeats carry no reply; their only job is to keep the room and
    /// player activity timestamps fresh so the cleanup pass leaves live
    /// sessions alone. Updates are throttled by
    /// `websocket.heartbeat_throttle_secs` to keep chatty clients cheap.
    pub(crate) async fn handle_heartbeat(
        &self,
        connection_id: ConnectionId,
        claimed: Option<&PlayerId>,
    ) {
        let threshold =
            std::time::Duration::from_secs(self.config.websocket.heartbeat_throttle_secs);
        let should_update = threshold.is_zero()
            || self.connections.should_update_activity(&connection_id, threshold);
        if !should_update {
            tracing::trace!(%connection_id, "Heartbeat throttled");
            return;
        }

        let Some(client) = self.connections.lookup(&connection_id) else {
            return;
        };
        let Some(cell) = self.room(&client.room_id) else {
            return;
        };
        let mut room = cell.room.lock().await;
        room.touch();
        if let Some(player_id) = &client.player_id {
            if let Some(other) = claimed.filter(|c| *c != player_id) {
                tracing::trace!(
                    %connection_id,
                    bound = %player_id,
                    claimed = %other,
                    "Heartbeat claims a different player id, touching the bound player"
                );
            }
            if let Some(player) = room.player_mut(player_id) {
                player.touch();
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
    use crate::protocol::{now_millis, ClientMessage};

    async fn joined_server(throttle_secs: u64) -> (Arc<BattleServer>, ConnectionId) {
        let mut config = Config::default();
        config.websocket.heartbeat_throttle_secs = throttle_secs;
        let content = Arc::new(FallbackContent::new(config.game.base_boss_health));
        let server = BattleServer::new(config, content);
        let connection = RecordingConnection::new();
        let connection_id = uuid::Uuid::new_v4();
        server
            .register_connection(
                connection_id,
                connection,
                std::net::SocketAddr::from(([127, 0, 0, 1], 42001)),
                "room-1".to_string(),
            )
            .unwrap();
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
        (server, connection_id)
    }

    async fn player_last_activity(server: &BattleServer) -> std::time::Instant {
        let cell = server.room(&"room-1".to_string()).unwrap();
        let room = cell.lock().await;
        room.player(&"alice".to_string()).unwrap().last_activity
    }

    #[tokio::test]
    async fn heartbeat_refreshes_player_activity() {
        let (server, connection_id) = joined_server(0).await;
        let before = player_last_activity(&server).await;

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        server
            .handle_heartbeat(connection_id, Some(&"alice".to_string()))
            .await;

        assert!(player_last_activity(&server).await > before);
    }

    #[tokio::test]
    async fn heartbeats_inside_the_throttle_window_are_dropped() {
        let (server, connection_id) = joined_server(3600).await;
        server.handle_heartbeat(connection_id, None).await;
        let stamped = player_last_activity(&server).await;

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        server.handle_heartbeat(connection_id, None).await;

        assert_eq!(player_last_activity(&server).await, stamped);
    }
}
