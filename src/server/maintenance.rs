//! Periodic room maintenance.

use std::time::Duration;

use super::{chrono_seconds, room_service, BattleServer};
use crate::protocol::RoomId;

impl BattleServer {
    /// Background sweep run for the life of the process. Each pass expires
    /// reconnect grace windows and tears down rooms nobody is using.
    pub async fn cleanup_task(&self) {
        let mut interval = tokio::time::interval(Duration::from_secs(
            self.config.rooms.cleanup_interval.max(1),
        ));
        loop {
            interval.tick().await;
            self.run_cleanup_pass().await;
        }
    }

    /// One maintenance pass. Split out of the loop so tests can invoke it
    /// directly instead of waiting on the interval.
    pub async fn run_cleanup_pass(&self) {
        let grace = Duration::from_secs(self.config.rooms.reconnect_grace_secs);
        let empty_timeout = chrono_seconds(self.config.rooms.empty_room_timeout);
        let inactive_timeout = chrono_seconds(self.config.rooms.inactive_room_timeout);

        // Clone the registry entries first; destroying a room mutates the
        // map and must not happen under its iterator.
        let cells: Vec<(RoomId, std::sync::Arc<super::RoomCell>)> = self
            .rooms
            .iter()
            .map(|entry| (entry.key().clone(), std::sync::Arc::clone(entry.value())))
            .collect();

        for (room_id, cell) in cells {
            let mut destroy_reason: Option<&str> = None;
            {
                let mut room = cell.room.lock().await;
                for player_id in room.players_past_grace(grace) {
                    tracing::info!(
                        room_id = %room_id,
                        player_id = %player_id,
                        "Reconnect grace expired, removing player"
                    );
                    if let Some(outcome) = room_service::apply_leave(&mut room, &player_id) {
                        if outcome.room_empty {
                            destroy_reason = Some("grace expiry emptied the room");
                        }
                    }
                }
                if destroy_reason.is_none()
                    && room.is_expired(empty_timeout, inactive_timeout)
                {
                    destroy_reason = Some("room expired");
                }
            }
            if let Some(reason) = destroy_reason {
                self.destroy_room(&room_id, reason);
            }
        }
    }
}
