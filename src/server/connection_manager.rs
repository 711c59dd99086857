//! Registry of live WebSocket connections.
//!
//! Tracks which room a socket was opened against, which player (if any) it
//! has joined as, and how many sockets each remote address currently holds.
//! Room state never reaches into this registry; handlers look a connection
//! up here first and then act on the room.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::RegisterError;
use crate::connection::Connection;
use crate::protocol::{ConnectionId, PlayerId, RoomId};

/// Book-keeping for one registered socket.
pub(crate) struct ClientConnection {
    pub connection: Arc<dyn Connection>,
    pub client_addr: SocketAddr,
    /// Room id taken from the connection path. Joins must name this room.
    pub room_id: RoomId,
    /// Set once a join_game succeeds on this connection.
    pub player_id: Option<PlayerId>,
    /// Last time a heartbeat refreshed activity, for throttling.
    last_heartbeat_update: Option<Instant>,
}

/// Cheap snapshot of a client entry, cloned out so callers never hold a
/// map guard across an await.
pub(crate) struct ClientView {
    pub connection: Arc<dyn Connection>,
    pub room_id: RoomId,
    pub player_id: Option<PlayerId>,
}

pub(crate) struct ConnectionManager {
    clients: DashMap<ConnectionId, ClientConnection>,
    connections_per_ip: DashMap<IpAddr, usize>,
    max_connections_per_ip: usize,
}

impl ConnectionManager {
    pub fn new(max_connections_per_ip: usize) -> Self {
        Self {
            clients: DashMap::new(),
            connections_per_ip: DashMap::new(),
            max_connections_per_ip,
        }
    }

    pub fn register(
        &self,
        connection_id: ConnectionId,
        connection: Arc<dyn Connection>,
        client_addr: SocketAddr,
        room_id: RoomId,
    ) -> Result<(), RegisterError> {
        self.try_reserve_ip_slot(client_addr.ip())?;
        self.clients.insert(
            connection_id,
            ClientConnection {
                connection,
                client_addr,
                room_id,
                player_id: None,
                last_heartbeat_update: None,
            },
        );
        Ok(())
    }

    /// Atomically claims one connection slot for `ip`, refusing once the
    /// per-IP cap is reached.
    fn try_reserve_ip_slot(&self, ip: IpAddr) -> Result<(), RegisterError> {
        match self.connections_per_ip.entry(ip) {
            Entry::Occupied(mut entry) => {
                let current = *entry.get();
                if current >= self.max_connections_per_ip {
                    return Err(RegisterError::IpLimitExceeded {
                        current,
                        limit: self.max_connections_per_ip,
                    });
                }
                *entry.get_mut() = current + 1;
                Ok(())
            }
            Entry::Vacant(entry) => {
                if self.max_connections_per_ip == 0 {
                    return Err(RegisterError::IpLimitExceeded {
                        current: 0,
                        limit: 0,
                    });
                }
                entry.insert(1);
                Ok(())
            }
        }
    }

    fn release_ip_slot(&self, ip: IpAddr) {
        if let Entry::Occupied(mut entry) = self.connections_per_ip.entry(ip) {
            let current = *entry.get();
            if current <= 1 {
                entry.remove();
            } else {
                *entry.get_mut() = current - 1;
            }
        }
    }

    /// Records that `connection_id` joined as `player_id`.
    pub fn bind_player(&self, connection_id: &ConnectionId, player_id: PlayerId) {
        if let Some(mut client) = self.clients.get_mut(connection_id) {
            client.player_id = Some(player_id);
        }
    }

    /// Clears the player binding after an explicit leave, keeping the
    /// socket registered so the client can join again.
    pub fn clear_player(&self, connection_id: &ConnectionId) {
        if let Some(mut client) = self.clients.get_mut(connection_id) {
            client.player_id = None;
        }
    }

    /// Strips the binding from whichever connection currently holds this
    /// seat. Used when a rejoin on a fresh socket takes the seat over, so
    /// the stale socket can no longer act as the player.
    pub fn unbind_player(&self, room_id: &RoomId, player_id: &PlayerId) {
        for mut client in self.clients.iter_mut() {
            if client.room_id == *room_id && client.player_id.as_ref() == Some(player_id) {
                client.player_id = None;
            }
        }
    }

    pub fn lookup(&self, connection_id: &ConnectionId) -> Option<ClientView> {
        self.clients.get(connection_id).map(|client| ClientView {
            connection: Arc::clone(&client.connection),
            room_id: client.room_id.clone(),
            player_id: client.player_id.clone(),
        })
    }

    /// Deregisters the socket and frees its IP slot. Returns the removed
    /// entry so the caller can unbind the player from its room.
    pub fn remove(&self, connection_id: &ConnectionId) -> Option<ClientConnection> {
        let (_, client) = self.clients.remove(connection_id)?;
        self.release_ip_slot(client.client_addr.ip());
        Some(client)
    }

    /// Returns true when enough time has passed since the last recorded
    /// heartbeat that activity timestamps should be refreshed again, and
    /// stamps the entry when it does.
    pub fn should_update_activity(
        &self,
        connection_id: &ConnectionId,
        threshold: std::time::Duration,
    ) -> bool {
        let Some(mut client) = self.clients.get_mut(connection_id) else {
            return false;
        };
        let now = Instant::now();
        let due = client
            .last_heartbeat_update
            .is_none_or(|last| now.duration_since(last) >= threshold);
        if due {
            client.last_heartbeat_update = Some(now);
        }
        due
    }

    pub fn connection_count(&self) -> usize {
        self.clients.len()
    }

    pub fn joined_player_count(&self) -> usize {
        self.clients
            .iter()
            .filter(|client| client.player_id.is_some())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::RecordingConnection;
    use uuid::Uuid;

    fn addr(ip: [u8; 4], port: u16) -> SocketAddr {
        SocketAddr::from((ip, port))
    }

    fn register_one(manager: &ConnectionManager, ip: [u8; 4], port: u16) -> ConnectionId {
        let id = Uuid::new_v4();
        manager
            .register(
                id,
                RecordingConnection::new(),
                addr(ip, port),
                "room-a".to_string(),
            )
            .unwrap();
        id
    }

    #[test]
    fn enforces_per_ip_limit() {
        let manager = ConnectionManager::new(2);
        register_one(&manager, [10, 0, 0, 1], 4000);
        register_one(&manager, [10, 0, 0, 1], 4001);

        let err = manager
            .register(
                Uuid::new_v4(),
                RecordingConnection::new(),
                addr([10, 0, 0, 1], 4002),
                "room-a".to_string(),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            RegisterError::IpLimitExceeded { current: 2, limit: 2 }
        ));

        // A different address still gets a slot.
        register_one(&manager, [10, 0, 0, 2], 4000);
        assert_eq!(manager.connection_count(), 3);
    }

    #[test]
    fn removing_a_connection_frees_its_ip_slot() {
        let manager = ConnectionManager::new(1);
        let id = register_one(&manager, [10, 0, 0, 3], 4000);
        assert!(manager
            .register(
                Uuid::new_v4(),
                RecordingConnection::new(),
                addr([10, 0, 0, 3], 4001),
                "room-a".to_string(),
            )
            .is_err());

        manager.remove(&id);
        register_one(&manager, [10, 0, 0, 3], 4001);
    }

    #[test]
    fn bind_and_clear_player() {
        let manager = ConnectionManager::new(4);
        let id = register_one(&manager, [10, 0, 0, 4], 4000);
        assert_eq!(manager.joined_player_count(), 0);

        manager.bind_player(&id, "alice".to_string());
        let view = manager.lookup(&id).unwrap();
        assert_eq!(view.player_id.as_deref(), Some("alice"));
        assert_eq!(view.room_id, "room-a");
        assert_eq!(manager.joined_player_count(), 1);

        manager.clear_player(&id);
        assert_eq!(manager.lookup(&id).unwrap().player_id, None);
        assert_eq!(manager.connection_count(), 1);
    }

    #[test]
    fn unbind_player_strips_the_old_binding() {
        let manager = ConnectionManager::new(4);
        let stale = register_one(&manager, [10, 0, 0, 7], 4000);
        let fresh = register_one(&manager, [10, 0, 0, 7], 4001);
        manager.bind_player(&stale, "alice".to_string());

        manager.unbind_player(&"room-a".to_string(), &"alice".to_string());
        manager.bind_player(&fresh, "alice".to_string());

        assert_eq!(manager.lookup(&stale).unwrap().player_id, None);
        assert_eq!(manager.lookup(&fresh).unwrap().player_id.as_deref(), Some("alice"));
        assert_eq!(manager.joined_player_count(), 1);
    }

    #[test]
    fn heartbeat_updates_are_throttled() {
        let manager = ConnectionManager::new(4);
        let id = register_one(&manager, [10, 0, 0, 5], 4000);
        let threshold = std::time::Duration::from_secs(30);

        assert!(manager.should_update_activity(&id, threshold));
        assert!(!manager.should_update_activity(&id, threshold));
        assert!(manager.should_update_activity(&id, std::time::Duration::ZERO));
    }

    #[test]
    fn zero_limit_rejects_everything() {
        let manager = ConnectionManager::new(0);
        let err = manager
            .register(
                Uuid::new_v4(),
                RecordingConnection::new(),
                addr([10, 0, 0, 6], 4000),
                "room-a".to_string(),
            )
            .unwrap_err();
        assert!(matches!(err, RegisterError::IpLimitExceeded { limit: 0, .. }));
    }
}
