//! Battle server hub: room registry, connection registry, and the
//! message handlers that drive a battle forward.
//!
//! The hub itself is deliberately thin. Game rules live in
//! [`crate::game::GameRoom`]; the submodules here translate decoded client
//! messages into room calls and fan the resulting broadcasts out to the
//! room's connected players.

use std::net::SocketAddr;
use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::connection::Connection;
use crate::game::{resolve_boss, resolve_questions, ContentSource, GameRoom};
use crate::protocol::{ConnectionId, RoomId};

mod battle_service;
mod connection_manager;
mod countdown;
mod heartbeat;
mod maintenance;
mod message_router;
mod messaging;
mod room_service;

use connection_manager::ConnectionManager;

fn chrono_seconds(secs: u64) -> chrono::Duration {
    i64::try_from(secs).map_or(chrono::Duration::MAX, chrono::Duration::seconds)
}

/// Why a new connection was refused at registration time.
#[derive(Debug, Error)]
pub enum RegisterError {
    #[error("too many connections from this address ({current}/{limit})")]
    IpLimitExceeded { current: usize, limit: usize },
}

/// A registered room plus the handle used to stop its countdown task.
///
/// The room state sits behind a single async mutex: every handler takes the
/// lock, applies its change, queues outbound frames (queueing never blocks)
/// and releases. The cancellation token is triggered when the battle ends or
/// the room is destroyed, whichever comes first.
pub struct RoomCell {
    pub(crate) room: Mutex<GameRoom>,
    pub(crate) countdown: CancellationToken,
}

impl RoomCell {
    fn new(room: GameRoom) -> Arc<Self> {
        Arc::new(Self {
            room: Mutex::new(room),
            countdown: CancellationToken::new(),
        })
    }

    /// Locks the room state. Exposed for integration tests that assert on
    /// room internals without going over the wire.
    pub async fn lock(&self) -> tokio::sync::MutexGuard<'_, GameRoom> {
        self.room.lock().await
    }
}

/// Server-authoritative coordinator for all active battles.
pub struct BattleServer {
    /// Active rooms keyed by the room id from the connection path.
    rooms: DashMap<RoomId, Arc<RoomCell>>,
    /// Connection registry (socket handles, IP accounting, player bindings).
    connections: ConnectionManager,
    /// Upstream supplying boss metadata and question pools.
    content: Arc<dyn ContentSource>,
    /// Full server configuration, shared by every handler.
    config: Config,
}

impl BattleServer {
    pub fn new(config: Config, content: Arc<dyn ContentSource>) -> Arc<Self> {
        let connections = ConnectionManager::new(config.server.max_connections_per_ip);
        Arc::new(Self {
            rooms: DashMap::new(),
            connections,
            content,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.connection_count()
    }

    /// Connections that have completed a join and are bound to a player.
    pub fn joined_player_count(&self) -> usize {
        self.connections.joined_player_count()
    }

    pub fn room(&self, room_id: &RoomId) -> Option<Arc<RoomCell>> {
        self.rooms.get(room_id).map(|entry| Arc::clone(entry.value()))
    }

    /// Fetches the room, creating it on first join. Content resolution runs
    /// before touching the registry so a slow upstream never stalls other
    /// rooms, and a concurrent creation race resolves to whichever cell
    /// landed in the map first.
    pub async fn room_or_create(&self, room_id: &RoomId) -> Arc<RoomCell> {
        if let Some(cell) = self.room(room_id) {
            return cell;
        }

        let content_cfg = &self.config.content;
        let timeout = std::time::Duration::from_secs(content_cfg.request_timeout_secs);
        let boss = resolve_boss(
            self.content.as_ref(),
            &content_cfg.default_boss_id,
            self.config.game.base_boss_health,
            timeout,
        )
        .await;
        let category_id = boss
            .category_id
            .clone()
            .unwrap_or_else(|| content_cfg.default_category_id.clone());
        let questions = resolve_questions(self.content.as_ref(), &category_id, timeout).await;

        let room = GameRoom::new(
            room_id.clone(),
            boss,
            questions,
            self.config.game.clone(),
        );
        let cell = RoomCell::new(room);
        let entry = self
            .rooms
            .entry(room_id.clone())
            .or_insert_with(|| Arc::clone(&cell));
        let cell = Arc::clone(entry.value());
        drop(entry);
        tracing::info!(room_id = %room_id, "Room ready");
        cell
    }

    /// Removes the room from the registry and stops its countdown task.
    /// Surviving connections keep their sockets; their next join simply
    /// recreates the room.
    pub(crate) fn destroy_room(&self, room_id: &RoomId, reason: &str) {
        if let Some((_, cell)) = self.rooms.remove(room_id) {
            cell.countdown.cancel();
            tracing::info!(room_id = %room_id, reason, "Room destroyed");
        }
    }

    /// Registers a freshly upgraded socket against its path room id.
    pub(crate) fn register_connection(
        &self,
        connection_id: ConnectionId,
        connection: Arc<dyn Connection>,
        client_addr: SocketAddr,
        room_id: RoomId,
    ) -> Result<(), RegisterError> {
        self.connections
            .register(connection_id, connection, client_addr, room_id)
    }
}
