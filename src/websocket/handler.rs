use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, Path, State};
use axum::response::Response;
use std::net::SocketAddr;
use std::sync::Arc;

use super::connection::handle_socket;
use crate::server::BattleServer;

/// WebSocket upgrade handler for the game protocol. The room id comes from
/// the path and scopes everything the connection later does.
pub async fn game_ws_handler(
    ws: WebSocketUpgrade,
    Path(room_id): Path<String>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(server): State<Arc<BattleServer>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, server, room_id, addr))
}
