// WebSocket layer
//
// - handler: upgrade endpoint for /game/{room_id} (entry point)
// - connection: per-socket pump, decode loop, and dispatch into the server
// - routes: router assembly (game endpoint, health, CORS, tracing)

mod connection;
mod handler;
mod routes;

pub use handler::game_ws_handler;
pub use routes::{create_router, run_server};
