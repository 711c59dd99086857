use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::Json;

use crate::config::Config;
use crate::game::FallbackContent;
use crate::server::BattleServer;

use super::handler::game_ws_handler;

/// Create the Axum router: the per-room WebSocket endpoint plus a health
/// probe, behind CORS and request tracing.
pub fn create_router(cors_origins: &str) -> axum::Router<Arc<BattleServer>> {
    use tower_http::cors::{Any, CorsLayer};
    use tower_http::trace::TraceLayer;

    // Parse CORS origins
    let cors = if cors_origins == "*" {
        CorsLayer::permissive()
    } else {
        let origins: Vec<_> = cors_origins
            .split(',')
            .filter_map(|s| s.trim().parse::<axum::http::HeaderValue>().ok())
            .collect();

        if origins.is_empty() {
            tracing::warn!("No valid CORS origins configured, using permissive CORS");
            CorsLayer::permissive()
        } else {
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    };

    axum::Router::new()
        .route("/game/{room_id}", get(game_ws_handler))
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Health check endpoint with live occupancy counts.
async fn health_check(State(server): State<Arc<BattleServer>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "rooms": server.room_count(),
        "players": server.joined_player_count(),
        "connections": server.connection_count(),
    }))
}

/// Build the battle server from `config` and serve until ctrl-c.
pub async fn run_server(config: Config) -> anyhow::Result<()> {
    let content = Arc::new(FallbackContent::new(config.game.base_boss_health));
    let server = BattleServer::new(config, content);

    // Start cleanup task
    let cleanup_server = Arc::clone(&server);
    tokio::spawn(async move {
        cleanup_server.cleanup_task().await;
    });

    let cors_origins = server.config().server.cors_allowed_origins.clone();
    let app = create_router(&cors_origins).with_state(Arc::clone(&server));

    let addr = format!("{}:{}", server.config().server.host, server.config().port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        cors_origins = %cors_origins,
        "Server started - WebSocket endpoint: /game/{{room_id}}, health: /health"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to install ctrl-c handler");
        return;
    }
    tracing::info!("Shutdown signal received, closing listener");
}
