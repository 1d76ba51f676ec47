// src/realtime/routes.rs

use axum::{routing::get, Router};

use super::handlers;

/// Create the realtime router
///
/// # Routes
/// - `GET /ws` - WebSocket upgrade for new-response notifications
pub fn realtime_routes() -> Router {
    Router::new().route("/ws", get(handlers::websocket_handler))
}
