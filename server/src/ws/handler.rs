use axum::{
    extract::{ws::WebSocketUpgrade, ConnectInfo, State},
    response::Response,
};
use std::net::SocketAddr;

use crate::state::AppState;

/// GET /ws
/// WebSocket upgrade endpoint. Connections are not authenticated: any client
/// that upgrades becomes a relay target and may relay to everyone else.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> Response {
    tracing::debug!(peer = %addr, "WebSocket upgrade requested");

    let gateway = state.gateway.clone();
    ws.on_upgrade(move |socket| gateway.serve(socket))
}
