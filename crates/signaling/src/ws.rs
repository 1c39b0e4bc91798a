//! WebSocket-Endpunkt – nimmt Upgrades an und startet Verbindungs-Tasks
//!
//! Der `SignalingServer` stellt `GET /ws` als axum-Router bereit. Jede
//! erfolgreiche Upgrade-Anfrage bekommt einen eigenen Task mit einer
//! `ClientConnection`. Ist das Verbindungslimit erreicht, wird mit 503
//! geantwortet bevor ein Upgrade stattfindet.

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tokio::sync::watch;

use crate::connection::ClientConnection;
use crate::server_state::SignalingState;

/// Pfad des WebSocket-Endpunkts
pub const WS_PFAD: &str = "/ws";

/// WebSocket-Signaling-Server
#[derive(Clone)]
pub struct SignalingServer {
    state: Arc<SignalingState>,
    shutdown_rx: watch::Receiver<bool>,
}

impl SignalingServer {
    /// Erstellt einen neuen SignalingServer
    pub fn neu(state: Arc<SignalingState>, shutdown_rx: watch::Receiver<bool>) -> Self {
        Self { state, shutdown_rx }
    }

    /// Baut den Router mit dem WebSocket-Endpunkt
    pub fn router(self) -> Router {
        Router::new()
            .route(WS_PFAD, get(ws_upgrade))
            .with_state(self)
    }
}

async fn ws_upgrade(State(server): State<SignalingServer>, ws: WebSocketUpgrade) -> Response {
    if server.state.ist_voll() {
        tracing::warn!(
            max = server.state.config.max_verbindungen,
            "Server voll – Verbindung abgelehnt"
        );
        return (StatusCode::SERVICE_UNAVAILABLE, "Server full").into_response();
    }

    let max = server.state.config.max_frame_groesse;
    let verbindung = ClientConnection::neu(Arc::clone(&server.state));
    let shutdown_rx = server.shutdown_rx.clone();

    ws.max_frame_size(max)
        .max_message_size(max)
        .on_upgrade(move |socket| verbindung.verarbeiten(socket, shutdown_rx))
}
