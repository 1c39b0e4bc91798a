//! Lifecycle-Handler – create-session, join-session, start-game, Trennung
//!
//! Session-Zustandsmaschine:
//! ```text
//! Lobby --start-game--> Playing
//! Lobby | Playing --Host getrennt--> Ended (Session aus dem Store entfernt)
//! ```
//!
//! Alle Lookups scheitern weich: unbekannte Sessions oder Verbindungen
//! fuehren zu einer `error`-Antwort (Join) oder zu einem No-op.

use partyhub_core::types::ConnectionId;
use partyhub_protocol::control::{STANDARD_SPIEL, STANDARD_SPIELERNAME};
use partyhub_protocol::ServerMessage;

use crate::server_state::SignalingState;
use crate::session_store::StartErgebnis;

/// Fehlermeldung fuer unbekannte Join-Codes
pub const MELDUNG_SESSION_UNBEKANNT: &str = "Session not found";

/// Was beim Trennen einer Verbindung passiert ist
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrennungsFolge {
    /// Verbindung gehoerte zu keiner Session
    KeineSession,
    /// Host getrennt: Session entfernt, `benachrichtigt` Spieler erhielten `session-ended`
    SessionBeendet { benachrichtigt: usize },
    /// Spieler getrennt und aus der Session entfernt
    SpielerEntfernt { player_index: u32, host_benachrichtigt: bool },
}

/// Verarbeitet `create-session`: legt eine Session mit dem Absender als Host an
pub fn handle_create_session(
    state: &SignalingState,
    connection_id: &ConnectionId,
    game_id: Option<String>,
) {
    let game_id = game_id.unwrap_or_else(|| STANDARD_SPIEL.to_string());

    let antwort = match state.sessions.session_erstellen(connection_id, game_id) {
        Ok(session) => {
            state.metrics.sessions_created_total.inc();
            state.gauges_aktualisieren();
            ServerMessage::SessionCreated {
                session_id: session.id,
                code: session.code,
            }
        }
        Err(e) => {
            tracing::warn!(connection_id = %connection_id, fehler = %e, "create-session abgelehnt");
            ServerMessage::error(e.client_meldung())
        }
    };

    state.registry.an_verbindung_senden(connection_id, antwort);
}

/// Verarbeitet `join-session`
///
/// Bei Erfolg gehen zwei Nachrichten raus: `session-joined` an den Spieler
/// und `player-joined` an den Host. Beide werden unter dem Session-Mutex
/// eingereiht.
pub fn handle_join_session(
    state: &SignalingState,
    connection_id: &ConnectionId,
    code: &str,
    player_name: Option<String>,
) {
    let Some(session) = state.sessions.nach_code(code) else {
        tracing::debug!(connection_id = %connection_id, code, "Join mit unbekanntem Code");
        state
            .registry
            .an_verbindung_senden(connection_id, ServerMessage::error(MELDUNG_SESSION_UNBEKANNT));
        return;
    };

    let name = player_name.unwrap_or_else(|| STANDARD_SPIELERNAME.to_string());
    let ergebnis = state
        .sessions
        .spieler_hinzufuegen_mit(&session.id, connection_id, name, |session, player| {
            state.registry.an_verbindung_senden(
                connection_id,
                ServerMessage::SessionJoined {
                    session_id: session.id.clone(),
                    player_id: player.id.clone(),
                    player_index: player.player_index,
                },
            );
            state.registry.an_verbindung_senden(
                &session.host_connection_id,
                ServerMessage::PlayerJoined {
                    player_id: player.id.clone(),
                    player_name: player.name.clone(),
                    player_index: player.player_index,
                    connection_id: connection_id.clone(),
                },
            );
        });

    match ergebnis {
        Ok(player) => {
            state.metrics.players_joined_total.inc();
            tracing::info!(
                connection_id = %connection_id,
                session_id = %session.id,
                player_index = player.player_index,
                "Spieler beigetreten"
            );
        }
        Err(e) => {
            tracing::debug!(
                connection_id = %connection_id,
                session_id = %session.id,
                fehler = %e,
                "Join abgelehnt"
            );
            state
                .registry
                .an_verbindung_senden(connection_id, ServerMessage::error(e.client_meldung()));
        }
    }
}

/// Verarbeitet `start-game`: nur der Host darf starten, sonst No-op
pub fn handle_start_game(state: &SignalingState, connection_id: &ConnectionId) {
    let Some(session) = state.sessions.nach_verbindung(connection_id) else {
        tracing::debug!(connection_id = %connection_id, "start-game ohne Session ignoriert");
        return;
    };

    match state.sessions.spiel_starten(&session.id, connection_id) {
        StartErgebnis::Gestartet(spieler) => {
            let zugestellt = state
                .registry
                .an_verbindungen_senden(&spieler, ServerMessage::GameStarted);
            tracing::info!(
                session_id = %session.id,
                spieler = spieler.len(),
                zugestellt,
                "Spiel gestartet"
            );
        }
        StartErgebnis::NichtHost => {
            tracing::debug!(
                connection_id = %connection_id,
                session_id = %session.id,
                "start-game von Nicht-Host ignoriert"
            );
        }
        StartErgebnis::Unbekannt => {}
    }
}

/// Raeumt nach dem Ende einer Verbindung auf
///
/// Wird genau einmal pro Verbindung aufgerufen, egal ob sauber geschlossen,
/// Lesefehler oder Timeout.
pub fn handle_disconnect(state: &SignalingState, connection_id: &ConnectionId) -> TrennungsFolge {
    let Some(session) = state.sessions.nach_verbindung(connection_id) else {
        return TrennungsFolge::KeineSession;
    };

    if session.ist_host(connection_id) {
        let Some(entfernt) = state.sessions.session_entfernen(&session.id) else {
            return TrennungsFolge::KeineSession;
        };
        state.gauges_aktualisieren();

        let spieler = entfernt.spieler_verbindungen();
        let benachrichtigt = state
            .registry
            .an_verbindungen_senden(&spieler, ServerMessage::SessionEnded);

        tracing::info!(
            session_id = %entfernt.id,
            code = %entfernt.code,
            spieler = spieler.len(),
            benachrichtigt,
            "Host getrennt – Session beendet"
        );
        return TrennungsFolge::SessionBeendet { benachrichtigt };
    }

    let Some(player) = state.sessions.spieler_entfernen(&session.id, connection_id) else {
        return TrennungsFolge::KeineSession;
    };

    let host_benachrichtigt = state.registry.an_verbindung_senden(
        &session.host_connection_id,
        ServerMessage::PlayerLeft {
            player_id: player.id.clone(),
            player_index: player.player_index,
        },
    );

    tracing::info!(
        session_id = %session.id,
        player_id = %player.id,
        player_index = player.player_index,
        "Spieler getrennt"
    );
    TrennungsFolge::SpielerEntfernt {
        player_index: player.player_index,
        host_benachrichtigt,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
