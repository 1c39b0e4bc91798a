//! Message-Dispatcher – Routet eingehende Frames an die richtigen Handler
//!
//! Der Dispatcher empfaengt rohe Text-Frames von einer `ClientConnection`,
//! dekodiert sie und ruft den passenden Handler auf. Antworten gehen nicht
//! als Rueckgabewert zurueck, sondern werden ueber die Registry eingereiht.
//!
//! ## Fehlerbehandlung
//! - Kein JSON, Pflichtfeld fehlt, Frame zu gross: Frame verworfen, Verbindung bleibt offen
//! - Fehlender oder unbekannter `type`: still ignoriert
//!
//! Frames einer Verbindung werden in Empfangsreihenfolge verarbeitet.
//! Frames verschiedener Verbindungen duerfen sich beliebig verschraenken.

use partyhub_core::types::ConnectionId;
use partyhub_protocol::{ClientMessage, FrameCodec, ServerMessage, SignalArt};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::SignalingResult;
use crate::handlers::{lifecycle_handler, relay_handler, TrennungsFolge};
use crate::server_state::SignalingState;

/// Zentraler Message-Dispatcher
///
/// Clone ist billig, jede Verbindung haelt eine eigene Kopie.
#[derive(Clone)]
pub struct MessageDispatcher {
    state: Arc<SignalingState>,
    codec: FrameCodec,
}

impl MessageDispatcher {
    /// Erstellt einen neuen Dispatcher
    pub fn neu(state: Arc<SignalingState>) -> Self {
        let codec = FrameCodec::with_max_size(state.config.max_frame_groesse);
        Self { state, codec }
    }

    /// Gibt den gemeinsamen Zustand zurueck
    pub fn state(&self) -> &Arc<SignalingState> {
        &self.state
    }

    /// Gibt den Codec fuer ausgehende Frames zurueck
    pub fn codec(&self) -> &FrameCodec {
        &self.codec
    }

    /// Registriert eine neue Verbindung und reiht `connected` als erste Nachricht ein
    pub fn verbindung_registrieren(&self) -> (ConnectionId, mpsc::Receiver<ServerMessage>) {
        let (connection_id, rx) = self.state.registry.registrieren();
        self.state.registry.an_verbindung_senden(
            &connection_id,
            ServerMessage::Connected {
                connection_id: connection_id.clone(),
            },
        );
        self.state.gauges_aktualisieren();
        tracing::info!(connection_id = %connection_id, "Verbindung geoeffnet");
        (connection_id, rx)
    }

    /// Dekodiert einen Text-Frame und verarbeitet ihn
    ///
    /// Gibt einen Fehler zurueck wenn der Frame ungueltig war. Der Aufrufer
    /// loggt und macht weiter.
    pub fn dispatch_frame(&self, connection_id: &ConnectionId, frame: &str) -> SignalingResult<()> {
        match self.codec.dekodieren(frame) {
            Ok(Some(nachricht)) => {
                self.dispatch(connection_id, nachricht);
                Ok(())
            }
            Ok(None) => {
                tracing::trace!(connection_id = %connection_id, "Frame ohne bekannten Typ ignoriert");
                Ok(())
            }
            Err(e) => {
                self.state.metrics.frames_invalid_total.inc();
                Err(e.into())
            }
        }
    }

    /// Verarbeitet eine bereits dekodierte Nachricht
    pub fn dispatch(&self, connection_id: &ConnectionId, nachricht: ClientMessage) {
        tracing::trace!(
            connection_id = %connection_id,
            typ = nachricht.typ_name(),
            "Nachricht empfangen"
        );

        let state = self.state.as_ref();
        match nachricht {
            ClientMessage::CreateSession { game_id } => {
                lifecycle_handler::handle_create_session(state, connection_id, game_id);
            }
            ClientMessage::JoinSession { code, player_name } => {
                lifecycle_handler::handle_join_session(state, connection_id, &code, player_name);
            }
            ClientMessage::Offer(req) => {
                relay_handler::handle_signal(state, connection_id, SignalArt::Offer, req);
            }
            ClientMessage::Answer(req) => {
                relay_handler::handle_signal(state, connection_id, SignalArt::Answer, req);
            }
            ClientMessage::IceCandidate(req) => {
                relay_handler::handle_signal(state, connection_id, SignalArt::IceCandidate, req);
            }
            ClientMessage::StartGame => {
                lifecycle_handler::handle_start_game(state, connection_id);
            }
            ClientMessage::Unbekannt => {}
        }
    }

    /// Raeumt nach dem Ende einer Verbindung auf
    ///
    /// Zuerst die Session-Kaskade, danach wird die Verbindung abgemeldet.
    pub fn verbindung_getrennt(&self, connection_id: &ConnectionId) -> TrennungsFolge {
        let folge = lifecycle_handler::handle_disconnect(&self.state, connection_id);
        self.state.registry.entfernen(connection_id);
        self.state.gauges_aktualisieren();
        tracing::info!(connection_id = %connection_id, ?folge, "Verbindung geschlossen");
        folge
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
