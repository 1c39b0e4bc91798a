//! Relay-Handler – Offer, Answer, ICE-Kandidaten
//!
//! Der Server interpretiert die Handshake-Payloads nicht. Er setzt
//! `fromId` auf die echte Absender-ID und reicht nur die bekannten
//! Handshake-Felder weiter. Ziele die nicht (mehr) verbunden sind werden
//! still verworfen.
//!
//! Zwischen Absender und Ziel wird keine Session-Zugehoerigkeit geprueft,
//! jede Verbindung kann jede andere adressieren deren ID sie kennt.

use partyhub_core::types::ConnectionId;
use partyhub_protocol::{ServerMessage, SignalArt, SignalRequest};

use crate::server_state::SignalingState;

/// Leitet eine Handshake-Nachricht an ihr Ziel weiter
///
/// Gibt `true` zurueck wenn die Nachricht eingereiht wurde.
pub fn handle_signal(
    state: &SignalingState,
    from_id: &ConnectionId,
    art: SignalArt,
    request: SignalRequest,
) -> bool {
    if request.target_id.as_str().is_empty() {
        tracing::debug!(from_id = %from_id, ?art, "Signal ohne Ziel verworfen");
        state.metrics.signals_dropped_total.inc();
        return false;
    }

    let nachricht = ServerMessage::signal(art, from_id.clone(), request.durchreich_payload());
    let zugestellt = state.registry.an_verbindung_senden(&request.target_id, nachricht);
    if zugestellt {
        state.metrics.signals_relayed_total.inc();
    } else {
        tracing::debug!(
            from_id = %from_id,
            target_id = %request.target_id,
            ?art,
            "Signal-Ziel nicht erreichbar – verworfen"
        );
        state.metrics.signals_dropped_total.inc();
    }
    zugestellt
}
