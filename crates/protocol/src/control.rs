//! Control-Protokoll (WebSocket, JSON)
//!
//! Definiert alle Nachrichten die zwischen Clients (Host-PC, Controller-
//! Telefon) und dem Signaling-Server ausgetauscht werden.
//!
//! ## Design
//! - Jede Nachricht ist ein JSON-Objekt mit einem `type`-Feld
//! - Tagged Enums fuer typsichere Nachrichtentypen
//! - Feldnamen auf dem Draht in camelCase, `type`-Werte in kebab-case
//! - Handshake-Payloads (`sdp`, `candidate`, ...) bleiben opake JSON-Werte

use partyhub_core::types::{ConnectionId, PlayerId, SessionId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Standard-Spiel wenn `create-session` kein `gameId` mitschickt
pub const STANDARD_SPIEL: &str = "pong";

/// Standard-Spielername wenn `join-session` keinen Namen mitschickt
pub const STANDARD_SPIELERNAME: &str = "Player";

/// Felder die der Relay unveraendert an den Empfaenger durchreicht
pub const SIGNAL_FELDER: [&str; 4] = ["sdp", "candidate", "sdpMid", "sdpMLineIndex"];

// ---------------------------------------------------------------------------
// Client -> Server
// ---------------------------------------------------------------------------

/// Nachricht vom Client an den Server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Neue Session anlegen, der Absender wird Host
    #[serde(rename_all = "camelCase")]
    CreateSession {
        #[serde(default)]
        game_id: Option<String>,
    },
    /// Session per Join-Code beitreten
    #[serde(rename_all = "camelCase")]
    JoinSession {
        code: String,
        #[serde(default)]
        player_name: Option<String>,
    },
    /// WebRTC-Offer an `targetId` weiterleiten
    Offer(SignalRequest),
    /// WebRTC-Answer an `targetId` weiterleiten
    Answer(SignalRequest),
    /// ICE-Kandidat an `targetId` weiterleiten
    IceCandidate(SignalRequest),
    /// Spiel starten (nur Host)
    StartGame,
    /// Unbekannter `type` – wird ignoriert
    #[serde(other)]
    Unbekannt,
}

impl ClientMessage {
    /// Name des Nachrichtentyps fuer Logs
    pub fn typ_name(&self) -> &'static str {
        match self {
            Self::CreateSession { .. } => "create-session",
            Self::JoinSession { .. } => "join-session",
            Self::Offer(_) => "offer",
            Self::Answer(_) => "answer",
            Self::IceCandidate(_) => "ice-candidate",
            Self::StartGame => "start-game",
            Self::Unbekannt => "unbekannt",
        }
    }
}

/// Handshake-Nachricht die an eine andere Verbindung weitergeleitet wird
///
/// Alle Felder ausser `targetId` landen in `payload` und werden vom Server
/// nicht interpretiert.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalRequest {
    pub target_id: ConnectionId,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl SignalRequest {
    /// Filtert den Payload auf die durchzureichenden Handshake-Felder
    ///
    /// Alles andere (inklusive eines gefaelschten `fromId`) wird verworfen.
    pub fn durchreich_payload(&self) -> Map<String, Value> {
        self.payload
            .iter()
            .filter(|(k, _)| SIGNAL_FELDER.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Art der weitergeleiteten Handshake-Nachricht
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalArt {
    Offer,
    Answer,
    IceCandidate,
}

// ---------------------------------------------------------------------------
// Server -> Client
// ---------------------------------------------------------------------------

/// Weitergeleitete Handshake-Nachricht mit serverseitig gesetztem Absender
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalEnvelope {
    pub from_id: ConnectionId,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

/// Nachricht vom Server an einen Client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Erste Nachricht nach dem Verbindungsaufbau
    #[serde(rename_all = "camelCase")]
    Connected { connection_id: ConnectionId },
    /// Antwort an den Host auf `create-session`
    #[serde(rename_all = "camelCase")]
    SessionCreated { session_id: SessionId, code: String },
    /// Antwort an den Spieler auf `join-session`
    #[serde(rename_all = "camelCase")]
    SessionJoined {
        session_id: SessionId,
        player_id: PlayerId,
        player_index: u32,
    },
    /// Benachrichtigung an den Host: neuer Spieler
    #[serde(rename_all = "camelCase")]
    PlayerJoined {
        player_id: PlayerId,
        player_name: String,
        player_index: u32,
        connection_id: ConnectionId,
    },
    /// Benachrichtigung an den Host: Spieler getrennt
    #[serde(rename_all = "camelCase")]
    PlayerLeft { player_id: PlayerId, player_index: u32 },
    /// Spiel wurde vom Host gestartet
    GameStarted,
    /// Host hat die Session verlassen
    SessionEnded,
    /// Fehlermeldung
    Error { message: String },
    Offer(SignalEnvelope),
    Answer(SignalEnvelope),
    IceCandidate(SignalEnvelope),
}

impl ServerMessage {
    /// Erstellt eine Fehler-Nachricht
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Erstellt eine weitergeleitete Handshake-Nachricht
    pub fn signal(art: SignalArt, from_id: ConnectionId, payload: Map<String, Value>) -> Self {
        let envelope = SignalEnvelope { from_id, payload };
        match art {
            SignalArt::Offer => Self::Offer(envelope),
            SignalArt::Answer => Self::Answer(envelope),
            SignalArt::IceCandidate => Self::IceCandidate(envelope),
        }
    }

    /// Name des Nachrichtentyps fuer Logs
    pub fn typ_name(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::SessionCreated { .. } => "session-created",
            Self::SessionJoined { .. } => "session-joined",
            Self::PlayerJoined { .. } => "player-joined",
            Self::PlayerLeft { .. } => "player-left",
            Self::GameStarted => "game-started",
            Self::SessionEnded => "session-ended",
            Self::Error { .. } => "error",
            Self::Offer(_) => "offer",
            Self::Answer(_) => "answer",
            Self::IceCandidate(_) => "ice-candidate",
        }
    }

    /// Serialisiert die Nachricht als JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Deserialisiert eine Nachricht aus JSON
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_session_mit_und_ohne_game_id() {
        let msg: ClientMessage =
            serde_json::from_value(json!({"type": "create-session", "gameId": "quiz"})).unwrap();
        assert!(matches!(msg, ClientMessage::CreateSession { game_id: Some(ref g) } if g == "quiz"));

        let msg: ClientMessage = serde_json::from_value(json!({"type": "create-session"})).unwrap();
        assert!(matches!(msg, ClientMessage::CreateSession { game_id: None }));
    }

    #[test]
    fn join_session_ohne_code_ist_ungueltig() {
        let result: Result<ClientMessage, _> =
            serde_json::from_value(json!({"type": "join-session", "playerName": "Alice"}));
        assert!(result.is_err());
    }

    #[test]
    fn unbekannter_typ_wird_erkannt() {
        let msg: ClientMessage =
            serde_json::from_value(json!({"type": "dance", "x": 1})).unwrap();
        assert!(matches!(msg, ClientMessage::Unbekannt));
    }

    #[test]
    fn ice_candidate_payload_wird_gefiltert() {
        let msg: ClientMessage = serde_json::from_value(json!({
            "type": "ice-candidate",
            "targetId": "ziel",
            "candidate": "candidate:1 1 udp 2122260223 10.0.0.2 54400 typ host",
            "sdpMid": null,
            "sdpMLineIndex": 0,
            "fromId": "gefaelscht",
            "extra": true
        }))
        .unwrap();

        let ClientMessage::IceCandidate(req) = msg else {
            panic!("Erwartet IceCandidate");
        };
        assert_eq!(req.target_id.as_str(), "ziel");

        let payload = req.durchreich_payload();
        assert_eq!(payload.len(), 3);
        assert!(payload.contains_key("candidate"));
        assert_eq!(payload.get("sdpMid"), Some(&Value::Null));
        assert_eq!(payload.get("sdpMLineIndex"), Some(&json!(0)));
        assert!(!payload.contains_key("fromId"));
        assert!(!payload.contains_key("extra"));
    }

    #[test]
    fn server_nachrichten_wire_format() {
        let msg = ServerMessage::PlayerJoined {
            player_id: PlayerId("p1".into()),
            player_name: "Alice".into(),
            player_index: 0,
            connection_id: ConnectionId::from("c1"),
        };
        let wert = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            wert,
            json!({
                "type": "player-joined",
                "playerId": "p1",
                "playerName": "Alice",
                "playerIndex": 0,
                "connectionId": "c1"
            })
        );

        let wert = serde_json::to_value(ServerMessage::GameStarted).unwrap();
        assert_eq!(wert, json!({"type": "game-started"}));
    }

    #[test]
    fn signal_envelope_wire_format() {
        let mut payload = Map::new();
        payload.insert("sdp".into(), json!("v=0"));
        let msg = ServerMessage::signal(SignalArt::Offer, ConnectionId::from("sender"), payload);

        let wert = serde_json::to_value(&msg).unwrap();
        assert_eq!(wert, json!({"type": "offer", "fromId": "sender", "sdp": "v=0"}));

        let zurueck = ServerMessage::from_json(&msg.to_json().unwrap()).unwrap();
        assert_eq!(zurueck, msg);
    }
}
