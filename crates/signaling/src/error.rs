//! Fehlertypen fuer den Signaling-Service

use partyhub_protocol::ProtocolError;
use thiserror::Error;

/// Fehlertyp fuer den Signaling-Service
#[derive(Debug, Error)]
pub enum SignalingError {
    /// Ungueltiger Frame (kein JSON, Pflichtfeld fehlt, zu gross)
    #[error("Protokollfehler: {0}")]
    Protokoll(#[from] ProtocolError),

    /// Session existiert nicht (mehr)
    #[error("Session nicht gefunden: {0}")]
    SessionNichtGefunden(String),

    /// Session wird gerade entfernt (Host getrennt)
    #[error("Session ist beendet")]
    SessionBeendet,

    /// Spiel laeuft bereits und spaete Beitritte sind deaktiviert
    #[error("Session ist gesperrt (Spiel laeuft)")]
    LobbyGesperrt,

    /// Verbindung ist bereits Host oder Spieler einer Session
    #[error("Verbindung ist bereits in einer Session")]
    BereitsInSession,

    /// Kein freier Join-Code nach allen Versuchen
    #[error("Kein freier Join-Code verfuegbar")]
    KeinCodeFrei,

    /// Lesen oder Schreiben auf dem WebSocket fehlgeschlagen
    #[error("Transportfehler: {0}")]
    Transport(#[from] axum::Error),
}

impl SignalingError {
    /// Fehlermeldung die im `error`-Frame an den Client geht
    pub fn client_meldung(&self) -> &'static str {
        match self {
            Self::Protokoll(_) | Self::Transport(_) => "Invalid message",
            Self::SessionNichtGefunden(_) | Self::SessionBeendet | Self::LobbyGesperrt => {
                "Could not join session"
            }
            Self::BereitsInSession => "Already in a session",
            Self::KeinCodeFrei => "Could not create session",
        }
    }
}

/// Result-Typ fuer den Signaling-Service
pub type SignalingResult<T> = Result<T, SignalingError>;
