//! Gemeinsame Identifikationstypen fuer PartyHub
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! Verbindungs-, Session- und Spieler-IDs zur Compilezeit auszuschliessen.
//! Auf dem Draht sind sie einfache Strings (`#[serde(transparent)]`).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Laenge einer Verbindungs-ID in Hex-Zeichen (64 Bit Zufall)
const VERBINDUNGS_ID_LAENGE: usize = 16;
/// Laenge einer Session-ID in Hex-Zeichen
const SESSION_ID_LAENGE: usize = 12;
/// Laenge einer Spieler-ID in Hex-Zeichen
const SPIELER_ID_LAENGE: usize = 8;

/// Zufaelliger Hex-String aus einer v4-UUID, gekuerzt auf `laenge` Zeichen
fn zufalls_hex(laenge: usize) -> String {
    let mut s = Uuid::new_v4().simple().to_string();
    s.truncate(laenge);
    s
}

/// Ephemere Verbindungs-ID
///
/// Wird beim Verbindungsaufbau von der Connection-Registry vergeben und
/// lebt nur solange der Transport offen ist.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub String);

impl ConnectionId {
    /// Erstellt eine neue zufaellige ConnectionId
    pub fn new() -> Self {
        Self(zufalls_hex(VERBINDUNGS_ID_LAENGE))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConnectionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Eindeutige Session-ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Erstellt eine neue zufaellige SessionId
    pub fn new() -> Self {
        Self(zufalls_hex(SESSION_ID_LAENGE))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Spieler-ID (eindeutig innerhalb einer Session)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    /// Erstellt eine neue zufaellige PlayerId
    pub fn new() -> Self {
        Self(zufalls_hex(SPIELER_ID_LAENGE))
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lebenszyklus einer Session
///
/// ```text
/// Lobby --start-game--> Playing
/// Lobby | Playing --Host getrennt--> Ended (Session entfernt)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SessionState {
    #[default]
    Lobby,
    Playing,
    Ended,
}

impl SessionState {
    /// Gibt true zurueck solange die Session noch im Store lebt
    pub fn ist_aktiv(&self) -> bool {
        !matches!(self, Self::Ended)
    }
}
