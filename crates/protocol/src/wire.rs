//! Wire-Format fuer WebSocket-Verbindungen
//!
//! Jeder Text-Frame enthaelt genau ein JSON-Objekt mit einem `type`-Feld.
//!
//! ## Fehlerklassen beim Parsen
//! - Frame zu gross, kein JSON, kein Objekt: `ProtocolError`, Frame wird verworfen
//! - `type` fehlt oder ist unbekannt: `Ok(None)`, Frame wird still ignoriert
//! - Bekannter `type` mit fehlenden Pflichtfeldern: `ProtocolError::UngueltigeNachricht`

use serde_json::Value;
use thiserror::Error;

use crate::control::{ClientMessage, ServerMessage};

// ---------------------------------------------------------------------------
// Konstanten
// ---------------------------------------------------------------------------

/// Standard-maximale Frame-Groesse (64 KB, reicht fuer SDP-Offers)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// Fehler
// ---------------------------------------------------------------------------

/// Fehler beim Dekodieren oder Kodieren eines Frames
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Frame ueberschreitet die maximale Groesse
    #[error("Frame zu gross: {groesse} Bytes (max {max})")]
    ZuGross { groesse: usize, max: usize },

    /// Frame ist kein gueltiges JSON
    #[error("Ungueltiges JSON: {0}")]
    UngueltigesJson(#[source] serde_json::Error),

    /// Frame ist gueltiges JSON aber kein Objekt
    #[error("Frame ist kein JSON-Objekt")]
    KeinObjekt,

    /// Bekannter Typ, aber Felder fehlen oder haben den falschen Typ
    #[error("Ungueltige '{typ}'-Nachricht: {quelle}")]
    UngueltigeNachricht {
        typ: String,
        #[source]
        quelle: serde_json::Error,
    },

    /// Serialisierung einer Server-Nachricht fehlgeschlagen
    #[error("Serialisierung fehlgeschlagen: {0}")]
    Serialisierung(#[source] serde_json::Error),
}

// ---------------------------------------------------------------------------
// FrameCodec
// ---------------------------------------------------------------------------

/// Codec fuer JSON-Text-Frames
#[derive(Debug, Clone)]
pub struct FrameCodec {
    /// Maximale erlaubte Frame-Groesse in Bytes
    max_frame_size: usize,
}

impl FrameCodec {
    /// Erstellt einen neuen `FrameCodec` mit Standard-Limits
    pub fn new() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Erstellt einen `FrameCodec` mit benutzerdefinierter maximaler Frame-Groesse
    pub fn with_max_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    /// Gibt die konfigurierte maximale Frame-Groesse zurueck
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    /// Dekodiert einen eingehenden Text-Frame
    ///
    /// Gibt `Ok(None)` zurueck wenn der Frame keinen bzw. einen unbekannten
    /// `type` traegt.
    pub fn dekodieren(&self, frame: &str) -> Result<Option<ClientMessage>, ProtocolError> {
        if frame.len() > self.max_frame_size {
            return Err(ProtocolError::ZuGross {
                groesse: frame.len(),
                max: self.max_frame_size,
            });
        }

        let wert: Value = serde_json::from_str(frame).map_err(ProtocolError::UngueltigesJson)?;
        let objekt = wert.as_object().ok_or(ProtocolError::KeinObjekt)?;

        let typ = match objekt.get("type").and_then(Value::as_str) {
            Some(t) => t.to_string(),
            None => return Ok(None),
        };

        match serde_json::from_value::<ClientMessage>(wert) {
            Ok(ClientMessage::Unbekannt) => Ok(None),
            Ok(nachricht) => Ok(Some(nachricht)),
            Err(quelle) => Err(ProtocolError::UngueltigeNachricht { typ, quelle }),
        }
    }

    /// Kodiert eine ausgehende Nachricht als Text-Frame
    pub fn kodieren(&self, nachricht: &ServerMessage) -> Result<String, ProtocolError> {
        nachricht.to_json().map_err(ProtocolError::Serialisierung)
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
