//! Connection-Registry – Verbindungs-ID <-> Send-Queue
//!
//! Jede offene WebSocket-Verbindung bekommt beim Aufbau eine frische
//! `ConnectionId` und eine begrenzte Send-Queue. Handler senden nie direkt
//! auf einen Socket, sondern loesen die ID hier auf und reihen ein.
//!
//! ## Semantik
//! - `registrieren`: vergibt eine ID die keine registrierte Verbindung traegt
//! - `aufloesen`: unbekannte oder bereits geschlossene Verbindungen -> `None`
//! - Senden ist nicht-blockierend; geschlossene Queues verwerfen still
//! - Volle Queue = Transportfehler: die Verbindung wird abgemeldet, ihr
//!   Verbindungs-Task leert die Queue, endet und loest die Trennungs-Kaskade aus

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use partyhub_core::types::ConnectionId;
use partyhub_protocol::ServerMessage;
use std::sync::Arc;
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Standard-Groesse der Send-Queue pro Verbindung
pub const SEND_QUEUE_GROESSE: usize = 64;

// ---------------------------------------------------------------------------
// ClientSender
// ---------------------------------------------------------------------------

/// Handle auf die Send-Queue einer offenen Verbindung
#[derive(Clone, Debug)]
pub struct ClientSender {
    pub connection_id: ConnectionId,
    pub tx: mpsc::Sender<ServerMessage>,
}

impl ClientSender {
    /// Prueft ob die Gegenseite (Verbindungs-Task) noch liest
    pub fn ist_offen(&self) -> bool {
        !self.tx.is_closed()
    }
}

// ---------------------------------------------------------------------------
// ConnectionRegistry
// ---------------------------------------------------------------------------

/// Registry aller offenen Verbindungen
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct ConnectionRegistry {
    inner: Arc<ConnectionRegistryInner>,
}

struct ConnectionRegistryInner {
    /// Send-Queues, indiziert nach ConnectionId
    clients: DashMap<ConnectionId, ClientSender>,
    /// Kapazitaet jeder neuen Send-Queue
    queue_groesse: usize,
}

impl ConnectionRegistry {
    /// Erstellt eine neue ConnectionRegistry
    pub fn neu(queue_groesse: usize) -> Self {
        Self {
            inner: Arc::new(ConnectionRegistryInner {
                clients: DashMap::new(),
                queue_groesse: queue_groesse.max(1),
            }),
        }
    }

    /// Registriert eine neue Verbindung und gibt ID und Empfangs-Queue zurueck
    ///
    /// Die `ClientConnection` liest aus der Queue und schreibt auf den Socket.
    pub fn registrieren(&self) -> (ConnectionId, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(self.inner.queue_groesse);
        loop {
            let connection_id = ConnectionId::new();
            if let Entry::Vacant(eintrag) = self.inner.clients.entry(connection_id.clone()) {
                eintrag.insert(ClientSender {
                    connection_id: connection_id.clone(),
                    tx,
                });
                tracing::debug!(connection_id = %connection_id, "Verbindung registriert");
                return (connection_id, rx);
            }
        }
    }

    /// Loest eine Verbindungs-ID auf
    ///
    /// Gibt `None` zurueck wenn die Verbindung unbekannt oder bereits
    /// geschlossen ist. Aufrufer verwerfen dann still.
    pub fn aufloesen(&self, connection_id: &ConnectionId) -> Option<ClientSender> {
        self.inner
            .clients
            .get(connection_id)
            .filter(|sender| sender.ist_offen())
            .map(|sender| sender.clone())
    }

    /// Entfernt eine Verbindung aus der Registry
    pub fn entfernen(&self, connection_id: &ConnectionId) -> bool {
        let entfernt = self.inner.clients.remove(connection_id).is_some();
        if entfernt {
            tracing::debug!(connection_id = %connection_id, "Verbindung abgemeldet");
        }
        entfernt
    }

    /// Sendet eine Nachricht nicht-blockierend an eine einzelne Verbindung
    ///
    /// Gibt `true` zurueck wenn die Verbindung gefunden und die Nachricht
    /// eingereiht wurde. Ist die Queue voll, wird die Verbindung abgemeldet.
    pub fn an_verbindung_senden(&self, connection_id: &ConnectionId, nachricht: ServerMessage) -> bool {
        let Some(sender) = self.aufloesen(connection_id) else {
            tracing::debug!(
                connection_id = %connection_id,
                typ = nachricht.typ_name(),
                "Senden an unbekannte Verbindung – verworfen"
            );
            return false;
        };

        match sender.tx.try_send(nachricht) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(nachricht)) => {
                tracing::warn!(
                    connection_id = %connection_id,
                    typ = nachricht.typ_name(),
                    "Send-Queue voll – Verbindung wird getrennt"
                );
                // Letzter Sender weg -> recv() im Verbindungs-Task liefert None
                drop(sender);
                self.entfernen(connection_id);
                false
            }
            Err(mpsc::error::TrySendError::Closed(nachricht)) => {
                tracing::debug!(
                    connection_id = %connection_id,
                    typ = nachricht.typ_name(),
                    "Send-Queue geschlossen (Verbindung getrennt)"
                );
                false
            }
        }
    }

    /// Sendet eine Nachricht an mehrere Verbindungen
    ///
    /// Gibt die Anzahl der erfolgreichen Zustellungen zurueck.
    pub fn an_verbindungen_senden<'a>(
        &self,
        connection_ids: impl IntoIterator<Item = &'a ConnectionId>,
        nachricht: ServerMessage,
    ) -> usize {
        connection_ids
            .into_iter()
            .filter(|id| self.an_verbindung_senden(id, nachricht.clone()))
            .count()
    }

    /// Gibt die Anzahl registrierter Verbindungen zurueck
    pub fn anzahl(&self) -> usize {
        self.inner.clients.len()
    }

    /// Prueft ob eine Verbindung registriert ist
    pub fn ist_registriert(&self, connection_id: &ConnectionId) -> bool {
        self.inner.clients.contains_key(connection_id)
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::neu(SEND_QUEUE_GROESSE)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
