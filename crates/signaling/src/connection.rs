//! Client-Connection – Verwaltet eine einzelne WebSocket-Verbindung
//!
//! Jede WebSocket-Verbindung bekommt eine `ClientConnection` in einem
//! eigenen tokio-Task. Der Task liest Frames, dispatcht sie und schreibt
//! die Send-Queue der Verbindung auf den Socket.
//!
//! ## Ablauf
//! ```text
//! Upgrade -> registrieren -> connected -> Frame-Schleife -> Trennungs-Kaskade
//! ```
//!
//! ## Keepalive
//! - Server sendet alle `keepalive_sek` einen WebSocket-Ping
//! - Kommt `verbindungs_timeout_sek` lang nichts an, wird getrennt
//!
//! Die Trennungs-Kaskade laeuft im `Drop` eines Guards und damit genau
//! einmal, auch wenn der Task abgebrochen wird.

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::{Sink, SinkExt, StreamExt};
use partyhub_core::types::ConnectionId;
use partyhub_protocol::ServerMessage;
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::dispatcher::MessageDispatcher;
use crate::server_state::SignalingState;

/// WebSocket-Close-Code "Going Away"
const CLOSE_GOING_AWAY: u16 = 1001;

// ---------------------------------------------------------------------------
// TrennungsGuard
// ---------------------------------------------------------------------------

/// Fuehrt beim Drop die Trennungs-Kaskade fuer eine Verbindung aus
struct TrennungsGuard {
    dispatcher: MessageDispatcher,
    connection_id: ConnectionId,
}

impl Drop for TrennungsGuard {
    fn drop(&mut self) {
        self.dispatcher.verbindung_getrennt(&self.connection_id);
    }
}

// ---------------------------------------------------------------------------
// ClientConnection
// ---------------------------------------------------------------------------

/// Verarbeitet eine einzelne WebSocket-Verbindung
pub struct ClientConnection {
    dispatcher: MessageDispatcher,
}

impl ClientConnection {
    /// Erstellt eine neue ClientConnection
    pub fn neu(state: Arc<SignalingState>) -> Self {
        Self {
            dispatcher: MessageDispatcher::neu(state),
        }
    }

    /// Startet die Verbindungs-Verarbeitungsschleife
    ///
    /// Laeuft bis der Client trennt, ein Transportfehler auftritt, der
    /// Keepalive-Timeout greift oder ein Shutdown-Signal eingeht.
    pub async fn verarbeiten(self, socket: WebSocket, mut shutdown_rx: watch::Receiver<bool>) {
        let config = Arc::clone(&self.dispatcher.state().config);
        let keepalive_intervall = Duration::from_secs(config.keepalive_sek.max(1));
        let timeout_dauer = Duration::from_secs(config.verbindungs_timeout_sek.max(1));

        let (connection_id, mut sende_rx) = self.dispatcher.verbindung_registrieren();
        let _guard = TrennungsGuard {
            dispatcher: self.dispatcher.clone(),
            connection_id: connection_id.clone(),
        };

        let (mut ws_tx, mut ws_rx) = socket.split();

        let mut letzter_empfang = Instant::now();
        let mut keepalive = interval_at(Instant::now() + keepalive_intervall, keepalive_intervall);
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                // Eingehender Frame vom Client
                frame = ws_rx.next() => {
                    match frame {
                        Some(Ok(nachricht)) => {
                            letzter_empfang = Instant::now();
                            if !self.frame_verarbeiten(&connection_id, nachricht) {
                                tracing::debug!(connection_id = %connection_id, "Close-Frame empfangen");
                                break;
                            }
                        }
                        Some(Err(e)) => {
                            tracing::warn!(
                                connection_id = %connection_id,
                                fehler = %e,
                                "Frame-Lesefehler"
                            );
                            break;
                        }
                        None => {
                            tracing::debug!(connection_id = %connection_id, "Verbindung vom Client getrennt");
                            break;
                        }
                    }
                }

                // Ausgehende Nachricht aus der Send-Queue
                ausgehend = sende_rx.recv() => {
                    let Some(ausgehend) = ausgehend else {
                        break;
                    };
                    if let Err(e) = self.senden(&mut ws_tx, &ausgehend).await {
                        tracing::warn!(
                            connection_id = %connection_id,
                            fehler = %e,
                            "Senden fehlgeschlagen"
                        );
                        break;
                    }
                }

                // Keepalive-Ping und Timeout-Pruefung
                _ = keepalive.tick() => {
                    if letzter_empfang.elapsed() > timeout_dauer {
                        tracing::warn!(connection_id = %connection_id, "Verbindungs-Timeout");
                        break;
                    }
                    if let Err(e) = ws_tx.send(Message::Ping(Vec::new())).await {
                        tracing::warn!(
                            connection_id = %connection_id,
                            fehler = %e,
                            "Ping-Senden fehlgeschlagen"
                        );
                        break;
                    }
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!(connection_id = %connection_id, "Shutdown-Signal – Verbindung wird getrennt");
                        let abschied = Message::Close(Some(CloseFrame {
                            code: CLOSE_GOING_AWAY,
                            reason: Cow::Borrowed("server shutdown"),
                        }));
                        let _ = ws_tx.send(abschied).await;
                        break;
                    }
                }
            }
        }

        tracing::debug!(connection_id = %connection_id, "Verbindungs-Task beendet");
    }

    /// Verarbeitet einen eingehenden WebSocket-Frame
    ///
    /// Gibt `false` zurueck wenn die Verbindung geschlossen werden soll.
    fn frame_verarbeiten(&self, connection_id: &ConnectionId, nachricht: Message) -> bool {
        match nachricht {
            Message::Text(text) => self.text_dispatchen(connection_id, &text),
            Message::Binary(daten) => match String::from_utf8(daten) {
                Ok(text) => self.text_dispatchen(connection_id, &text),
                Err(_) => {
                    tracing::warn!(connection_id = %connection_id, "Binaer-Frame ohne gueltiges UTF-8 verworfen");
                }
            },
            // Pong beantwortet die Bibliothek selbst, beides zaehlt nur als Lebenszeichen
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Close(_) => return false,
        }
        true
    }

    fn text_dispatchen(&self, connection_id: &ConnectionId, text: &str) {
        if let Err(e) = self.dispatcher.dispatch_frame(connection_id, text) {
            tracing::warn!(
                connection_id = %connection_id,
                fehler = %e,
                "Ungueltiger Frame verworfen"
            );
        }
    }

    async fn senden<S>(&self, ws_tx: &mut S, nachricht: &ServerMessage) -> crate::error::SignalingResult<()>
    where
        S: Sink<Message, Error = axum::Error> + Unpin,
    {
        let text = self.dispatcher.codec().kodieren(nachricht)?;
        ws_tx.send(Message::Text(text)).await?;
        Ok(())
    }
}
