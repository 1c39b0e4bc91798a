//! Gemeinsamer Server-Zustand fuer den Signaling-Service
//!
//! Haelt Registry, Session-Store, Metriken und Konfiguration. Wird beim
//! Start einmal gebaut und als `Arc` an jeden Verbindungs-Task und jeden
//! HTTP-Handler gereicht. Keine globalen Singletons.

use partyhub_observability::{HealthState, PartyMetrics};
use partyhub_protocol::wire::DEFAULT_MAX_FRAME_SIZE;
use std::sync::Arc;

use crate::registry::{ConnectionRegistry, SEND_QUEUE_GROESSE};
use crate::session_store::SessionStore;

/// Konfiguration fuer den Signaling-Service
#[derive(Debug, Clone)]
pub struct SignalingConfig {
    /// Maximale gleichzeitige Verbindungen
    pub max_verbindungen: usize,
    /// Beitritt zu bereits laufenden Spielen erlauben
    pub late_join: bool,
    /// Kapazitaet der Send-Queue pro Verbindung
    pub sende_queue_groesse: usize,
    /// Keepalive-Intervall (WebSocket-Ping) in Sekunden
    pub keepalive_sek: u64,
    /// Timeout fuer stille Verbindungen in Sekunden
    pub verbindungs_timeout_sek: u64,
    /// Maximale Groesse eines eingehenden Frames in Bytes
    pub max_frame_groesse: usize,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            max_verbindungen: 1024,
            late_join: true,
            sende_queue_groesse: SEND_QUEUE_GROESSE,
            keepalive_sek: 30,
            verbindungs_timeout_sek: 90,
            max_frame_groesse: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

/// Gemeinsamer Server-Zustand (thread-safe, Arc-geteilt)
pub struct SignalingState {
    /// Signaling-Konfiguration
    pub config: Arc<SignalingConfig>,
    /// Offene Verbindungen und ihre Send-Queues
    pub registry: ConnectionRegistry,
    /// Sessions, Spieler, Join-Codes
    pub sessions: SessionStore,
    /// Prometheus-Metriken
    pub metrics: PartyMetrics,
    /// Health-Zustand (Uptime, Shutdown-Markierung)
    pub health: HealthState,
}

impl SignalingState {
    /// Erstellt einen neuen SignalingState
    pub fn neu(config: SignalingConfig, metrics: PartyMetrics) -> Arc<Self> {
        Arc::new(Self {
            registry: ConnectionRegistry::neu(config.sende_queue_groesse),
            sessions: SessionStore::neu(config.late_join),
            config: Arc::new(config),
            metrics,
            health: HealthState::neu(),
        })
    }

    /// Prueft ob das Verbindungslimit erreicht ist
    pub fn ist_voll(&self) -> bool {
        self.registry.anzahl() >= self.config.max_verbindungen
    }

    /// Gleicht die Gauges mit Registry und Store ab
    pub fn gauges_aktualisieren(&self) {
        self.metrics
            .connected_clients
            .set(self.registry.anzahl() as i64);
        self.metrics
            .sessions_active
            .set(self.sessions.anzahl() as i64);
    }

    /// Gibt die Uptime in Sekunden zurueck
    pub fn uptime_sek(&self) -> u64 {
        self.health.uptime_seconds()
    }
}
