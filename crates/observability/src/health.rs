//! Health-Check-Typen fuer PartyHub
//!
//! Endpoint: `GET /api/health` (Route liegt im Signaling-Crate)
//! Response: JSON mit Status, Version, Uptime und Zaehlern aus dem Session-Store

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Status des Health-Checks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    /// Server faehrt herunter, Health-Check soll fehlschlagen
    Unhealthy,
}

/// Antwort des Health-Check-Endpunkts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub active_sessions: usize,
    pub connected_clients: usize,
}

impl HealthResponse {
    /// HTTP-Status passend zum Health-Status
    pub fn http_status(&self) -> StatusCode {
        match self.status {
            HealthStatus::Healthy => StatusCode::OK,
            HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Geteilter Zustand fuer den Health-Check
#[derive(Clone)]
pub struct HealthState {
    pub start_time: Arc<Instant>,
    herunterfahren: Arc<AtomicBool>,
}

impl HealthState {
    pub fn neu() -> Self {
        Self {
            start_time: Arc::new(Instant::now()),
            herunterfahren: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Markiert den Server als herunterfahrend
    pub fn herunterfahren_markieren(&self) {
        self.herunterfahren.store(true, Ordering::Relaxed);
    }

    /// Baut die Health-Antwort aus den aktuellen Zaehlern
    pub fn antwort(&self, active_sessions: usize, connected_clients: usize) -> HealthResponse {
        let status = if self.herunterfahren.load(Ordering::Relaxed) {
            HealthStatus::Unhealthy
        } else {
            HealthStatus::Healthy
        };

        HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.uptime_seconds(),
            active_sessions,
            connected_clients,
        }
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::neu()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_state_frisch_ist_healthy() {
        let state = HealthState::neu();
        assert!(state.uptime_seconds() < 5);

        let antwort = state.antwort(3, 7);
        assert_eq!(antwort.status, HealthStatus::Healthy);
        assert_eq!(antwort.http_status(), StatusCode::OK);
        assert_eq!(antwort.active_sessions, 3);
        assert_eq!(antwort.connected_clients, 7);
    }

    #[test]
    fn herunterfahren_liefert_503() {
        let state = HealthState::neu();
        let klon = state.clone();
        klon.herunterfahren_markieren();

        let antwort = state.antwort(0, 0);
        assert_eq!(antwort.status, HealthStatus::Unhealthy);
        assert_eq!(antwort.http_status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn health_response_serialisierung() {
        let response = HealthResponse {
            status: HealthStatus::Healthy,
            version: "0.1.0".to_string(),
            uptime_seconds: 3600,
            active_sessions: 2,
            connected_clients: 5,
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"healthy\""));
        assert!(json.contains("\"uptimeSeconds\":3600"));
        assert!(json.contains("\"activeSessions\":2"));
        assert!(json.contains("\"connectedClients\":5"));
    }
}
