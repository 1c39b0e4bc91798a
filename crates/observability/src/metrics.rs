//! Prometheus-kompatible Metriken fuer PartyHub
//!
//! Registrierte Metriken:
//! - `partyhub_connected_clients` – Gauge: Aktuell registrierte Verbindungen
//! - `partyhub_sessions_active` – Gauge: Lebende Sessions
//! - `partyhub_sessions_created_total` – Counter: Angelegte Sessions
//! - `partyhub_players_joined_total` – Counter: Erfolgreiche Joins
//! - `partyhub_signals_relayed_total` – Counter: Weitergeleitete Handshake-Nachrichten
//! - `partyhub_signals_dropped_total` – Counter: Verworfene Handshake-Nachrichten (Ziel unbekannt)
//! - `partyhub_frames_invalid_total` – Counter: Verworfene ungueltige Frames
//! - `partyhub_http_requests_total` – Counter: HTTP-Anfragen (method, path, status)
//! - `partyhub_http_request_duration_seconds` – Histogram: HTTP-Antwortzeit

use anyhow::Result;
use axum::{extract::State, response::IntoResponse, routing::get, Router};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

/// Alle PartyHub-Prometheus-Metriken
///
/// Clone teilt die Registry und alle Metrik-Handles.
#[derive(Clone)]
pub struct PartyMetrics {
    pub registry: Arc<Registry>,

    // Signaling-Metriken
    pub connected_clients: IntGauge,
    pub sessions_active: IntGauge,
    pub sessions_created_total: IntCounter,
    pub players_joined_total: IntCounter,
    pub signals_relayed_total: IntCounter,
    pub signals_dropped_total: IntCounter,
    pub frames_invalid_total: IntCounter,

    // HTTP-Metriken
    pub http_requests_total: IntCounterVec,
    pub http_request_duration_seconds: HistogramVec,
}

impl PartyMetrics {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> Result<Self> {
        let registry = Registry::new();

        // --- Signaling-Metriken ---
        let connected_clients = IntGauge::with_opts(Opts::new(
            "partyhub_connected_clients",
            "Anzahl aktuell registrierter Verbindungen",
        ))?;
        registry.register(Box::new(connected_clients.clone()))?;

        let sessions_active = IntGauge::with_opts(Opts::new(
            "partyhub_sessions_active",
            "Anzahl lebender Sessions",
        ))?;
        registry.register(Box::new(sessions_active.clone()))?;

        let sessions_created_total = IntCounter::with_opts(Opts::new(
            "partyhub_sessions_created_total",
            "Gesamtanzahl angelegter Sessions",
        ))?;
        registry.register(Box::new(sessions_created_total.clone()))?;

        let players_joined_total = IntCounter::with_opts(Opts::new(
            "partyhub_players_joined_total",
            "Gesamtanzahl erfolgreicher Session-Beitritte",
        ))?;
        registry.register(Box::new(players_joined_total.clone()))?;

        let signals_relayed_total = IntCounter::with_opts(Opts::new(
            "partyhub_signals_relayed_total",
            "Gesamtanzahl weitergeleiteter Offer/Answer/ICE-Nachrichten",
        ))?;
        registry.register(Box::new(signals_relayed_total.clone()))?;

        let signals_dropped_total = IntCounter::with_opts(Opts::new(
            "partyhub_signals_dropped_total",
            "Verworfene Handshake-Nachrichten mit unbekanntem Ziel",
        ))?;
        registry.register(Box::new(signals_dropped_total.clone()))?;

        let frames_invalid_total = IntCounter::with_opts(Opts::new(
            "partyhub_frames_invalid_total",
            "Verworfene ungueltige Frames",
        ))?;
        registry.register(Box::new(frames_invalid_total.clone()))?;

        // --- HTTP-Metriken ---
        let http_requests_total = IntCounterVec::new(
            Opts::new("partyhub_http_requests_total", "Gesamtanzahl HTTP-Anfragen"),
            &["method", "path", "status"],
        )?;
        registry.register(Box::new(http_requests_total.clone()))?;

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "partyhub_http_request_duration_seconds",
                "HTTP-Antwortzeit in Sekunden",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
            &["method", "path"],
        )?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            connected_clients,
            sessions_active,
            sessions_created_total,
            players_joined_total,
            signals_relayed_total,
            signals_dropped_total,
            frames_invalid_total,
            http_requests_total,
            http_request_duration_seconds,
        })
    }

    /// Exportiert alle Metriken im Prometheus-Textformat
    pub fn exportieren(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Axum-Router fuer den `/metrics`-Endpunkt
pub fn metrics_router(metriken: PartyMetrics) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metriken)
}

async fn metrics_handler(State(metriken): State<PartyMetrics>) -> impl IntoResponse {
    match metriken.exportieren() {
        Ok(text) => (
            axum::http::StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Metriken-Export fehlgeschlagen: {err}");
            axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
