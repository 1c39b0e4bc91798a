//! partyhub-server – Bibliotheks-Root
//!
//! Deklariert alle Server-Module und stellt den oeffentlichen Einstiegspunkt
//! fuer Integrationstests bereit.

pub mod config;

use anyhow::{Context, Result};
use axum::http::{HeaderValue, Method};
use axum::{middleware, Router};
use config::ServerConfig;
use partyhub_observability::{metrics_router, timing_middleware, PartyMetrics};
use partyhub_signaling::{rest_router, SignalingServer, SignalingState};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Bindet den konfigurierten Port und laeuft bis Ctrl-C / SIGTERM
    pub async fn starten(self) -> Result<()> {
        let adresse = self.config.bind_adresse();
        let listener = TcpListener::bind(&adresse)
            .await
            .with_context(|| format!("Bind auf {adresse} fehlgeschlagen"))?;
        self.starten_mit_listener(listener, shutdown_signal()).await
    }

    /// Startet den Server auf einem bereits gebundenen Listener
    ///
    /// Reihenfolge beim Herunterfahren:
    /// 1. Health-Check auf `unhealthy`
    /// 2. Shutdown-Signal an alle Verbindungs-Tasks
    /// 3. HTTP-Server beendet offene Requests
    pub async fn starten_mit_listener<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let metrics = PartyMetrics::neu()?;
        let state = SignalingState::neu(self.config.signaling_config(), metrics);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let app = self.router(Arc::clone(&state), shutdown_rx);
        let lokale_addr: SocketAddr = listener.local_addr()?;

        tracing::info!(
            server_name = %self.config.server.name,
            adresse = %lokale_addr,
            max_verbindungen = self.config.server.max_verbindungen,
            late_join = self.config.sessions.late_join,
            "PartyHub Signaling-Server gestartet"
        );

        let health = state.health.clone();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                tracing::info!("Shutdown-Signal empfangen, Server wird beendet");
                health.herunterfahren_markieren();
                let _ = shutdown_tx.send(true);
            })
            .await
            .context("HTTP-Server abgebrochen")?;

        tracing::info!(
            offene_sessions = state.sessions.anzahl(),
            "Server gestoppt"
        );
        Ok(())
    }

    /// Baut den vollstaendigen Router: WebSocket, REST, Metriken
    pub fn router(&self, state: Arc<SignalingState>, shutdown_rx: watch::Receiver<bool>) -> Router {
        let metrics = state.metrics.clone();

        let mut app = Router::new()
            .merge(SignalingServer::neu(Arc::clone(&state), shutdown_rx).router())
            .merge(rest_router(state));

        if self.config.observability.metriken_aktiviert {
            app = app.merge(metrics_router(metrics.clone()));
        }

        app.layer(middleware::from_fn_with_state(metrics, timing_middleware))
            .layer(TraceLayer::new_for_http())
            .layer(self.cors_layer())
    }

    /// CORS konfigurieren: entweder spezifische Origins oder Any
    fn cors_layer(&self) -> CorsLayer {
        let origins = &self.config.netzwerk.cors_origins;
        if origins.is_empty() {
            return CorsLayer::permissive();
        }

        let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::OPTIONS])
            .allow_headers(tower_http::cors::Any)
    }
}

/// Wartet auf Ctrl-C oder SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(fehler = %e, "Ctrl-C-Handler konnte nicht installiert werden");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(fehler = %e, "SIGTERM-Handler konnte nicht installiert werden");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
