//! PartyHub Server – Einstiegspunkt
//!
//! Laedt die Konfiguration, initialisiert das Logging und startet den Server.

use anyhow::Result;
use partyhub_observability::logging_initialisieren;
use partyhub_server::config::{ConfigQuelle, ServerConfig};
use partyhub_server::Server;

#[tokio::main]
async fn main() -> Result<()> {
    // Konfigurationsdatei-Pfad aus Umgebungsvariable oder Standard
    let config_pfad = std::env::var("PH_CONFIG").unwrap_or_else(|_| "config.toml".into());

    // Konfiguration laden (Standardwerte falls Datei fehlt)
    let (config, quelle) = ServerConfig::laden(&config_pfad)?;
    config.validieren()?;

    logging_initialisieren(&config.logging.level, &config.logging.format);

    if quelle == ConfigQuelle::Standard {
        tracing::warn!(
            pfad = %config_pfad,
            "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
        );
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_pfad,
        "PartyHub Server wird initialisiert"
    );

    Server::neu(config).starten().await
}
