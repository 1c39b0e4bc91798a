//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist.

use partyhub_observability::logging::{log_format_gueltig, log_level_gueltig};
use partyhub_protocol::wire::DEFAULT_MAX_FRAME_SIZE;
use partyhub_signaling::SignalingConfig;
use serde::{Deserialize, Serialize};

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Allgemeine Server-Einstellungen
    pub server: ServerEinstellungen,
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Session-Verhalten und Verbindungs-Keepalive
    pub sessions: SessionEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
    /// Observability-Einstellungen (Metriken)
    pub observability: ObservabilityEinstellungen,
}

/// Allgemeine Server-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Anzeigename des Servers
    pub name: String,
    /// Maximale Anzahl gleichzeitiger WebSocket-Verbindungen
    pub max_verbindungen: usize,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            name: "PartyHub".into(),
            max_verbindungen: 1024,
        }
    }
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse fuer HTTP und WebSocket
    pub bind_adresse: String,
    /// Port fuer HTTP und WebSocket
    pub port: u16,
    /// CORS-Origins (leer = alle erlaubt)
    pub cors_origins: Vec<String>,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            port: 5000,
            cors_origins: vec![],
        }
    }
}

/// Session-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionEinstellungen {
    /// Beitritt zu laufenden Spielen erlauben
    pub late_join: bool,
    /// Kapazitaet der Send-Queue pro Verbindung
    pub sende_queue_groesse: usize,
    /// Intervall fuer WebSocket-Pings in Sekunden
    pub keepalive_sek: u64,
    /// Stille Verbindungen nach so vielen Sekunden trennen
    pub verbindungs_timeout_sek: u64,
    /// Maximale Groesse eines eingehenden Frames in Bytes
    pub max_frame_groesse: usize,
}

impl Default for SessionEinstellungen {
    fn default() -> Self {
        Self {
            late_join: true,
            sende_queue_groesse: 64,
            keepalive_sek: 30,
            verbindungs_timeout_sek: 90,
            max_frame_groesse: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

/// Observability-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityEinstellungen {
    /// `/metrics` bereitstellen
    pub metriken_aktiviert: bool,
}

impl Default for ObservabilityEinstellungen {
    fn default() -> Self {
        Self {
            metriken_aktiviert: true,
        }
    }
}

/// Herkunft einer geladenen Konfiguration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigQuelle {
    /// Aus der angegebenen Datei gelesen
    Datei,
    /// Datei fehlt, Standardwerte
    Standard,
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    ///
    /// Logging ist hier noch nicht initialisiert, der Aufrufer meldet die
    /// `ConfigQuelle` selbst.
    pub fn laden(pfad: &str) -> anyhow::Result<(Self, ConfigQuelle)> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                Ok((config, ConfigQuelle::Datei))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok((Self::default(), ConfigQuelle::Standard))
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Prueft die Konfiguration auf widerspruechliche Werte
    pub fn validieren(&self) -> anyhow::Result<()> {
        if !log_level_gueltig(&self.logging.level) {
            anyhow::bail!("Ungueltiges Log-Level '{}'", self.logging.level);
        }
        if !log_format_gueltig(&self.logging.format) {
            anyhow::bail!("Ungueltiges Log-Format '{}'", self.logging.format);
        }
        if self.server.max_verbindungen == 0 || self.sessions.sende_queue_groesse == 0 {
            anyhow::bail!("max_verbindungen und sende_queue_groesse muessen groesser 0 sein");
        }
        if self.sessions.keepalive_sek == 0
            || self.sessions.verbindungs_timeout_sek <= self.sessions.keepalive_sek
        {
            anyhow::bail!(
                "verbindungs_timeout_sek ({}) muss groesser als keepalive_sek ({}) sein",
                self.sessions.verbindungs_timeout_sek,
                self.sessions.keepalive_sek
            );
        }
        Ok(())
    }

    /// Gibt die vollstaendige Bind-Adresse fuer HTTP/WebSocket zurueck
    pub fn bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.port)
    }

    /// Leitet die Signaling-Konfiguration ab
    pub fn signaling_config(&self) -> SignalingConfig {
        SignalingConfig {
            max_verbindungen: self.server.max_verbindungen,
            late_join: self.sessions.late_join,
            sende_queue_groesse: self.sessions.sende_queue_groesse,
            keepalive_sek: self.sessions.keepalive_sek,
            verbindungs_timeout_sek: self.sessions.verbindungs_timeout_sek,
            max_frame_groesse: self.sessions.max_frame_groesse,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_config_ist_valide() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.server.max_verbindungen, 1024);
        assert_eq!(cfg.netzwerk.port, 5000);
        assert!(cfg.sessions.late_join);
        assert_eq!(cfg.logging.level, "info");
        assert!(cfg.observability.metriken_aktiviert);
    }

    #[test]
    fn bind_adresse() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.bind_adresse(), "0.0.0.0:5000");
    }

    #[test]
    fn config_aus_toml_string() {
        let toml = r#"
            [server]
            name = "Wohnzimmer"
            max_verbindungen = 16

            [sessions]
            late_join = false
            keepalive_sek = 10

            [netzwerk]
            cors_origins = ["https://party.example"]
        "#;
        let cfg: ServerConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.server.name, "Wohnzimmer");
        assert_eq!(cfg.netzwerk.cors_origins, vec!["https://party.example"]);
        // Nicht angegebene Felder behalten Standardwerte
        assert_eq!(cfg.netzwerk.port, 5000);
        assert_eq!(cfg.sessions.verbindungs_timeout_sek, 90);

        let signaling = cfg.signaling_config();
        assert_eq!(signaling.max_verbindungen, 16);
        assert!(!signaling.late_join);
        assert_eq!(signaling.keepalive_sek, 10);
    }

    #[test]
    fn validierung() {
        assert!(ServerConfig::default().validieren().is_ok());

        let mut cfg = ServerConfig::default();
        cfg.logging.format = "xml".into();
        assert!(cfg.validieren().is_err());

        let mut cfg = ServerConfig::default();
        cfg.sessions.keepalive_sek = 60;
        cfg.sessions.verbindungs_timeout_sek = 30;
        assert!(cfg.validieren().is_err());
    }

    #[test]
    fn fehlende_datei_liefert_standard() {
        let (cfg, quelle) = ServerConfig::laden("/gibt/es/nicht/partyhub.toml").unwrap();
        assert_eq!(quelle, ConfigQuelle::Standard);
        assert_eq!(cfg.netzwerk.port, 5000);
    }

    #[test]
    fn vorhandene_datei_wird_gelesen() {
        let pfad = std::env::temp_dir().join(format!("partyhub-ok-{}.toml", std::process::id()));
        std::fs::write(&pfad, "[netzwerk]\nport = 6000\n").unwrap();
        let ergebnis = ServerConfig::laden(pfad.to_str().unwrap());
        let _ = std::fs::remove_file(&pfad);

        let (cfg, quelle) = ergebnis.unwrap();
        assert_eq!(quelle, ConfigQuelle::Datei);
        assert_eq!(cfg.netzwerk.port, 6000);
    }

    #[test]
    fn kaputtes_toml_ist_fehler() {
        let pfad = std::env::temp_dir().join(format!("partyhub-kaputt-{}.toml", std::process::id()));
        std::fs::write(&pfad, "[server\nname = ").unwrap();
        let ergebnis = ServerConfig::laden(pfad.to_str().unwrap());
        let _ = std::fs::remove_file(&pfad);
        assert!(ergebnis.is_err());
    }
}
