//! partyhub-core – Gemeinsame Typen
//!
//! Dieses Crate stellt die ID-Newtypes und den Session-Zustand bereit,
//! die von Protokoll- und Signaling-Crate gemeinsam genutzt werden.

pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use types::{ConnectionId, PlayerId, SessionId, SessionState};

