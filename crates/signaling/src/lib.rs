//! partyhub-signaling – WebSocket Control Layer
//!
//! Dieser Crate implementiert den Signaling- und Session-Service fuer
//! PartyHub. Ein Host-PC legt eine Session an, Controller-Telefone treten
//! per Join-Code bei und der Server reicht WebRTC-Handshakes zwischen den
//! Verbindungen durch. Medien laufen nie ueber den Server.
//!
//! ## Architektur
//!
//! ```text
//! WebSocket-Endpunkt (SignalingServer, GET /ws)
//!     |
//!     v
//! ClientConnection (pro Verbindung ein Task)
//!     |
//!     v
//! MessageDispatcher
//!     |
//!     +-- LifecycleHandler (create-session, join-session, start-game, Trennung)
//!     +-- RelayHandler     (offer, answer, ice-candidate)
//!
//! ConnectionRegistry – ConnectionId -> Send-Queue
//! SessionStore       – Sessions, Spieler, Join-Codes
//! ```

pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod registry;
pub mod rest;
pub mod server_state;
pub mod session_store;
pub mod ws;

// Bequeme Re-Exporte
pub use connection::ClientConnection;
pub use dispatcher::MessageDispatcher;
pub use error::{SignalingError, SignalingResult};
pub use registry::ConnectionRegistry;
pub use rest::rest_router;
pub use server_state::{SignalingConfig, SignalingState};
pub use session_store::{Session, SessionInfo, SessionStore};
pub use ws::SignalingServer;
