//! partyhub-protocol – Signaling-Protokoll
//!
//! Dieses Crate definiert alle Nachrichtentypen die zwischen Clients und
//! dem Signaling-Server ueber WebSocket ausgetauscht werden, sowie den
//! JSON-Frame-Codec.

pub mod control;
pub mod wire;

pub use control::{ClientMessage, ServerMessage, SignalArt, SignalEnvelope, SignalRequest};
pub use wire::{FrameCodec, ProtocolError};
