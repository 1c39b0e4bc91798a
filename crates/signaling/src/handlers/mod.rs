//! Handler fuer die einzelnen Nachrichtentypen
//!
//! Jeder Handler bekommt den gemeinsamen `SignalingState` und die ID der
//! absendenden Verbindung. Antworten werden ueber die Registry eingereiht.

pub mod lifecycle_handler;
pub mod relay_handler;

pub use lifecycle_handler::{
    handle_create_session, handle_disconnect, handle_join_session, handle_start_game,
    TrennungsFolge,
};
pub use relay_handler::handle_signal;
