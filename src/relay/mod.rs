//! Data Relay Module
//! 
//! Handles bidirectional data relay between an inbound X11 channel and the
//! local display.

pub mod engine;
pub mod session;

pub use engine::RelayEngine;
pub use session::{RelaySession, RelayStats};
