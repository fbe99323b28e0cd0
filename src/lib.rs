//! x11relay Library
//! 
//! X11 display forwarding over an established SSH session.
//!
//! The caller hands over a live session; the forwarder sends `x11-req`,
//! accepts every `x11` channel the remote side opens and relays it to the
//! local X server until either side closes.

pub mod config;
pub mod error;
pub mod protocol;
pub mod relay;
pub mod session;
pub mod transport;

pub use config::Config;
pub use error::{Direction, ForwardError};
pub use protocol::ForwardingRequest;
pub use relay::RelayEngine;
pub use session::{ForwardingSession, SecureSession, X11Forwarder};

/// Common error type for configuration and tooling
pub type Result<T> = anyhow::Result<T>;
