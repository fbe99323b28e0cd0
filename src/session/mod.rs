//! Secure Session Integration
//!
//! Requests X11 forwarding over an established session and services the
//! channels the remote side opens in response.

pub mod acceptor;
pub mod orchestrator;
pub mod provider;
pub mod sink;

pub use acceptor::{AcceptorHandle, AcceptorState, ChannelAcceptor};
pub use orchestrator::{ForwardingSession, X11Forwarder};
pub use provider::{ChannelOpens, CommandChannel, PendingChannel, SecureSession};
pub use sink::ErrorSink;
