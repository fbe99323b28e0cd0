//! X11 Forwarding Protocol
//!
//! The out-of-band request sent over the secure session and the cookie that
//! authorizes forwarded connections.

pub mod constants;
pub mod cookie;
pub mod types;

pub use constants::*;
pub use cookie::CookieGenerator;
pub use types::{DecodeError, ForwardingRequest};
