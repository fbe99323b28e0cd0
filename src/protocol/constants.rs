//! X11 Forwarding Protocol Constants

/// Global request asking the server to forward X11 connections
pub const X11_REQUEST: &str = "x11-req";

/// Channel type the server uses when it opens a forwarded X11 connection
pub const X11_CHANNEL_TYPE: &str = "x11";

/// The only authentication scheme the forwarder generates cookies for
pub const AUTH_MIT_MAGIC_COOKIE_1: &str = "MIT-MAGIC-COOKIE-1";

/// Raw cookie length in bytes; the hex form is twice as long
pub const COOKIE_BYTES: usize = 16;

// Well-known local display endpoints
pub const X11_UNIX_SOCKET_DIR: &str = "/tmp/.X11-unix";
pub const X11_TCP_BASE_PORT: u16 = 6000;
