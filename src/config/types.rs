//! Configuration Types

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use crate::protocol::constants::{X11_TCP_BASE_PORT, X11_UNIX_SOCKET_DIR};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub display: DisplayConfig,
    pub forwarding: ForwardingConfig,
    pub relay: RelayConfig,
    pub logging: LoggingConfig,
}

/// Local X display the forwarded channels are connected to
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub number: u16,
    pub socket_dir: PathBuf,
    pub tcp_host: IpAddr,
    pub base_port: u16,
}

impl DisplayConfig {
    /// Unix socket of the display, e.g. `/tmp/.X11-unix/X0`
    pub fn socket_path(&self) -> PathBuf {
        self.socket_dir.join(format!("X{}", self.number))
    }

    /// Loopback TCP endpoint of the display, e.g. `127.0.0.1:6000`.
    /// `None` when the port would overflow.
    pub fn tcp_addr(&self) -> Option<SocketAddr> {
        let port = self.base_port.checked_add(self.number)?;
        Some(SocketAddr::new(self.tcp_host, port))
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            number: 0,
            socket_dir: PathBuf::from(X11_UNIX_SOCKET_DIR),
            tcp_host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            base_port: X11_TCP_BASE_PORT,
        }
    }
}

/// Fields of the forwarding request that callers may tune
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ForwardingConfig {
    pub single_connection: bool,
    pub screen_number: u32,
}

/// Relay buffering and error channel sizing
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RelayConfig {
    pub buffer_size: usize,
    pub outcome_capacity: usize,
    pub error_sink_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            buffer_size: 8192,
            outcome_capacity: 4,
            error_sink_capacity: 10,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
