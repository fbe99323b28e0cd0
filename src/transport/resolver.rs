//! Local Transport Resolver

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use super::BoxedStream;
use crate::config::DisplayConfig;
use crate::error::{ConnectAttempt, ForwardError};

/// Source of local endpoints, asked once per accepted channel
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self) -> Result<BoxedStream, ForwardError>;
}

/// A local display endpoint the resolver may try
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalTarget {
    Unix(PathBuf),
    Tcp(SocketAddr),
}

impl fmt::Display for LocalTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocalTarget::Unix(path) => write!(f, "unix:{}", path.display()),
            LocalTarget::Tcp(addr) => write!(f, "tcp:{}", addr),
        }
    }
}

/// Whether the host has native Unix-domain display sockets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Unix,
    Other,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(unix) {
            Platform::Unix
        } else {
            Platform::Other
        }
    }
}

/// Ordered connection attempts for a display on the given platform.
///
/// Unix hosts try the display socket first and fall back to loopback TCP;
/// other hosts only have the TCP endpoint.
pub fn connection_plan(
    display: &DisplayConfig,
    platform: Platform,
) -> Result<Vec<LocalTarget>, ForwardError> {
    let addr = display.tcp_addr().ok_or(ForwardError::InvalidDisplay {
        number: display.number,
        base_port: display.base_port,
    })?;
    let tcp = LocalTarget::Tcp(addr);
    Ok(match platform {
        Platform::Unix => vec![LocalTarget::Unix(display.socket_path()), tcp],
        Platform::Other => vec![tcp],
    })
}

/// Connects to the local X server by walking a connection plan
#[derive(Debug, Clone)]
pub struct DisplayResolver {
    plan: Vec<LocalTarget>,
}

impl DisplayResolver {
    /// Resolver for the configured display on the current platform
    pub fn new(display: &DisplayConfig) -> Result<Self, ForwardError> {
        connection_plan(display, Platform::current()).map(Self::with_plan)
    }

    pub fn with_plan(plan: Vec<LocalTarget>) -> Self {
        Self { plan }
    }

    pub fn plan(&self) -> &[LocalTarget] {
        &self.plan
    }

    /// Try each target in order and return the first stream that connects
    pub async fn resolve(&self) -> Result<(BoxedStream, LocalTarget), ForwardError> {
        let mut attempts = Vec::new();

        for target in &self.plan {
            debug!("Connecting to local display at {}", target);
            match connect_target(target).await {
                Ok(stream) => {
                    if !attempts.is_empty() {
                        info!("Connected to local display at {} after {} failed attempt(s)",
                              target, attempts.len());
                    }
                    return Ok((stream, target.clone()));
                }
                Err(error) => {
                    warn!("Failed to connect to local display at {}: {}", target, error);
                    attempts.push(ConnectAttempt {
                        target: target.clone(),
                        error,
                    });
                }
            }
        }

        Err(ForwardError::Resolve { attempts })
    }
}

#[async_trait]
impl Connector for DisplayResolver {
    async fn connect(&self) -> Result<BoxedStream, ForwardError> {
        self.resolve().await.map(|(stream, _)| stream)
    }
}

async fn connect_target(target: &LocalTarget) -> io::Result<BoxedStream> {
    match target {
        LocalTarget::Tcp(addr) => {
            let stream = TcpStream::connect(addr).await?;
            stream.set_nodelay(true)?;
            Ok(Box::new(stream))
        }
        #[cfg(unix)]
        LocalTarget::Unix(path) => {
            let stream = tokio::net::UnixStream::connect(path).await?;
            Ok(Box::new(stream))
        }
        #[cfg(not(unix))]
        LocalTarget::Unix(path) => Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("unix sockets unavailable on this platform: {}", path.display()),
        )),
    }
}
