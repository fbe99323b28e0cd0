//! Forwarding Errors
//!
//! Every failure the forwarder can surface, grouped the way callers react to
//! them: setup failures end the whole operation, an accept failure ends the
//! acceptor, and the rest are scoped to a single relay.

use std::fmt;
use std::io;

use crate::transport::LocalTarget;

/// Error type returned by secure session providers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Which way bytes were flowing when a relay error happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Inbound channel to local display
    ChannelToLocal,
    /// Local display back to the inbound channel
    LocalToChannel,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::ChannelToLocal => f.write_str("channel->local"),
            Direction::LocalToChannel => f.write_str("local->channel"),
        }
    }
}

/// One failed connection attempt made by the resolver
#[derive(Debug)]
pub struct ConnectAttempt {
    pub target: LocalTarget,
    pub error: io::Error,
}

impl fmt::Display for ConnectAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.target, self.error)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("failed to open command channel")]
    OpenCommandChannel(#[source] BoxError),

    #[error("failed to send {request} request")]
    SendRequest {
        request: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("remote side rejected {request} request")]
    RequestRejected { request: &'static str },

    #[error("channel type {0:?} already has a handler on this session")]
    ChannelTypeTaken(&'static str),

    #[error("refusing to request forwarding with an empty auth cookie")]
    EmptyCookie,

    #[error("display :{number} has no TCP port (base port {base_port} + display number overflows)")]
    InvalidDisplay { number: u16, base_port: u16 },

    #[error("failed to accept inbound channel")]
    Accept(#[source] BoxError),

    #[error("failed to connect to local display ({})", describe_attempts(.attempts))]
    Resolve { attempts: Vec<ConnectAttempt> },

    #[error("supplied endpoint already serves another channel and no connector is set")]
    EndpointInUse,

    #[error("relay copy failed ({direction})")]
    Copy {
        direction: Direction,
        #[source]
        source: io::Error,
    },

    #[error("failed to close write side ({direction})")]
    Close {
        direction: Direction,
        #[source]
        source: io::Error,
    },
}

impl ForwardError {
    /// True for failures that prevent forwarding from starting at all
    pub fn is_setup(&self) -> bool {
        matches!(
            self,
            ForwardError::OpenCommandChannel(_)
                | ForwardError::SendRequest { .. }
                | ForwardError::RequestRejected { .. }
                | ForwardError::ChannelTypeTaken(_)
                | ForwardError::EmptyCookie
                | ForwardError::InvalidDisplay { .. }
        )
    }

    /// Relay direction the error belongs to, if any
    pub fn direction(&self) -> Option<Direction> {
        match self {
            ForwardError::Copy { direction, .. } | ForwardError::Close { direction, .. } => {
                Some(*direction)
            }
            _ => None,
        }
    }
}

fn describe_attempts(attempts: &[ConnectAttempt]) -> String {
    if attempts.is_empty() {
        return "no targets to try".to_string();
    }
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
