//! Relay Engine

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{RelaySession, session::RelayStats};
use crate::config::RelayConfig;
use crate::error::{Direction, ForwardError};
use crate::transport::BoxedStream;

type Outcome = Result<(), ForwardError>;

/// Copies bytes between inbound channels and local display endpoints
pub struct RelayEngine {
    buffer_size: usize,
    outcome_capacity: usize,
    active_sessions: Arc<Mutex<HashMap<String, Arc<RelaySession>>>>,
}

impl RelayEngine {
    /// Create a new relay engine with default buffering
    pub fn new() -> Self {
        Self::from_config(&RelayConfig::default())
    }

    /// Create a new relay engine from configuration
    pub fn from_config(config: &RelayConfig) -> Self {
        Self {
            buffer_size: config.buffer_size.max(1),
            outcome_capacity: config.outcome_capacity.max(1),
            active_sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Relay one channel to one endpoint until both directions finish
    pub async fn relay(
        &self,
        channel: BoxedStream,
        endpoint: BoxedStream,
    ) -> Result<RelayStats, ForwardError> {
        self.relay_with_origin(None, channel, endpoint).await
    }

    /// Relay with the originator address reported by the remote side.
    ///
    /// Each direction copies until end-of-stream or error, then shuts down the
    /// write half of its destination and posts one outcome. The result is the
    /// first error posted, checked once after both directions are done.
    pub async fn relay_with_origin(
        &self,
        origin: Option<String>,
        channel: BoxedStream,
        endpoint: BoxedStream,
    ) -> Result<RelayStats, ForwardError> {
        let session = Arc::new(RelaySession::new(origin));
        self.sessions()
            .insert(session.session_id.clone(), session.clone());

        info!("Starting X11 relay session {} (origin: {:?})",
              session.session_id, session.origin);

        let (outcome_tx, mut outcome_rx) = mpsc::channel::<Outcome>(self.outcome_capacity);
        let (channel_rd, channel_wr) = tokio::io::split(channel);
        let (local_rd, local_wr) = tokio::io::split(endpoint);

        tokio::join!(
            run_direction(
                Direction::ChannelToLocal,
                channel_rd,
                local_wr,
                self.buffer_size,
                &session,
                outcome_tx.clone(),
            ),
            run_direction(
                Direction::LocalToChannel,
                local_rd,
                channel_wr,
                self.buffer_size,
                &session,
                outcome_tx,
            ),
        );

        self.remove_session(&session.session_id);
        session.log_stats();

        while let Ok(outcome) = outcome_rx.try_recv() {
            if let Err(e) = outcome {
                warn!("Relay session {} failed after {:?}: {}",
                      session.session_id, session.duration(), e);
                return Err(e);
            }
        }

        Ok(session.to_stats())
    }

    /// Remove a session from active tracking
    pub fn remove_session(&self, session_id: &str) {
        if self.sessions().remove(session_id).is_some() {
            debug!("Removed session {} from active tracking", session_id);
        }
    }

    /// Get all active sessions
    pub fn get_active_sessions(&self) -> Vec<Arc<RelaySession>> {
        self.sessions().values().cloned().collect()
    }

    /// Get active session count
    pub fn active_session_count(&self) -> usize {
        self.sessions().len()
    }

    /// Get session by ID
    pub fn get_session(&self, session_id: &str) -> Option<Arc<RelaySession>> {
        self.sessions().get(session_id).cloned()
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<String, Arc<RelaySession>>> {
        self.active_sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for RelayEngine {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_direction<R, W>(
    direction: Direction,
    reader: R,
    writer: W,
    buffer_size: usize,
    session: &RelaySession,
    outcomes: mpsc::Sender<Outcome>,
) where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let outcome = pump(direction, reader, writer, buffer_size, session).await;
    match &outcome {
        Ok(()) => debug!("Relay session {} finished {}", session.session_id, direction),
        Err(e) => debug!("Relay session {} {} ended with error: {}",
                         session.session_id, direction, e),
    }

    if outcomes.try_send(outcome).is_err() {
        debug!("Relay session {} dropped {} outcome, channel full",
               session.session_id, direction);
    }
}

async fn pump<R, W>(
    direction: Direction,
    mut reader: R,
    mut writer: W,
    buffer_size: usize,
    session: &RelaySession,
) -> Outcome
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; buffer_size];
    let copied = loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => break Ok(()),
            Ok(n) => n,
            Err(e) => break Err(e),
        };
        if let Err(e) = writer.write_all(&buf[..n]).await {
            break Err(e);
        }
        // Framed endpoints hold writes until flushed
        if let Err(e) = writer.flush().await {
            break Err(e);
        }
        session.add_bytes(direction, n as u64);
    };

    let closed = writer.shutdown().await;

    match (copied, closed) {
        (Ok(()), Ok(())) => Ok(()),
        (Ok(()), Err(source)) => Err(ForwardError::Close { direction, source }),
        (Err(source), closed) => {
            if let Err(e) = closed {
                debug!("Relay session {} also failed to close {}: {}",
                       session.session_id, direction, e);
            }
            Err(ForwardError::Copy { direction, source })
        }
    }
}
