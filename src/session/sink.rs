//! Error Sink

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::warn;

use crate::error::ForwardError;

/// Bounded, drop-on-full error reporter shared by the acceptor and relays
#[derive(Debug, Clone)]
pub struct ErrorSink {
    tx: mpsc::Sender<ForwardError>,
}

impl ErrorSink {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<ForwardError>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Report an error without waiting. Returns false if it was dropped.
    pub fn report(&self, error: ForwardError) -> bool {
        match self.tx.try_send(error) {
            Ok(()) => true,
            Err(TrySendError::Full(error)) => {
                warn!("Error sink full, dropping: {}", error);
                false
            }
            Err(TrySendError::Closed(error)) => {
                warn!("Error sink closed, dropping: {}", error);
                false
            }
        }
    }
}
