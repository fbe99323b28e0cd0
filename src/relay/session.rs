//! Relay Session

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use serde::{Deserialize, Serialize};
use tracing::{info, debug};

use crate::error::Direction;

/// Bookkeeping for one inbound channel being relayed to the local display
#[derive(Debug)]
pub struct RelaySession {
    pub session_id: String,
    pub origin: Option<String>,
    pub start_time: Instant,
    pub bytes_to_local: AtomicU64,
    pub bytes_to_channel: AtomicU64,
}

/// Statistics for a completed relay
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayStats {
    pub session_id: String,
    pub origin: Option<String>,
    pub start_time: std::time::SystemTime,
    pub duration_ms: u64,
    pub bytes_to_local: u64,
    pub bytes_to_channel: u64,
    pub total_bytes: u64,
}

impl RelaySession {
    /// Create a new relay session
    pub fn new(origin: Option<String>) -> Self {
        let session_id = format!("x11_{}", uuid::Uuid::new_v4().simple());
        debug!("Creating new relay session: {} (origin: {:?})", session_id, origin);

        Self {
            session_id,
            origin,
            start_time: Instant::now(),
            bytes_to_local: AtomicU64::new(0),
            bytes_to_channel: AtomicU64::new(0),
        }
    }

    pub fn bytes_to_local(&self) -> u64 {
        self.bytes_to_local.load(Ordering::Relaxed)
    }

    pub fn bytes_to_channel(&self) -> u64 {
        self.bytes_to_channel.load(Ordering::Relaxed)
    }

    pub fn total_bytes(&self) -> u64 {
        self.bytes_to_local() + self.bytes_to_channel()
    }

    pub fn duration(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }

    /// Count bytes written in the given direction
    pub fn add_bytes(&self, direction: Direction, bytes: u64) {
        let counter = match direction {
            Direction::ChannelToLocal => &self.bytes_to_local,
            Direction::LocalToChannel => &self.bytes_to_channel,
        };
        counter.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Generate relay statistics
    pub fn to_stats(&self) -> RelayStats {
        let duration = self.duration();
        let start_time = std::time::SystemTime::now() - duration;

        RelayStats {
            session_id: self.session_id.clone(),
            origin: self.origin.clone(),
            start_time,
            duration_ms: duration.as_millis() as u64,
            bytes_to_local: self.bytes_to_local(),
            bytes_to_channel: self.bytes_to_channel(),
            total_bytes: self.total_bytes(),
        }
    }

    /// Log session statistics
    pub fn log_stats(&self) {
        info!(
            session_id = %self.session_id,
            origin = self.origin.as_deref(),
            duration_ms = self.duration().as_millis() as u64,
            bytes_to_local = self.bytes_to_local(),
            bytes_to_channel = self.bytes_to_channel(),
            total_bytes = self.total_bytes(),
            "Relay session completed"
        );
    }
}
