//! Secure Session Provider
//!
//! The SSH client itself lives outside this crate. These traits are the
//! capabilities the forwarder needs from it.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::BoxError;
use crate::transport::BoxedStream;

/// Stream of channel-open attempts for one channel type
pub type ChannelOpens = mpsc::Receiver<Box<dyn PendingChannel>>;

/// An authenticated session able to multiplex channels
#[async_trait]
pub trait SecureSession: Send + Sync + 'static {
    type Command: CommandChannel;

    /// Open a session channel to carry requests and the remote command
    async fn open_command_channel(&self) -> Result<Self::Command, BoxError>;

    /// Route channel-open attempts of `channel_type` to the returned
    /// receiver. Returns `None` if that type already has a handler.
    fn handle_channel_open(&self, channel_type: &str) -> Option<ChannelOpens>;
}

/// A session channel that can carry out-of-band requests
#[async_trait]
pub trait CommandChannel: Send + 'static {
    /// Send a named request. Resolves to whether the remote side accepted
    /// it; requests sent without `want_reply` resolve to `true`.
    async fn send_request(
        &mut self,
        name: &str,
        want_reply: bool,
        payload: Bytes,
    ) -> Result<bool, BoxError>;
}

/// A channel-open attempt waiting to be accepted
#[async_trait]
pub trait PendingChannel: Send + 'static {
    /// Originator address reported by the remote side, if any
    fn origin(&self) -> Option<String> {
        None
    }

    async fn accept(self: Box<Self>) -> Result<BoxedStream, BoxError>;
}
