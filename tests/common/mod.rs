//! Shared test doubles: an in-memory secure session and stream wrappers

#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf};
use tokio::sync::mpsc;

use x11relay::error::{BoxError, ForwardError};
use x11relay::session::{ChannelOpens, CommandChannel, PendingChannel, SecureSession};
use x11relay::transport::{BoxedStream, Connector};

pub const PIPE_CAPACITY: usize = 64 * 1024;

/// How the mock answers requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Accept,
    Reject,
    Fail,
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub name: String,
    pub want_reply: bool,
    pub payload: Bytes,
}

pub struct MockSession {
    reply: Reply,
    fail_open: bool,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    handlers: Mutex<HashMap<String, mpsc::Sender<Box<dyn PendingChannel>>>>,
    accepted: Arc<AtomicUsize>,
}

impl MockSession {
    pub fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            fail_open: false,
            requests: Arc::new(Mutex::new(Vec::new())),
            handlers: Mutex::new(HashMap::new()),
            accepted: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn failing_open() -> Arc<Self> {
        Arc::new(Self {
            reply: Reply::Accept,
            fail_open: true,
            requests: Arc::new(Mutex::new(Vec::new())),
            handlers: Mutex::new(HashMap::new()),
            accepted: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of channel-open attempts accepted so far
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    fn x11_sender(&self) -> Option<mpsc::Sender<Box<dyn PendingChannel>>> {
        self.handlers.lock().unwrap().get("x11").cloned()
    }

    /// Open an x11 channel from the remote side. Returns the remote end of
    /// the channel, or `None` if nobody is listening.
    pub async fn open_x11(&self, origin: &str) -> Option<DuplexStream> {
        let sender = self.x11_sender()?;
        let (near, far) = tokio::io::duplex(PIPE_CAPACITY);
        let pending = MockPending {
            stream: Some(near),
            origin: origin.to_string(),
            accepted: Arc::clone(&self.accepted),
        };
        sender.send(Box::new(pending)).await.ok()?;
        Some(far)
    }

    /// Deliver a channel-open attempt whose accept fails
    pub async fn open_x11_failing(&self) -> bool {
        let Some(sender) = self.x11_sender() else {
            return false;
        };
        let pending = MockPending {
            stream: None,
            origin: "broken".to_string(),
            accepted: Arc::clone(&self.accepted),
        };
        sender.send(Box::new(pending)).await.is_ok()
    }

    /// Simulate session teardown: the open stream ends
    pub fn close_opens(&self) {
        self.handlers.lock().unwrap().clear();
    }
}

#[async_trait]
impl SecureSession for MockSession {
    type Command = MockCommand;

    async fn open_command_channel(&self) -> Result<MockCommand, BoxError> {
        if self.fail_open {
            return Err("session channel refused".into());
        }
        Ok(MockCommand {
            reply: self.reply,
            requests: Arc::clone(&self.requests),
        })
    }

    fn handle_channel_open(&self, channel_type: &str) -> Option<ChannelOpens> {
        let mut handlers = self.handlers.lock().unwrap();
        if handlers.get(channel_type).is_some_and(|tx| !tx.is_closed()) {
            return None;
        }
        let (tx, rx) = mpsc::channel(16);
        handlers.insert(channel_type.to_string(), tx);
        Some(rx)
    }
}

pub struct MockCommand {
    reply: Reply,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

#[async_trait]
impl CommandChannel for MockCommand {
    async fn send_request(
        &mut self,
        name: &str,
        want_reply: bool,
        payload: Bytes,
    ) -> Result<bool, BoxError> {
        self.requests.lock().unwrap().push(RecordedRequest {
            name: name.to_string(),
            want_reply,
            payload,
        });
        match self.reply {
            Reply::Accept => Ok(true),
            Reply::Reject => Ok(false),
            Reply::Fail => Err("transport closed".into()),
        }
    }
}

struct MockPending {
    stream: Option<DuplexStream>,
    origin: String,
    accepted: Arc<AtomicUsize>,
}

#[async_trait]
impl PendingChannel for MockPending {
    fn origin(&self) -> Option<String> {
        Some(self.origin.clone())
    }

    async fn accept(self: Box<Self>) -> Result<BoxedStream, BoxError> {
        let MockPending { stream, accepted, .. } = *self;
        match stream {
            Some(stream) => {
                accepted.fetch_add(1, Ordering::SeqCst);
                Ok(Box::new(stream))
            }
            None => Err("channel open confirmation failed".into()),
        }
    }
}

/// Connector handing out in-memory endpoints; the test gets the far ends
pub struct DuplexConnector {
    tx: mpsc::UnboundedSender<DuplexStream>,
}

impl DuplexConnector {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<DuplexStream>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

#[async_trait]
impl Connector for DuplexConnector {
    async fn connect(&self) -> Result<BoxedStream, ForwardError> {
        let (near, far) = tokio::io::duplex(PIPE_CAPACITY);
        let _ = self.tx.send(far);
        Ok(Box::new(near))
    }
}

/// Counts shutdown calls on the wrapped stream
pub struct CountingStream {
    inner: DuplexStream,
    pub shutdowns: Arc<AtomicUsize>,
}

impl CountingStream {
    pub fn new(inner: DuplexStream) -> (Self, Arc<AtomicUsize>) {
        let shutdowns = Arc::new(AtomicUsize::new(0));
        (
            Self {
                inner,
                shutdowns: Arc::clone(&shutdowns),
            },
            shutdowns,
        )
    }
}

impl AsyncRead for CountingStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for CountingStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let result = Pin::new(&mut self.inner).poll_shutdown(cx);
        if result.is_ready() {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
        }
        result
    }
}

/// Stream whose write half was already closed: shutdown always errors
pub struct AlreadyClosed {
    inner: DuplexStream,
}

impl AlreadyClosed {
    pub fn new(inner: DuplexStream) -> Self {
        Self { inner }
    }
}

impl AsyncRead for AlreadyClosed {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for AlreadyClosed {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Err(io::Error::new(
            io::ErrorKind::NotConnected,
            "write half already closed",
        )))
    }
}
