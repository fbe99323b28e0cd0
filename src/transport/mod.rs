//! Local Transport
//!
//! Both sides of a relay are plain duplex byte streams. Closing the write
//! half is `AsyncWriteExt::shutdown`, which half-closes sockets and SSH
//! channels and flushes files.

pub mod resolver;
pub mod websocket;

use tokio::io::{AsyncRead, AsyncWrite};

pub use resolver::{connection_plan, Connector, DisplayResolver, LocalTarget, Platform};
pub use websocket::WebSocketEndpoint;

/// Duplex byte stream with independently closable halves
pub trait ByteStream: AsyncRead + AsyncWrite + Unpin + Send + 'static {}

impl<T> ByteStream for T where T: AsyncRead + AsyncWrite + Unpin + Send + 'static {}

pub type BoxedStream = Box<dyn ByteStream>;
