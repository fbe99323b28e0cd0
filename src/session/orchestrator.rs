//! Session Orchestrator

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use rand::rngs::OsRng;
use rand::RngCore;
use tokio::sync::mpsc;
use tracing::{error, info};

use super::acceptor::{AcceptorHandle, ChannelAcceptor};
use super::provider::{ChannelOpens, CommandChannel, SecureSession};
use super::sink::ErrorSink;
use crate::config::Config;
use crate::error::ForwardError;
use crate::protocol::{CookieGenerator, ForwardingRequest, X11_CHANNEL_TYPE, X11_REQUEST};
use crate::relay::RelayEngine;
use crate::transport::{BoxedStream, ByteStream, Connector, DisplayResolver};

type BoxedRng = Box<dyn RngCore + Send>;

/// Connector for channels after the supplied endpoint has been used
struct EndpointInUse;

#[async_trait]
impl Connector for EndpointInUse {
    async fn connect(&self) -> Result<BoxedStream, ForwardError> {
        Err(ForwardError::EndpointInUse)
    }
}

/// Sets up X11 forwarding on a secure session
pub struct X11Forwarder<S: SecureSession> {
    session: Arc<S>,
    config: Config,
    endpoint: Option<BoxedStream>,
    connector: Option<Arc<dyn Connector>>,
    request: Option<ForwardingRequest>,
    cookies: CookieGenerator<BoxedRng>,
}

/// A session with forwarding active
pub struct ForwardingSession<C> {
    /// Channel the caller runs the remote command or shell on
    pub command: C,
    /// Errors from the acceptor and every relay it spawned
    pub errors: mpsc::Receiver<ForwardError>,
    pub acceptor: AcceptorHandle,
    request: ForwardingRequest,
}

impl<C> fmt::Debug for ForwardingSession<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForwardingSession")
            .field("request", &self.request)
            .field("acceptor", &self.acceptor)
            .finish_non_exhaustive()
    }
}

impl<C> ForwardingSession<C> {
    /// The request the remote side accepted
    pub fn request(&self) -> &ForwardingRequest {
        &self.request
    }

    pub fn into_parts(self) -> (C, mpsc::Receiver<ForwardError>, AcceptorHandle) {
        (self.command, self.errors, self.acceptor)
    }
}

impl<S: SecureSession> X11Forwarder<S> {
    pub fn new(session: Arc<S>) -> Self {
        Self {
            session,
            config: Config::default(),
            endpoint: None,
            connector: None,
            request: None,
            cookies: CookieGenerator::with_rng(Box::new(OsRng) as BoxedRng),
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Relay the first forwarded channel to `endpoint` instead of the
    /// local display. Later channels go through the connector if one was
    /// set and are refused with `ForwardError::EndpointInUse` otherwise.
    pub fn with_endpoint(mut self, endpoint: impl ByteStream) -> Self {
        self.endpoint = Some(Box::new(endpoint));
        self
    }

    /// Replace the default display resolver
    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Send `request` as-is instead of building one
    pub fn with_request(mut self, request: ForwardingRequest) -> Self {
        self.request = Some(request);
        self
    }

    /// Random source for the auth cookie
    pub fn with_rng(mut self, rng: impl RngCore + Send + 'static) -> Self {
        self.cookies = CookieGenerator::with_rng(Box::new(rng) as BoxedRng);
        self
    }

    /// Build the request from configuration and a fresh cookie
    pub fn build_request(&mut self) -> ForwardingRequest {
        ForwardingRequest::new(&mut self.cookies)
            .with_single_connection(self.config.forwarding.single_connection)
            .with_screen_number(self.config.forwarding.screen_number)
    }

    /// Request forwarding and start accepting channels.
    ///
    /// Any failure before the remote side accepts the request is returned
    /// here and no channel is ever accepted. The error receiver only carries
    /// accept and per-channel errors, never setup errors.
    pub async fn start(mut self) -> Result<ForwardingSession<S::Command>, ForwardError> {
        let request = match self.request.take() {
            Some(request) => request,
            None => self.build_request(),
        };

        let connector: Arc<dyn Connector> = match (self.connector.take(), &self.endpoint) {
            (Some(connector), _) => connector,
            (None, Some(_)) => Arc::new(EndpointInUse),
            (None, None) => match DisplayResolver::new(&self.config.display) {
                Ok(resolver) => Arc::new(resolver),
                Err(e) => {
                    error!("X11 forwarding setup failed: {}", e);
                    return Err(e);
                }
            },
        };

        let (command, opens) = match Self::request_forwarding(&self.session, &request).await {
            Ok(parts) => parts,
            Err(e) => {
                error!("X11 forwarding setup failed: {}", e);
                return Err(e);
            }
        };

        let (sink, errors) = ErrorSink::new(self.config.relay.error_sink_capacity);
        let engine = Arc::new(RelayEngine::from_config(&self.config.relay));

        let mut acceptor = ChannelAcceptor::new(opens, engine, connector, sink);
        if let Some(endpoint) = self.endpoint {
            acceptor = acceptor.with_endpoint(endpoint);
        }

        info!(
            single_connection = request.single_connection,
            screen_number = request.screen_number,
            "X11 forwarding accepted by remote side"
        );

        Ok(ForwardingSession {
            command,
            errors,
            acceptor: acceptor.spawn(),
            request,
        })
    }

    async fn request_forwarding(
        session: &S,
        request: &ForwardingRequest,
    ) -> Result<(S::Command, ChannelOpens), ForwardError> {
        if request.auth_cookie.is_empty() {
            return Err(ForwardError::EmptyCookie);
        }

        let mut command = session
            .open_command_channel()
            .await
            .map_err(ForwardError::OpenCommandChannel)?;

        let opens = session
            .handle_channel_open(X11_CHANNEL_TYPE)
            .ok_or(ForwardError::ChannelTypeTaken(X11_CHANNEL_TYPE))?;

        let accepted = command
            .send_request(X11_REQUEST, true, request.encode())
            .await
            .map_err(|source| ForwardError::SendRequest {
                request: X11_REQUEST,
                source,
            })?;

        if !accepted {
            return Err(ForwardError::RequestRejected {
                request: X11_REQUEST,
            });
        }

        Ok((command, opens))
    }
}
