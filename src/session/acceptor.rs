//! Channel Acceptor

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::provider::ChannelOpens;
use super::sink::ErrorSink;
use crate::error::ForwardError;
use crate::relay::RelayEngine;
use crate::transport::{BoxedStream, Connector};

/// Lifecycle of the acceptor loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptorState {
    /// Created, not yet listening
    Idle,
    /// Accepting channel-open attempts
    Listening,
    /// The open stream closed or an accept failed; no more channels
    Terminal,
}

/// Accepts forwarded X11 channels and spawns a relay for each one
pub struct ChannelAcceptor {
    opens: ChannelOpens,
    engine: Arc<RelayEngine>,
    connector: Arc<dyn Connector>,
    supplied: Option<BoxedStream>,
    sink: ErrorSink,
    state: watch::Sender<AcceptorState>,
}

impl ChannelAcceptor {
    pub fn new(
        opens: ChannelOpens,
        engine: Arc<RelayEngine>,
        connector: Arc<dyn Connector>,
        sink: ErrorSink,
    ) -> Self {
        let (state, _) = watch::channel(AcceptorState::Idle);
        Self {
            opens,
            engine,
            connector,
            supplied: None,
            sink,
            state,
        }
    }

    /// Use `endpoint` for the first accepted channel instead of connecting
    pub fn with_endpoint(mut self, endpoint: BoxedStream) -> Self {
        self.supplied = Some(endpoint);
        self
    }

    pub fn state(&self) -> AcceptorState {
        *self.state.borrow()
    }

    /// Run the accept loop on its own task
    pub fn spawn(self) -> AcceptorHandle {
        let state = self.state.subscribe();
        let task = tokio::spawn(self.run());
        AcceptorHandle { state, task }
    }

    /// Accept channels until the open stream ends or an accept fails.
    ///
    /// Relays run on their own tasks; the loop never waits for one.
    pub async fn run(mut self) {
        self.state.send_replace(AcceptorState::Listening);
        info!("Listening for forwarded X11 channels");

        let mut accepted = 0u64;
        while let Some(pending) = self.opens.recv().await {
            let origin = pending.origin();
            let channel = match pending.accept().await {
                Ok(channel) => channel,
                Err(e) => {
                    error!("Failed to accept X11 channel (origin: {:?}): {}", origin, e);
                    self.sink.report(ForwardError::Accept(e));
                    break;
                }
            };

            accepted += 1;
            info!("Accepted X11 channel #{} (origin: {:?})", accepted, origin);

            let endpoint = self.supplied.take();
            let engine = Arc::clone(&self.engine);
            let connector = Arc::clone(&self.connector);
            let sink = self.sink.clone();

            tokio::spawn(async move {
                let endpoint = match endpoint {
                    Some(endpoint) => endpoint,
                    None => match connector.connect().await {
                        Ok(endpoint) => endpoint,
                        Err(e) => {
                            warn!("Dropping X11 channel (origin: {:?}): {}", origin, e);
                            sink.report(e);
                            return;
                        }
                    },
                };

                if let Err(e) = engine.relay_with_origin(origin, channel, endpoint).await {
                    sink.report(e);
                }
            });
        }

        self.opens.close();
        self.state.send_replace(AcceptorState::Terminal);
        info!("X11 channel acceptor stopped after {} channel(s)", accepted);
    }
}

/// Handle to a spawned acceptor
#[derive(Debug)]
pub struct AcceptorHandle {
    state: watch::Receiver<AcceptorState>,
    task: JoinHandle<()>,
}

impl AcceptorHandle {
    pub fn state(&self) -> AcceptorState {
        *self.state.borrow()
    }

    /// Wait until the acceptor reaches `target`
    pub async fn wait_for_state(&mut self, target: AcceptorState) -> AcceptorState {
        if let Ok(state) = self.state.wait_for(|state| *state == target).await {
            return *state;
        }
        *self.state.borrow()
    }

    /// Stop accepting; relays already running are not affected
    pub fn abort(&self) {
        self.task.abort();
    }

    /// Wait for the accept loop to finish
    pub async fn stopped(self) -> crate::Result<()> {
        match self.task.await {
            Ok(()) => Ok(()),
            Err(e) if e.is_cancelled() => Ok(()),
            Err(e) => Err(anyhow::anyhow!("X11 acceptor task failed: {}", e)),
        }
    }
}
