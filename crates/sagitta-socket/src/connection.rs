//! The connection task.
//!
//! One task per client owns the transport, the reconnect timer and the
//! heartbeat. It is the only writer of the connection state, which makes
//! "at most one live connection" and "at most one pending retry" structural:
//! the loop below is either connecting, running one session, or waiting.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::{Callbacks, CloseInfo, SocketConfig};
use crate::dispatch;
use crate::endpoint::Endpoint;
use crate::envelope::PING_FRAME;
use crate::error::SocketError;
use crate::heartbeat::Heartbeat;
use crate::reconnect::{ReconnectDecision, ReconnectTracker};
use crate::registry::SubscriptionRegistry;
use crate::state::ConnectionState;
use crate::transport::{ConnectRequest, Connector, Link};

/// Upper bound on the close handshake during teardown.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Requests from the handle to the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Command {
    /// Connect now if closed or never connected.
    Connect,
}

/// State shared between the handle and the task.
pub(crate) struct Shared {
    state: watch::Sender<ConnectionState>,
    outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
    last_message: RwLock<Option<Value>>,
    pub(crate) registry: Arc<SubscriptionRegistry>,
    pub(crate) reconnect: ReconnectTracker,
}

impl Shared {
    pub(crate) fn new(config: &SocketConfig) -> Self {
        let (state, _) = watch::channel(ConnectionState::Uninstantiated);
        Self {
            state,
            outbound: Mutex::new(None),
            last_message: RwLock::new(None),
            registry: SubscriptionRegistry::new(),
            reconnect: ReconnectTracker::new(config.reconnect_attempts, config.reconnect_interval),
        }
    }

    pub(crate) fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub(crate) fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub(crate) fn last_message(&self) -> Option<Value> {
        self.last_message.read().clone()
    }

    fn set_state(&self, next: ConnectionState) {
        let prev = self.state.send_replace(next);
        if prev != next {
            debug!(from = %prev, to = %next, "connection state changed");
        }
    }

    /// Queue a frame on the live connection. Frames are dropped, not
    /// buffered, when nothing is open.
    pub(crate) fn transmit(&self, frame: String, what: &str) -> bool {
        let state = self.state();
        if !state.is_open() {
            warn!(%state, what, "not connected, dropping outbound frame");
            return false;
        }
        let outbound = self.outbound.lock();
        match outbound.as_ref() {
            Some(tx) if tx.send(frame).is_ok() => true,
            _ => {
                warn!(what, "connection went away, dropping outbound frame");
                false
            }
        }
    }

    fn deliver(&self, ctx: &TaskContext, raw: &str) {
        ctx.callbacks.message(raw);
        let Some(message) = dispatch::parse_frame(raw) else {
            return;
        };
        *self.last_message.write() = Some(message.clone());
        let report = dispatch::route(&self.registry, ctx.config.dispatch, &message);
        trace!(
            delivered = report.delivered,
            panicked = report.panicked,
            "inbound frame dispatched"
        );
    }
}

/// Everything the task needs besides the shared state.
pub(crate) struct TaskContext {
    pub(crate) connector: Arc<dyn Connector>,
    pub(crate) endpoint: Endpoint,
    pub(crate) config: SocketConfig,
    pub(crate) callbacks: Callbacks,
}

enum SessionEnd {
    /// Teardown was requested; the link is already closed.
    Shutdown,
    /// The peer closed the connection.
    PeerClosed,
    /// The connection failed.
    Failed(SocketError),
}

enum Wait {
    Connect,
    Shutdown,
}

pub(crate) async fn run(
    shared: Arc<Shared>,
    ctx: TaskContext,
    mut commands: mpsc::UnboundedReceiver<Command>,
    cancel: CancellationToken,
) {
    if !ctx.config.auto_connect {
        debug!("auto-connect disabled, waiting for connect()");
    }
    let mut wait_first = !ctx.config.auto_connect;

    loop {
        if wait_first {
            wait_first = false;
            if let Wait::Shutdown = wait_for_connect(&mut commands, &cancel).await {
                break;
            }
        }

        // connect() calls queued while the previous attempt was in flight
        // must not cut the next reconnect delay short.
        while commands.try_recv().is_ok() {}

        shared.set_state(ConnectionState::Connecting);
        let request = ConnectRequest {
            url: ctx.endpoint.resolve(),
            protocols: ctx.config.protocols.clone(),
        };
        debug!(attempt = shared.reconnect.attempts(), "connecting");

        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = ctx.connector.connect(&request) => result,
        };

        match outcome {
            Ok(link) => match run_session(&shared, &ctx, link, &mut commands, &cancel).await {
                SessionEnd::Shutdown => break,
                SessionEnd::PeerClosed => {
                    info!("connection closed by peer");
                    shared.set_state(ConnectionState::Closed);
                    ctx.callbacks.close(&CloseInfo::new(true, "closed by peer"));
                }
                SessionEnd::Failed(err) => {
                    warn!(error = %err, "connection lost");
                    ctx.callbacks.error(&err);
                    shared.set_state(ConnectionState::Closed);
                    ctx.callbacks.close(&CloseInfo::new(true, err.to_string()));
                }
            },
            Err(err) => {
                warn!(error = %err, "connection attempt failed");
                ctx.callbacks.error(&err);
                shared.set_state(ConnectionState::Closed);
                ctx.callbacks.close(&CloseInfo::new(false, err.to_string()));
            }
        }

        match shared.reconnect.on_close() {
            ReconnectDecision::Retry { attempt, delay } => {
                info!(
                    attempt,
                    max = ctx.config.reconnect_attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "scheduling reconnect"
                );
                let fired = tokio::select! {
                    biased;
                    () = cancel.cancelled() => Wait::Shutdown,
                    () = tokio::time::sleep(delay) => Wait::Connect,
                    Some(Command::Connect) = commands.recv() => {
                        debug!("connect() requested, skipping reconnect delay");
                        Wait::Connect
                    }
                };
                if let Wait::Shutdown = fired {
                    break;
                }
                let _ = shared.reconnect.record_attempt();
            }
            ReconnectDecision::Exhausted { attempts } => {
                warn!(attempts, "reconnect attempts exhausted, staying closed");
                if let Wait::Shutdown = wait_for_connect(&mut commands, &cancel).await {
                    break;
                }
            }
        }
    }

    shared.set_state(ConnectionState::Closing);
    *shared.outbound.lock() = None;
    shared.registry.clear();
    shared.set_state(ConnectionState::Closed);
    debug!("connection task stopped");
}

async fn wait_for_connect(
    commands: &mut mpsc::UnboundedReceiver<Command>,
    cancel: &CancellationToken,
) -> Wait {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Wait::Shutdown,
        cmd = commands.recv() => match cmd {
            Some(Command::Connect) => Wait::Connect,
            None => Wait::Shutdown,
        },
    }
}

async fn run_session(
    shared: &Shared,
    ctx: &TaskContext,
    link: Link,
    commands: &mut mpsc::UnboundedReceiver<Command>,
    cancel: &CancellationToken,
) -> SessionEnd {
    let Link {
        mut sink,
        mut stream,
    } = link;
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();

    shared.reconnect.reset();
    *shared.outbound.lock() = Some(out_tx);
    shared.set_state(ConnectionState::Open);
    info!("connection open");
    ctx.callbacks.open();

    let mut heartbeat = Heartbeat::start(ctx.config.heartbeat_interval);
    if heartbeat.period().is_none() {
        debug!("heartbeat disabled");
    }

    let end = loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break SessionEnd::Shutdown,
            frame = stream.next() => match frame {
                Some(Ok(text)) => shared.deliver(ctx, &text),
                Some(Err(err)) => break SessionEnd::Failed(err),
                None => break SessionEnd::PeerClosed,
            },
            Some(frame) = out_rx.recv() => {
                if let Err(err) = sink.send(frame).await {
                    break SessionEnd::Failed(err);
                }
            }
            () = heartbeat.tick() => {
                trace!("sending heartbeat");
                if let Err(err) = sink.send(PING_FRAME.to_owned()).await {
                    break SessionEnd::Failed(err);
                }
            }
            Some(cmd) = commands.recv() => {
                debug!(?cmd, "already open, ignoring command");
            }
        }
    };

    *shared.outbound.lock() = None;
    if let SessionEnd::Shutdown = end {
        shared.set_state(ConnectionState::Closing);
        match tokio::time::timeout(CLOSE_TIMEOUT, sink.close()).await {
            Ok(Ok(())) => debug!("connection closed"),
            Ok(Err(err)) => debug!(error = %err, "error while closing connection"),
            Err(_) => debug!("close handshake timed out"),
        }
    }
    end
}
