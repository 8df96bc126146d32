//! Public client handle.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::{Callbacks, CloseInfo, DispatchMode, SocketConfig};
use crate::connection::{self, Command, Shared, TaskContext};
use crate::endpoint::Endpoint;
use crate::envelope::{self, Envelope};
use crate::error::SocketError;
use crate::registry::{Subscription, SubscriptionGuard, SubscriptionRegistry};
use crate::state::ConnectionState;
use crate::transport::{Connector, TungsteniteConnector};

/// A reconnecting messaging client.
///
/// Building one spawns its connection task on the current tokio runtime.
/// Dropping the handle (or calling [`close`](Self::close)) tears the task
/// down: any pending reconnect is cancelled, the live connection is closed
/// and every subscription is cleared.
pub struct MessagingClient {
    shared: Arc<Shared>,
    commands: mpsc::UnboundedSender<Command>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

/// Builder for [`MessagingClient`].
pub struct MessagingClientBuilder {
    endpoint: Endpoint,
    config: SocketConfig,
    callbacks: Callbacks,
    connector: Arc<dyn Connector>,
}

impl MessagingClientBuilder {
    /// Replace the whole configuration.
    #[must_use]
    pub fn config(mut self, config: SocketConfig) -> Self {
        self.config = config;
        self
    }

    /// Override only the inbound routing mode.
    #[must_use]
    pub fn dispatch(mut self, mode: DispatchMode) -> Self {
        self.config.dispatch = mode;
        self
    }

    /// Use a different transport.
    #[must_use]
    pub fn connector(mut self, connector: impl Connector) -> Self {
        self.connector = Arc::new(connector);
        self
    }

    /// Called each time a connection opens.
    #[must_use]
    pub fn on_open(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.callbacks.on_open = Some(Arc::new(f));
        self
    }

    /// Called each time a connection closes or an attempt fails.
    #[must_use]
    pub fn on_close(mut self, f: impl Fn(&CloseInfo) + Send + Sync + 'static) -> Self {
        self.callbacks.on_close = Some(Arc::new(f));
        self
    }

    /// Called on connect and transport errors.
    #[must_use]
    pub fn on_error(mut self, f: impl Fn(&SocketError) + Send + Sync + 'static) -> Self {
        self.callbacks.on_error = Some(Arc::new(f));
        self
    }

    /// Called with every raw inbound frame before it is parsed.
    #[must_use]
    pub fn on_message(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.callbacks.on_message = Some(Arc::new(f));
        self
    }

    /// Spawn the connection task and return the handle.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> MessagingClient {
        let shared = Arc::new(Shared::new(&self.config));
        let (commands, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let ctx = TaskContext {
            connector: self.connector,
            endpoint: self.endpoint,
            config: self.config,
            callbacks: self.callbacks,
        };
        let task = tokio::spawn(connection::run(
            Arc::clone(&shared),
            ctx,
            rx,
            cancel.clone(),
        ));
        MessagingClient {
            shared,
            commands,
            cancel,
            task: Mutex::new(Some(task)),
        }
    }
}

impl MessagingClient {
    /// Start building a client for `endpoint`.
    pub fn builder(endpoint: impl Into<Endpoint>) -> MessagingClientBuilder {
        MessagingClientBuilder {
            endpoint: endpoint.into(),
            config: SocketConfig::default(),
            callbacks: Callbacks::default(),
            connector: Arc::new(TungsteniteConnector),
        }
    }

    /// Client over WebSocket with no callbacks.
    pub fn new(endpoint: impl Into<Endpoint>, config: SocketConfig) -> Self {
        Self::builder(endpoint).config(config).build()
    }

    /// Connect now.
    ///
    /// No-op while connecting, open or closing. From `Closed` this skips any
    /// pending reconnect delay; it does not reset the attempt counter.
    pub fn connect(&self) {
        let state = self.state();
        match state {
            ConnectionState::Uninstantiated | ConnectionState::Closed => {
                if self.commands.send(Command::Connect).is_err() {
                    warn!("connection task has stopped, ignoring connect()");
                }
            }
            ConnectionState::Connecting | ConnectionState::Open | ConnectionState::Closing => {
                debug!(%state, "connect() ignored");
            }
        }
    }

    /// Register `handler` for frames on `topic`.
    pub fn subscribe<F>(&self, topic: impl Into<String>, handler: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.shared.registry.subscribe(topic, Arc::new(handler))
    }

    /// Alias for [`subscribe`](Self::subscribe).
    pub fn on<F>(&self, topic: impl Into<String>, handler: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.subscribe(topic, handler)
    }

    /// Register `handler` for the lifetime of the returned guard.
    pub fn subscribe_scoped<F>(&self, topic: impl Into<String>, handler: F) -> SubscriptionGuard
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.subscribe(topic, handler).into_guard()
    }

    /// Send `{"type": kind, "payload": payload}`.
    ///
    /// Returns whether the frame was queued on an open connection. Nothing
    /// is buffered: while not open the frame is logged and dropped.
    pub fn send<T: Serialize + ?Sized>(&self, kind: &str, payload: &T) -> bool {
        match Envelope::new(kind, payload).and_then(|env| env.encode()) {
            Ok(frame) => self.shared.transmit(frame, kind),
            Err(err) => {
                warn!(error = %err, kind, "failed to encode outbound frame");
                false
            }
        }
    }

    /// Alias for [`send`](Self::send).
    pub fn emit<T: Serialize + ?Sized>(&self, kind: &str, payload: &T) -> bool {
        self.send(kind, payload)
    }

    /// Send a flat JSON object as-is. Same delivery rules as
    /// [`send`](Self::send).
    pub fn query<T: Serialize + ?Sized>(&self, message: &T) -> bool {
        match envelope::encode_query(message) {
            Ok(frame) => self.shared.transmit(frame, "query"),
            Err(err) => {
                warn!(error = %err, "failed to encode query");
                false
            }
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Whether the connection is open.
    pub fn is_connected(&self) -> bool {
        self.state().is_open()
    }

    /// Receiver that observes every state change.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.watch_state()
    }

    /// Reconnects made since the last successful open.
    pub fn reconnect_attempts(&self) -> u32 {
        self.shared.reconnect.attempts()
    }

    /// Whether the reconnect ceiling was hit and the client is idle.
    pub fn reconnect_exhausted(&self) -> bool {
        self.shared.reconnect.is_exhausted()
    }

    /// Most recent successfully parsed inbound frame.
    pub fn last_message(&self) -> Option<Value> {
        self.shared.last_message()
    }

    /// The registry backing this client's subscriptions.
    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.shared.registry
    }

    /// Tear down and wait for the connection task to finish.
    pub async fn close(&self) {
        self.cancel.cancel();
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(err) = task.await {
                warn!(error = %err, "connection task ended abnormally");
            }
        }
    }
}

impl Drop for MessagingClient {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for MessagingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessagingClient")
            .field("state", &self.state())
            .field("reconnect_attempts", &self.reconnect_attempts())
            .finish_non_exhaustive()
    }
}
