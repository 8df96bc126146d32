//! Client configuration and lifecycle callbacks.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::SocketError;

/// Default number of reconnect attempts after a close.
pub const DEFAULT_RECONNECT_ATTEMPTS: u32 = 5;
/// Default delay between a close and the next reconnect attempt.
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_millis(3_000);
/// Default period of the `{"type":"ping"}` heartbeat.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(30_000);

/// How inbound frames are routed to topics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DispatchMode {
    /// Every parsed frame goes to the default topic only.
    #[default]
    Broadcast,
    /// Default-topic delivery, plus the frame's `payload` is delivered to the
    /// topic named by its `type` field.
    Typed,
}

/// Tunables for a [`MessagingClient`](crate::MessagingClient).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SocketConfig {
    /// Reconnects allowed after a close before the client gives up.
    pub reconnect_attempts: u32,
    /// Fixed delay before each reconnect attempt.
    pub reconnect_interval: Duration,
    /// Heartbeat period while the connection is open. Zero disables it.
    pub heartbeat_interval: Duration,
    /// Subprotocols offered in the handshake. Empty means none.
    pub protocols: Vec<String>,
    /// Connect as soon as the client is built. When false the client stays
    /// `Uninstantiated` until `connect()` is called.
    pub auto_connect: bool,
    /// Inbound routing mode.
    pub dispatch: DispatchMode,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            reconnect_attempts: DEFAULT_RECONNECT_ATTEMPTS,
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            protocols: Vec::new(),
            auto_connect: true,
            dispatch: DispatchMode::Broadcast,
        }
    }
}

/// Why a connection ended, passed to `on_close`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CloseInfo {
    /// Whether the connection had reached `Open` before it ended.
    pub was_open: bool,
    /// Human-readable cause.
    pub reason: String,
}

impl CloseInfo {
    pub(crate) fn new(was_open: bool, reason: impl Into<String>) -> Self {
        Self {
            was_open,
            reason: reason.into(),
        }
    }
}

/// Called when a connection opens.
pub type OpenCallback = Arc<dyn Fn() + Send + Sync>;
/// Called when a connection closes or a connect attempt fails.
pub type CloseCallback = Arc<dyn Fn(&CloseInfo) + Send + Sync>;
/// Called on connect or transport failure.
pub type ErrorCallback = Arc<dyn Fn(&SocketError) + Send + Sync>;
/// Called with every raw inbound text frame, before parsing.
pub type RawMessageCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Optional lifecycle callbacks. All run on the connection task.
#[derive(Clone, Default)]
pub struct Callbacks {
    /// See [`OpenCallback`].
    pub on_open: Option<OpenCallback>,
    /// See [`CloseCallback`].
    pub on_close: Option<CloseCallback>,
    /// See [`ErrorCallback`].
    pub on_error: Option<ErrorCallback>,
    /// See [`RawMessageCallback`].
    pub on_message: Option<RawMessageCallback>,
}

impl Callbacks {
    pub(crate) fn open(&self) {
        if let Some(cb) = &self.on_open {
            cb();
        }
    }

    pub(crate) fn close(&self, info: &CloseInfo) {
        if let Some(cb) = &self.on_close {
            cb(info);
        }
    }

    pub(crate) fn error(&self, err: &SocketError) {
        if let Some(cb) = &self.on_error {
            cb(err);
        }
    }

    pub(crate) fn message(&self, raw: &str) {
        if let Some(cb) = &self.on_message {
            cb(raw);
        }
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_open", &self.on_open.is_some())
            .field("on_close", &self.on_close.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_message", &self.on_message.is_some())
            .finish()
    }
}
