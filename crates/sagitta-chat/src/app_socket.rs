//! Application channel with per-type topics.

use sagitta_socket::{
    DispatchMode, Endpoint, MessagingClient, MessagingClientBuilder, SocketConfig,
    SubscriptionGuard,
};
use serde::Serialize;
use serde_json::Value;

/// Topic carrying chat payloads.
pub const CHAT_TOPIC: &str = "chat";
/// Topic carrying log payloads.
pub const LOGS_TOPIC: &str = "logs";
/// Reconnect ceiling used by [`AppSocket::connect`].
pub const APP_RECONNECT_ATTEMPTS: u32 = 3;

/// Typed-dispatch socket: a frame `{"type": "chat", "payload": P}` reaches
/// chat subscribers as `P`.
#[derive(Debug)]
pub struct AppSocket {
    client: MessagingClient,
}

impl AppSocket {
    /// Connect over WebSocket with the app defaults.
    pub fn connect(endpoint: impl Into<Endpoint>) -> Self {
        Self::from_builder(MessagingClient::builder(endpoint).config(SocketConfig {
            reconnect_attempts: APP_RECONNECT_ATTEMPTS,
            ..SocketConfig::default()
        }))
    }

    /// Build from a configured client builder. Dispatch is forced to typed.
    pub fn from_builder(builder: MessagingClientBuilder) -> Self {
        Self {
            client: builder.dispatch(DispatchMode::Typed).build(),
        }
    }

    /// Receive `chat` payloads until the guard is dropped.
    pub fn subscribe_to_chat_messages<F>(&self, handler: F) -> SubscriptionGuard
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.client.subscribe_scoped(CHAT_TOPIC, handler)
    }

    /// Receive `logs` payloads until the guard is dropped.
    pub fn subscribe_to_logs<F>(&self, handler: F) -> SubscriptionGuard
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.client.subscribe_scoped(LOGS_TOPIC, handler)
    }

    /// Send `{"type": "chat", "payload": message}`.
    pub fn send_chat_message<T: Serialize + ?Sized>(&self, message: &T) -> bool {
        self.client.send(CHAT_TOPIC, message)
    }

    /// Send a flat query object.
    pub fn send_query<T: Serialize + ?Sized>(&self, query: &T) -> bool {
        self.client.query(query)
    }

    /// Whether the connection is open.
    pub fn is_connected(&self) -> bool {
        self.client.is_connected()
    }

    /// The underlying client.
    pub fn client(&self) -> &MessagingClient {
        &self.client
    }

    /// Tear the connection down.
    pub async fn close(&self) {
        self.client.close().await;
    }
}
