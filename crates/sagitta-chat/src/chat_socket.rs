//! A single chat session over the messaging client.

use sagitta_socket::{
    ConnectionState, Connector, DEFAULT_TOPIC, Endpoint, MessagingClient, MessagingClientBuilder,
    SocketConfig, SubscriptionGuard,
};
use serde_json::Value;
use tracing::{trace, warn};

use crate::banner::ConnectionBanner;
use crate::endpoint::query_url;
use crate::message::{ChatQuery, ChatReply, FileMessage, SessionType};
use crate::token::TokenSource;

/// Assistant persona name sent with every query.
pub const DEFAULT_ASSISTANT_NAME: &str = "Sagittarius";

/// Who is chatting, and in which session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatSession {
    /// Sending user.
    pub user_id: String,
    /// Chat session id.
    pub session_id: String,
    /// Pipeline selector.
    pub session_type: SessionType,
    /// Assistant persona name.
    pub assistant_name: String,
}

impl ChatSession {
    /// Default-pipeline session with the default assistant.
    pub fn new(user_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            session_id: session_id.into(),
            session_type: SessionType::Default,
            assistant_name: DEFAULT_ASSISTANT_NAME.to_owned(),
        }
    }
}

/// Builder for [`ChatSocket`].
pub struct ChatSocketBuilder {
    client: MessagingClientBuilder,
    session: ChatSession,
}

impl ChatSocketBuilder {
    /// Socket configuration (reconnect policy, heartbeat, protocols).
    #[must_use]
    pub fn config(mut self, config: SocketConfig) -> Self {
        self.client = self.client.config(config);
        self
    }

    /// Use a different transport.
    #[must_use]
    pub fn connector(mut self, connector: impl Connector) -> Self {
        self.client = self.client.connector(connector);
        self
    }

    /// Adjust the underlying client builder, e.g. to add callbacks.
    #[must_use]
    pub fn with_client(
        mut self,
        f: impl FnOnce(MessagingClientBuilder) -> MessagingClientBuilder,
    ) -> Self {
        self.client = f(self.client);
        self
    }

    /// Connect.
    pub fn build(self) -> ChatSocket {
        ChatSocket {
            client: self.client.build(),
            session: self.session,
        }
    }
}

/// Chat facade: flat queries out, [`ChatReply`]s in.
///
/// The endpoint is rebuilt on every connection attempt with a fresh token
/// from the [`TokenSource`].
#[derive(Debug)]
pub struct ChatSocket {
    client: MessagingClient,
    session: ChatSession,
}

impl ChatSocket {
    /// Start building a chat socket against `base_url` (e.g.
    /// `ws://127.0.0.1:8000`).
    pub fn builder(
        base_url: impl Into<String>,
        tokens: impl TokenSource,
        session: ChatSession,
    ) -> ChatSocketBuilder {
        let base_url = base_url.into();
        let endpoint = Endpoint::factory(move || query_url(&base_url, &tokens.token()));
        ChatSocketBuilder {
            client: MessagingClient::builder(endpoint),
            session,
        }
    }

    /// Send the user's text as a chat query.
    pub fn send_message(&self, text: &str) -> bool {
        let query = ChatQuery {
            query: text.to_owned(),
            session_id: self.session.session_id.clone(),
            user_id: self.session.user_id.clone(),
            session_type: self.session.session_type,
            name: self.session.assistant_name.clone(),
        };
        self.client.query(&query)
    }

    /// Announce a completed upload.
    pub fn send_file(&self, url: &str, filename: &str) -> bool {
        let message = FileMessage::uploaded(&self.session.session_id, url, filename);
        self.client.send(FileMessage::TYPE, &message)
    }

    /// Receive assistant replies until the guard is dropped. Frames that are
    /// not replies are logged and skipped.
    pub fn subscribe_to_messages<F>(&self, handler: F) -> SubscriptionGuard
    where
        F: Fn(&ChatReply) + Send + Sync + 'static,
    {
        self.client
            .subscribe_scoped(DEFAULT_TOPIC, move |frame| match ChatReply::from_frame(frame) {
                Some(reply) => handler(&reply),
                None if is_pong(frame) => trace!("heartbeat reply"),
                None => warn!(%frame, "unexpected chat frame"),
            })
    }

    /// Whether the connection is open.
    pub fn is_connected(&self) -> bool {
        self.client.is_connected()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.client.state()
    }

    /// Notice to show the user, if any.
    pub fn banner(&self) -> Option<ConnectionBanner> {
        ConnectionBanner::for_client(&self.client)
    }

    /// Session details.
    pub fn session(&self) -> &ChatSession {
        &self.session
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

fn is_pong(frame: &Value) -> bool {
    frame.get("type").and_then(Value::as_str) == Some("pong")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use sagitta_core::logging::capture_logs;
    use sagitta_socket::transport::memory_transport;
    use serde_json::json;
    use tokio::sync::mpsc;
    use tracing::Level;

    use super::*;
    use crate::token::StaticToken;

    fn session() -> ChatSession {
        ChatSession::new("u-1", "s-1")
    }

    async fn wait_open(socket: &ChatSocket) {
        let mut rx = socket.client().watch_state();
        let _ = rx.wait_for(|s| *s == ConnectionState::Open).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn sends_queries_with_session_fields() {
        let (connector, mut server) = memory_transport();
        let socket = ChatSocket::builder("ws://h/", StaticToken("tok".into()), session())
            .connector(connector)
            .build();
        let mut peer = server.accept().await.unwrap();
        wait_open(&socket).await;
        assert_eq!(peer.request().url, "ws://h/ws/query?token=tok");

        assert!(socket.send_message("what is rust?"));
        let frame: Value = serde_json::from_str(&peer.recv().await.unwrap()).unwrap();
        assert_eq!(
            frame,
            json!({
                "query": "what is rust?",
                "sessionId": "s-1",
                "userId": "u-1",
                "sessionType": "default",
                "name": "Sagittarius",
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn send_file_uses_typed_envelope() {
        let (connector, mut server) = memory_transport();
        let socket = ChatSocket::builder("ws://h", StaticToken("t".into()), session())
            .connector(connector)
            .build();
        let mut peer = server.accept().await.unwrap();
        wait_open(&socket).await;

        assert!(socket.send_file("https://cdn/a.pdf", "a.pdf"));
        let frame: Value = serde_json::from_str(&peer.recv().await.unwrap()).unwrap();
        assert_eq!(frame["type"], "file_message");
        assert_eq!(frame["payload"]["file_info"]["filename"], "a.pdf");
        assert_eq!(frame["payload"]["session_id"], "s-1");
    }

    #[tokio::test(start_paused = true)]
    async fn replies_are_parsed_and_others_skipped() {
        let (logs, _guard) = capture_logs();
        let (connector, mut server) = memory_transport();
        let socket = ChatSocket::builder("ws://h", StaticToken("t".into()), session())
            .connector(connector)
            .build();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _replies = socket.subscribe_to_messages(move |reply| {
            let _ = tx.send(reply.clone());
        });
        let peer = server.accept().await.unwrap();
        wait_open(&socket).await;

        assert!(peer.send_json(&json!({"type": "pong"})));
        assert!(peer.send_json(&json!({"status": "thinking"})));
        assert!(peer.send_json(&json!({
            "response": "hello!",
            "sessionId": "s-1",
            "sessionType": "default",
        })));

        let reply = rx.recv().await.unwrap();
        assert_eq!(reply.response, "hello!");
        assert_eq!(logs.count_matching(Level::WARN, "unexpected chat frame"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_token_on_every_attempt() {
        let (connector, mut server) = memory_transport();
        connector.refuse_next("token expired");
        let n = AtomicU32::new(0);
        let tokens = move || format!("t{}", n.fetch_add(1, Ordering::SeqCst));
        let socket = ChatSocket::builder("ws://h", tokens, session())
            .connector(connector.clone())
            .config(SocketConfig {
                reconnect_interval: Duration::from_millis(100),
                ..SocketConfig::default()
            })
            .build();

        let peer = server.accept().await.unwrap();
        wait_open(&socket).await;
        assert_eq!(peer.request().url, "ws://h/ws/query?token=t1");
        assert_eq!(connector.requests()[0].url, "ws://h/ws/query?token=t0");
    }

    #[tokio::test(start_paused = true)]
    async fn banner_follows_connection() {
        let (connector, mut server) = memory_transport();
        connector.refuse_all("down");
        let opened = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&opened);
        let socket = ChatSocket::builder("ws://h", StaticToken("t".into()), session())
            .connector(connector.clone())
            .config(SocketConfig {
                reconnect_attempts: 2,
                reconnect_interval: Duration::from_secs(1),
                ..SocketConfig::default()
            })
            .with_client(|b| {
                b.on_open(move || {
                    let _ = counter.fetch_add(1, Ordering::SeqCst);
                })
            })
            .build();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(socket.banner(), Some(ConnectionBanner::Disconnected));
        assert!(!socket.send_message("anyone?"));

        connector.accept_all();
        socket.client().connect();
        let _peer = server.accept().await.unwrap();
        wait_open(&socket).await;
        assert_eq!(socket.banner(), None);
        assert_eq!(opened.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn close_clears_reply_subscription() {
        let (connector, mut server) = memory_transport();
        let socket = ChatSocket::builder("ws://h", StaticToken("t".into()), session())
            .connector(connector)
            .build();
        let _replies = socket.subscribe_to_messages(|_| {});
        let _peer = server.accept().await.unwrap();
        wait_open(&socket).await;

        socket.close().await;
        assert_eq!(socket.state(), ConnectionState::Closed);
        assert_eq!(socket.client().registry().topic_count(), 0);
    }
}
