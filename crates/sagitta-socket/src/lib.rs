//! # sagitta-socket
//!
//! A reconnecting duplex messaging client over WebSocket.
//!
//! - One logical connection per [`MessagingClient`], replaced (never mutated)
//!   on every reconnect attempt, with a fixed-delay retry ceiling
//! - Publish/subscribe dispatch of inbound JSON frames through a
//!   [`SubscriptionRegistry`]
//! - Fire-and-forget `send` (typed `{type, payload}` envelope) and `query`
//!   (flat object) that drop frames while not connected
//! - A `{"type":"ping"}` heartbeat bound to the open connection
//!
//! The client is an actor: a spawned task owns the transport, the reconnect
//! timer and the heartbeat, while the [`MessagingClient`] handle exposes
//! synchronous operations backed by channels and locks.
//!
//! ```no_run
//! # async fn demo() {
//! use sagitta_socket::{DEFAULT_TOPIC, MessagingClient, SocketConfig};
//!
//! let url = "ws://127.0.0.1:8000/ws/query?token=t";
//! let client = MessagingClient::new(url, SocketConfig::default());
//! let sub = client.subscribe(DEFAULT_TOPIC, |msg| println!("{msg}"));
//! let _ = client.query(&serde_json::json!({"query": "hello"}));
//! sub.unsubscribe();
//! client.close().await;
//! # }
//! ```

#![deny(unsafe_code)]

pub mod client;
pub mod config;
mod connection;
pub mod dispatch;
pub mod endpoint;
pub mod envelope;
pub mod error;
pub mod heartbeat;
pub mod reconnect;
pub mod registry;
pub mod state;
pub mod transport;

pub use client::{MessagingClient, MessagingClientBuilder};
pub use config::{Callbacks, CloseInfo, DispatchMode, SocketConfig};
pub use endpoint::Endpoint;
pub use envelope::Envelope;
pub use error::SocketError;
pub use registry::{
    DEFAULT_TOPIC, MessageHandler, Subscription, SubscriptionGuard, SubscriptionRegistry,
};
pub use state::ConnectionState;
pub use transport::{ConnectRequest, Connector, Link};
