//! Transport seam.
//!
//! The client only needs a way to open a duplex text channel. [`Connector`]
//! abstracts that handshake so the real WebSocket implementation and the
//! in-memory test transport are interchangeable.

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Sink, Stream};

use crate::error::SocketError;

pub mod memory;
pub mod tungstenite;

pub use memory::{MemoryConnector, MemoryPeer, MemoryServer, memory_transport};
pub use tungstenite::TungsteniteConnector;

/// Outbound half of a live connection.
pub type FrameSink = Pin<Box<dyn Sink<String, Error = SocketError> + Send>>;
/// Inbound half of a live connection. Ends when the peer closes.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String, SocketError>> + Send>>;

/// An established connection, split into its two directions.
pub struct Link {
    /// Text frames to the peer.
    pub sink: FrameSink,
    /// Text frames from the peer.
    pub stream: FrameStream,
}

impl Link {
    /// Bundle a sink and a stream.
    pub fn new(sink: FrameSink, stream: FrameStream) -> Self {
        Self { sink, stream }
    }
}

impl std::fmt::Debug for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Link").finish_non_exhaustive()
    }
}

/// Parameters for one connection attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectRequest {
    /// Resolved endpoint URL.
    pub url: String,
    /// Subprotocols to offer.
    pub protocols: Vec<String>,
}

/// Opens connections.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Perform one handshake. Each call yields an independent connection.
    async fn connect(&self, request: &ConnectRequest) -> Result<Link, SocketError>;
}
