//! In-process transport for tests and demos.
//!
//! [`memory_transport`] returns a connector and the server side that accepts
//! its connections. Each successful connect hands the server a fresh
//! [`MemoryPeer`], which can push frames to the client, read what the client
//! sent, and close or fail the connection. Connect outcomes can be scripted
//! per attempt.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::channel::mpsc as fmpsc;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;

use super::{ConnectRequest, Connector, Link};
use crate::error::SocketError;

#[derive(Clone, Debug)]
enum Outcome {
    Accept,
    Refuse(String),
}

#[derive(Debug)]
struct Inner {
    scripted: Mutex<VecDeque<Outcome>>,
    fallback: Mutex<Outcome>,
    handshake_delay: Mutex<Duration>,
    attempts: AtomicUsize,
    requests: Mutex<Vec<ConnectRequest>>,
    peers: mpsc::UnboundedSender<MemoryPeer>,
}

/// Client side of the in-memory transport. Cheap to clone; clones share the
/// script and the attempt log.
#[derive(Clone, Debug)]
pub struct MemoryConnector {
    inner: Arc<Inner>,
}

/// Server side: yields one [`MemoryPeer`] per accepted connection.
#[derive(Debug)]
pub struct MemoryServer {
    peers: mpsc::UnboundedReceiver<MemoryPeer>,
}

/// Create a connected connector/server pair. Connections are accepted unless
/// scripted otherwise.
pub fn memory_transport() -> (MemoryConnector, MemoryServer) {
    let (tx, rx) = mpsc::unbounded_channel();
    let inner = Inner {
        scripted: Mutex::new(VecDeque::new()),
        fallback: Mutex::new(Outcome::Accept),
        handshake_delay: Mutex::new(Duration::ZERO),
        attempts: AtomicUsize::new(0),
        requests: Mutex::new(Vec::new()),
        peers: tx,
    };
    (
        MemoryConnector {
            inner: Arc::new(inner),
        },
        MemoryServer { peers: rx },
    )
}

impl MemoryConnector {
    /// Refuse the next unscripted attempt with `reason`.
    pub fn refuse_next(&self, reason: impl Into<String>) {
        self.inner
            .scripted
            .lock()
            .push_back(Outcome::Refuse(reason.into()));
    }

    /// Accept the next unscripted attempt.
    pub fn accept_next(&self) {
        self.inner.scripted.lock().push_back(Outcome::Accept);
    }

    /// Refuse every attempt not covered by the script.
    pub fn refuse_all(&self, reason: impl Into<String>) {
        *self.inner.fallback.lock() = Outcome::Refuse(reason.into());
    }

    /// Accept every attempt not covered by the script.
    pub fn accept_all(&self) {
        *self.inner.fallback.lock() = Outcome::Accept;
    }

    /// Make each handshake take `delay` before resolving.
    pub fn set_handshake_delay(&self, delay: Duration) {
        *self.inner.handshake_delay.lock() = delay;
    }

    /// Connect calls made so far, successful or not.
    pub fn attempts(&self) -> usize {
        self.inner.attempts.load(Ordering::SeqCst)
    }

    /// Every request received, in order.
    pub fn requests(&self) -> Vec<ConnectRequest> {
        self.inner.requests.lock().clone()
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, request: &ConnectRequest) -> Result<Link, SocketError> {
        let _ = self.inner.attempts.fetch_add(1, Ordering::SeqCst);
        self.inner.requests.lock().push(request.clone());

        let delay = *self.inner.handshake_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let outcome = {
            let next = self.inner.scripted.lock().pop_front();
            next.unwrap_or_else(|| self.inner.fallback.lock().clone())
        };
        if let Outcome::Refuse(reason) = outcome {
            return Err(SocketError::Connect(reason));
        }

        let (to_peer, from_client) = fmpsc::unbounded::<String>();
        let (to_client, from_peer) = fmpsc::unbounded::<Result<String, SocketError>>();
        let peer = MemoryPeer {
            request: request.clone(),
            incoming: from_client,
            outgoing: Some(to_client),
        };
        self.inner
            .peers
            .send(peer)
            .map_err(|_| SocketError::Connect("memory server dropped".into()))?;

        let sink = to_peer.sink_map_err(|e| SocketError::Transport(e.to_string()));
        Ok(Link::new(Box::pin(sink), Box::pin(from_peer)))
    }
}

impl MemoryServer {
    /// Wait for the next accepted connection.
    pub async fn accept(&mut self) -> Option<MemoryPeer> {
        self.peers.recv().await
    }

    /// An accepted connection that is already waiting, if any.
    pub fn try_accept(&mut self) -> Option<MemoryPeer> {
        self.peers.try_recv().ok()
    }
}

/// Server-side handle to one in-memory connection.
#[derive(Debug)]
pub struct MemoryPeer {
    request: ConnectRequest,
    incoming: fmpsc::UnboundedReceiver<String>,
    outgoing: Option<fmpsc::UnboundedSender<Result<String, SocketError>>>,
}

impl MemoryPeer {
    /// The request that opened this connection.
    pub fn request(&self) -> &ConnectRequest {
        &self.request
    }

    /// Push a raw text frame to the client. False once closed.
    pub fn send_text(&self, text: impl Into<String>) -> bool {
        self.outgoing
            .as_ref()
            .is_some_and(|tx| tx.unbounded_send(Ok(text.into())).is_ok())
    }

    /// Push a JSON frame to the client.
    pub fn send_json(&self, value: &Value) -> bool {
        self.send_text(value.to_string())
    }

    /// Next frame the client sent. `None` once the client closed its side and
    /// every buffered frame was read.
    pub async fn recv(&mut self) -> Option<String> {
        self.incoming.next().await
    }

    /// A frame the client already sent, without waiting.
    pub fn try_recv(&mut self) -> Option<String> {
        self.incoming.try_next().ok().flatten()
    }

    /// Close from the server side. The client sees a clean end of stream.
    pub fn close(&mut self) {
        if let Some(tx) = self.outgoing.take() {
            tx.close_channel();
        }
    }

    /// Break the connection with a transport error.
    pub fn fail(&mut self, reason: impl Into<String>) {
        if let Some(tx) = self.outgoing.take() {
            let _ = tx.unbounded_send(Err(SocketError::Transport(reason.into())));
            tx.close_channel();
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn request() -> ConnectRequest {
        ConnectRequest {
            url: "mem://test".into(),
            protocols: Vec::new(),
        }
    }

    #[tokio::test]
    async fn accept_links_both_directions() {
        let (connector, mut server) = memory_transport();
        let mut link = connector.connect(&request()).await.unwrap();
        let mut peer = server.accept().await.unwrap();

        link.sink.send("up".into()).await.unwrap();
        assert_eq!(peer.recv().await.as_deref(), Some("up"));

        assert!(peer.send_text("down"));
        assert_eq!(link.stream.next().await, Some(Ok("down".into())));

        peer.close();
        assert_eq!(link.stream.next().await, None);
        assert!(!peer.send_text("late"));
    }

    #[tokio::test]
    async fn scripted_refusals_then_fallback() {
        let (connector, mut server) = memory_transport();
        connector.refuse_next("nope");
        assert_matches!(
            connector.connect(&request()).await,
            Err(SocketError::Connect(reason)) if reason == "nope"
        );
        assert!(connector.connect(&request()).await.is_ok());
        assert_eq!(connector.attempts(), 2);
        assert!(server.try_accept().is_some());
        assert!(server.try_accept().is_none());
    }

    #[tokio::test]
    async fn refuse_all_overrides_fallback() {
        let (connector, _server) = memory_transport();
        connector.refuse_all("down");
        connector.accept_next();
        assert!(connector.connect(&request()).await.is_ok());
        assert!(connector.connect(&request()).await.is_err());
        connector.accept_all();
        assert!(connector.connect(&request()).await.is_ok());
    }

    #[tokio::test]
    async fn fail_delivers_error_then_end() {
        let (connector, mut server) = memory_transport();
        let mut link = connector.connect(&request()).await.unwrap();
        let mut peer = server.accept().await.unwrap();

        peer.fail("reset");
        assert_eq!(
            link.stream.next().await,
            Some(Err(SocketError::Transport("reset".into())))
        );
        assert_eq!(link.stream.next().await, None);
    }

    #[tokio::test]
    async fn client_close_ends_peer_recv() {
        let (connector, mut server) = memory_transport();
        let mut link = connector.connect(&request()).await.unwrap();
        let mut peer = server.accept().await.unwrap();

        link.sink.close().await.unwrap();
        assert_eq!(peer.recv().await, None);
    }

    #[tokio::test]
    async fn records_requests() {
        let (connector, _server) = memory_transport();
        let req = ConnectRequest {
            url: "mem://a".into(),
            protocols: vec!["p1".into()],
        };
        let _ = connector.connect(&req).await.unwrap();
        assert_eq!(connector.requests(), vec![req]);
    }

    #[tokio::test(start_paused = true)]
    async fn handshake_delay_is_observed() {
        let (connector, _server) = memory_transport();
        connector.set_handshake_delay(Duration::from_secs(2));
        let start = tokio::time::Instant::now();
        let _ = connector.connect(&request()).await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }
}
