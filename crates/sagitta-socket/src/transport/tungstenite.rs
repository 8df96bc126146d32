//! WebSocket transport over tokio-tungstenite.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt, future};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, warn};

use super::{ConnectRequest, Connector, Link};
use crate::error::SocketError;

/// Connects with `ws://` / `wss://` URLs.
#[derive(Clone, Copy, Debug, Default)]
pub struct TungsteniteConnector;

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn connect(&self, request: &ConnectRequest) -> Result<Link, SocketError> {
        let handshake = build_request(request)?;
        let (ws, response) = connect_async(handshake)
            .await
            .map_err(|e| SocketError::Connect(e.to_string()))?;
        debug!(status = %response.status(), "websocket handshake complete");

        let (ws_tx, ws_rx) = ws.split();
        let sink = ws_tx
            .sink_map_err(|e| SocketError::Transport(e.to_string()))
            .with(|text: String| future::ready(Ok::<_, SocketError>(Message::Text(text.into()))));
        let stream = ws_rx.filter_map(|msg| future::ready(text_frame(msg)));
        Ok(Link::new(Box::pin(sink), Box::pin(stream)))
    }
}

fn build_request(request: &ConnectRequest) -> Result<Request, SocketError> {
    let invalid = |reason: String| SocketError::InvalidUrl {
        url: request.url.clone(),
        reason,
    };
    let mut handshake = request
        .url
        .as_str()
        .into_client_request()
        .map_err(|e| invalid(e.to_string()))?;
    if !request.protocols.is_empty() {
        let value = HeaderValue::from_str(&request.protocols.join(", "))
            .map_err(|e| invalid(format!("bad subprotocol list: {e}")))?;
        let _ = handshake.headers_mut().insert(SEC_WEBSOCKET_PROTOCOL, value);
    }
    Ok(handshake)
}

/// Reduce a WebSocket message to a text frame. Control frames are skipped;
/// binary frames are accepted when they hold UTF-8.
fn text_frame(msg: Result<Message, WsError>) -> Option<Result<String, SocketError>> {
    match msg {
        Ok(Message::Text(text)) => Some(Ok(text.as_str().to_owned())),
        Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
            Ok(text) => Some(Ok(text)),
            Err(_) => {
                warn!(len = bytes.len(), "dropping non-UTF-8 binary frame");
                None
            }
        },
        Ok(Message::Ping(_) | Message::Pong(_) | Message::Close(_) | Message::Frame(_)) => None,
        Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => None,
        Err(e) => Some(Err(SocketError::Transport(e.to_string()))),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn request(url: &str, protocols: &[&str]) -> ConnectRequest {
        ConnectRequest {
            url: url.into(),
            protocols: protocols.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn request_without_protocols_has_no_header() {
        let req = build_request(&request("ws://127.0.0.1:9/ws", &[])).unwrap();
        assert!(req.headers().get(SEC_WEBSOCKET_PROTOCOL).is_none());
        assert_eq!(req.uri().path(), "/ws");
    }

    #[test]
    fn request_offers_protocols() {
        let req =
            build_request(&request("ws://127.0.0.1:9/ws", &["chat.v1", "chat.v2"])).unwrap();
        assert_eq!(
            req.headers().get(SEC_WEBSOCKET_PROTOCOL).unwrap(),
            "chat.v1, chat.v2"
        );
    }

    #[test]
    fn request_rejects_garbage_url() {
        let err = build_request(&request("not a url", &[])).unwrap_err();
        assert_matches!(err, SocketError::InvalidUrl { url, .. } if url == "not a url");
    }

    #[test]
    fn text_and_utf8_binary_pass_through() {
        assert_eq!(
            text_frame(Ok(Message::Text("hi".into()))),
            Some(Ok("hi".to_owned()))
        );
        assert_eq!(
            text_frame(Ok(Message::Binary(b"{}".to_vec().into()))),
            Some(Ok("{}".to_owned()))
        );
    }

    #[test]
    fn control_frames_and_bad_binary_are_skipped() {
        assert_eq!(text_frame(Ok(Message::Ping(Vec::<u8>::new().into()))), None);
        assert_eq!(text_frame(Ok(Message::Pong(Vec::<u8>::new().into()))), None);
        assert_eq!(text_frame(Ok(Message::Close(None))), None);
        assert_eq!(text_frame(Ok(Message::Binary(vec![0xff_u8, 0xfe].into()))), None);
    }

    #[test]
    fn closed_is_end_not_error() {
        assert_eq!(text_frame(Err(WsError::ConnectionClosed)), None);
        assert_matches!(
            text_frame(Err(WsError::Io(std::io::Error::other("reset")))),
            Some(Err(SocketError::Transport(_)))
        );
    }
}
