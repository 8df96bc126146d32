//! Socket error types.
//!
//! None of these are returned from `send`/`query`; they reach callers only
//! through the `on_error` callback and the logs.

use thiserror::Error;

/// Errors raised while establishing or using a connection.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SocketError {
    /// The endpoint could not be turned into a handshake request.
    #[error("invalid endpoint {url}: {reason}")]
    InvalidUrl {
        /// The offending URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The handshake failed or the peer refused the connection.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The established connection failed while reading or writing.
    #[error("transport error: {0}")]
    Transport(String),

    /// An outbound payload could not be serialized.
    #[error("failed to encode frame: {0}")]
    Encode(String),
}

impl From<serde_json::Error> for SocketError {
    fn from(err: serde_json::Error) -> Self {
        Self::Encode(err.to_string())
    }
}
