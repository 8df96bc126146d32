//! # sagitta-chat
//!
//! Domain facades over [`sagitta_socket::MessagingClient`]:
//!
//! - [`ChatSocket`]: one chat session. Sends flat queries, parses replies,
//!   and reconnects with a fresh token on every attempt.
//! - [`AppSocket`]: typed-dispatch channel with `chat` and `logs` topics.
//! - [`ConnectionBanner`]: user-facing connection notice derived from the
//!   client's state.

#![deny(unsafe_code)]

pub mod app_socket;
pub mod banner;
pub mod chat_socket;
pub mod endpoint;
pub mod message;
pub mod token;

pub use app_socket::AppSocket;
pub use banner::ConnectionBanner;
pub use chat_socket::{ChatSession, ChatSocket, ChatSocketBuilder};
pub use endpoint::query_url;
pub use message::{ChatQuery, ChatReply, FileInfo, FileMessage, SessionType};
pub use token::{StaticToken, TokenSource};
