//! Command-line arguments and their resolution against settings.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use sagitta_chat::{ChatSession, SessionType};
use sagitta_settings::{SagittaSettings, SocketSettings};
use sagitta_socket::SocketConfig;
use tracing::warn;
use uuid::Uuid;

/// Terminal chat client.
#[derive(Parser, Debug)]
#[command(name = "sagitta", about = "Chat with a Sagitta backend from the terminal")]
pub struct Cli {
    /// WebSocket base URL (overrides settings), e.g. `ws://127.0.0.1:8000`.
    #[arg(long)]
    pub base_url: Option<String>,

    /// User id sent with every query.
    #[arg(long, default_value = "guest")]
    pub user_id: String,

    /// Chat session id. A new one is generated when omitted.
    #[arg(long)]
    pub session_id: Option<String>,

    /// Fixed access token. A fresh token is generated per connection attempt
    /// when omitted.
    #[arg(long)]
    pub token: Option<String>,

    /// Settings file (defaults to `~/.sagitta/settings.json`).
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Log filter (overrides settings), e.g. `debug` or `sagitta_socket=trace`.
    #[arg(long)]
    pub log_level: Option<String>,
}

/// Everything needed to open the chat socket.
#[derive(Debug)]
pub struct Plan {
    pub base_url: String,
    pub token: Option<String>,
    pub session: ChatSession,
    pub socket: SocketConfig,
}

impl Plan {
    /// Merge CLI flags over settings.
    pub fn resolve(cli: &Cli, settings: &SagittaSettings) -> Self {
        let session_type = SessionType::parse(&settings.chat.session_type).unwrap_or_else(|| {
            warn!(
                value = %settings.chat.session_type,
                "unknown session type in settings, using default"
            );
            SessionType::Default
        });
        let session = ChatSession {
            user_id: cli.user_id.clone(),
            session_id: cli
                .session_id
                .clone()
                .unwrap_or_else(|| Uuid::now_v7().to_string()),
            session_type,
            assistant_name: settings.chat.assistant_name.clone(),
        };
        Self {
            base_url: cli
                .base_url
                .clone()
                .unwrap_or_else(|| settings.chat.base_ws_url.clone()),
            token: cli.token.clone(),
            session,
            socket: socket_config(&settings.socket),
        }
    }
}

/// Log filter: the flag wins over settings. Needed before [`Plan::resolve`]
/// so its warnings reach the subscriber.
pub fn log_level(cli: &Cli, settings: &SagittaSettings) -> String {
    cli.log_level
        .clone()
        .unwrap_or_else(|| settings.logging.level.clone())
}

/// Map file/env socket settings onto the client configuration.
pub fn socket_config(settings: &SocketSettings) -> SocketConfig {
    SocketConfig {
        reconnect_attempts: settings.reconnect_attempts,
        reconnect_interval: Duration::from_millis(settings.reconnect_interval_ms),
        heartbeat_interval: Duration::from_millis(settings.heartbeat_interval_ms),
        protocols: settings.protocols.clone(),
        ..SocketConfig::default()
    }
}
