//! Settings type definitions.
//!
//! Field names are camelCase on disk. Every section is `#[serde(default)]`,
//! so a settings file only needs the keys it overrides.

use sagitta_core::logging::LogFormat;
use serde::{Deserialize, Serialize};

/// Root settings type.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SagittaSettings {
    /// Settings schema version.
    pub version: String,
    /// Messaging client connection behaviour.
    pub socket: SocketSettings,
    /// Chat endpoint and session defaults.
    pub chat: ChatSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

impl Default for SagittaSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            socket: SocketSettings::default(),
            chat: ChatSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

/// Reconnect and heartbeat tuning for the messaging client.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SocketSettings {
    /// Maximum consecutive automatic reconnect attempts.
    pub reconnect_attempts: u32,
    /// Delay before each reconnect attempt, in milliseconds.
    pub reconnect_interval_ms: u64,
    /// Ping cadence while connected, in milliseconds.
    pub heartbeat_interval_ms: u64,
    /// Sub-protocols offered during the handshake.
    pub protocols: Vec<String>,
}

impl Default for SocketSettings {
    fn default() -> Self {
        Self {
            reconnect_attempts: 5,
            reconnect_interval_ms: 3_000,
            heartbeat_interval_ms: 30_000,
            protocols: Vec::new(),
        }
    }
}

/// Chat endpoint settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatSettings {
    /// Base WebSocket URL; `/ws/query?token=…` is appended.
    pub base_ws_url: String,
    /// Session type sent with every query (`default`, `analyser`, `webAnalyser`).
    pub session_type: String,
    /// Assistant display name sent with every query.
    pub assistant_name: String,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            base_ws_url: "ws://127.0.0.1:8000".to_string(),
            session_type: "default".to_string(),
            assistant_name: "Sagittarius".to_string(),
        }
    }
}

/// Log output settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Compact,
        }
    }
}
