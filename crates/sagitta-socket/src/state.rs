//! Connection lifecycle states.

use std::fmt;

use serde::Serialize;

/// Lifecycle state of the client's current connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    /// No connection attempt has been made yet.
    Uninstantiated,
    /// A connection attempt is in flight.
    Connecting,
    /// Connected; heartbeat running, sends permitted.
    Open,
    /// Explicit teardown is closing the live connection.
    Closing,
    /// Dropped, failed, or torn down.
    Closed,
}

impl ConnectionState {
    /// Whether frames may be sent.
    pub fn is_open(self) -> bool {
        self == Self::Open
    }

    /// Wire-style name (`"OPEN"`, `"CLOSED"`, …).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uninstantiated => "UNINSTANTIATED",
            Self::Connecting => "CONNECTING",
            Self::Open => "OPEN",
            Self::Closing => "CLOSING",
            Self::Closed => "CLOSED",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_open_is_open() {
        assert!(ConnectionState::Open.is_open());
        for state in [
            ConnectionState::Uninstantiated,
            ConnectionState::Connecting,
            ConnectionState::Closing,
            ConnectionState::Closed,
        ] {
            assert!(!state.is_open(), "{state} should not be open");
        }
    }

    #[test]
    fn display_matches_serde() {
        let json = serde_json::to_string(&ConnectionState::Uninstantiated).unwrap();
        assert_eq!(json, format!("\"{}\"", ConnectionState::Uninstantiated));
    }
}
