//! User-facing connection notice.

use std::fmt;

use sagitta_socket::{ConnectionState, MessagingClient};

/// What to show the user about the connection. Absent while open.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionBanner {
    /// First connection attempt in flight.
    Connecting,
    /// Connection lost; retrying.
    Reconnecting {
        /// Reconnect attempts made so far.
        attempt: u32,
    },
    /// Retries exhausted, or torn down.
    Disconnected,
}

impl ConnectionBanner {
    /// Derive the banner from raw client observations.
    pub fn derive(state: ConnectionState, attempts: u32, exhausted: bool) -> Option<Self> {
        match state {
            ConnectionState::Open => None,
            _ if exhausted => Some(Self::Disconnected),
            ConnectionState::Uninstantiated => Some(Self::Connecting),
            ConnectionState::Connecting if attempts == 0 => Some(Self::Connecting),
            ConnectionState::Connecting | ConnectionState::Closed => {
                Some(Self::Reconnecting { attempt: attempts })
            }
            ConnectionState::Closing => Some(Self::Disconnected),
        }
    }

    /// Banner for `client` right now.
    pub fn for_client(client: &MessagingClient) -> Option<Self> {
        Self::derive(
            client.state(),
            client.reconnect_attempts(),
            client.reconnect_exhausted(),
        )
    }
}

impl fmt::Display for ConnectionBanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => f.write_str("Connecting to chat..."),
            Self::Reconnecting { attempt: 0 } => f.write_str("Connection lost, reconnecting..."),
            Self::Reconnecting { attempt } => {
                write!(f, "Connection lost, reconnecting (attempt {attempt})...")
            }
            Self::Disconnected => f.write_str("Disconnected from chat"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_has_no_banner() {
        assert_eq!(ConnectionBanner::derive(ConnectionState::Open, 0, false), None);
        assert_eq!(ConnectionBanner::derive(ConnectionState::Open, 2, false), None);
    }

    #[test]
    fn first_attempt_is_connecting() {
        assert_eq!(
            ConnectionBanner::derive(ConnectionState::Uninstantiated, 0, false),
            Some(ConnectionBanner::Connecting)
        );
        assert_eq!(
            ConnectionBanner::derive(ConnectionState::Connecting, 0, false),
            Some(ConnectionBanner::Connecting)
        );
    }

    #[test]
    fn retries_are_reconnecting() {
        assert_eq!(
            ConnectionBanner::derive(ConnectionState::Connecting, 2, false),
            Some(ConnectionBanner::Reconnecting { attempt: 2 })
        );
        assert_eq!(
            ConnectionBanner::derive(ConnectionState::Closed, 1, false),
            Some(ConnectionBanner::Reconnecting { attempt: 1 })
        );
    }

    #[test]
    fn exhausted_is_disconnected() {
        assert_eq!(
            ConnectionBanner::derive(ConnectionState::Closed, 5, true),
            Some(ConnectionBanner::Disconnected)
        );
        assert_eq!(
            ConnectionBanner::derive(ConnectionState::Closing, 0, false),
            Some(ConnectionBanner::Disconnected)
        );
    }

    #[test]
    fn display_text() {
        assert_eq!(
            ConnectionBanner::Reconnecting { attempt: 3 }.to_string(),
            "Connection lost, reconnecting (attempt 3)..."
        );
        assert_eq!(ConnectionBanner::Disconnected.to_string(), "Disconnected from chat");
    }
}
