//! Inbound frame parsing and topic routing.

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::DispatchMode;
use crate::registry::{DEFAULT_TOPIC, DispatchReport, SubscriptionRegistry};

/// Parse a text frame as JSON. Malformed frames are logged and dropped.
pub fn parse_frame(raw: &str) -> Option<Value> {
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(error = %err, len = raw.len(), "dropping malformed inbound frame");
            None
        }
    }
}

/// Deliver a parsed frame according to `mode`.
///
/// The whole frame always goes to [`DEFAULT_TOPIC`]. Under
/// [`DispatchMode::Typed`] a frame with a non-empty string `type` also has
/// its `payload` (or `null`) delivered to the topic of that name.
pub fn route(
    registry: &SubscriptionRegistry,
    mode: DispatchMode,
    message: &Value,
) -> DispatchReport {
    let mut report = registry.dispatch(DEFAULT_TOPIC, message);
    if mode == DispatchMode::Typed {
        if let Some(kind) = message
            .get("type")
            .and_then(Value::as_str)
            .filter(|k| !k.is_empty())
        {
            let payload = message.get("payload").unwrap_or(&Value::Null);
            let typed = registry.dispatch(kind, payload);
            report.delivered += typed.delivered;
            report.panicked += typed.panicked;
        }
    }
    if report.delivered + report.panicked == 0 {
        debug!("inbound frame had no subscribers");
    }
    report
}
