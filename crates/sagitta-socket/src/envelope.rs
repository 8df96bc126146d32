//! Outbound frame encoding.
//!
//! Two shapes go over the wire: the typed envelope `{"type": T, "payload": P}`
//! produced by `send`, and a caller-supplied flat object produced by `query`.
//! Heartbeats are the envelope-less `{"type":"ping"}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SocketError;

/// Heartbeat frame, sent verbatim.
pub const PING_FRAME: &str = r#"{"type":"ping"}"#;

/// Typed message envelope.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Message type; also the routing topic under typed dispatch.
    #[serde(rename = "type")]
    pub kind: String,
    /// Arbitrary JSON body.
    #[serde(default)]
    pub payload: Value,
}

impl Envelope {
    /// Build an envelope from any serializable payload.
    pub fn new<T: Serialize + ?Sized>(kind: &str, payload: &T) -> Result<Self, SocketError> {
        Ok(Self {
            kind: kind.to_owned(),
            payload: serde_json::to_value(payload)?,
        })
    }

    /// Serialize to a text frame.
    pub fn encode(&self) -> Result<String, SocketError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Serialize a flat query object. Non-object values are rejected.
pub fn encode_query<T: Serialize + ?Sized>(message: &T) -> Result<String, SocketError> {
    let value = serde_json::to_value(message)?;
    if !value.is_object() {
        return Err(SocketError::Encode(format!(
            "query must be a JSON object, got {}",
            json_kind(&value)
        )));
    }
    Ok(value.to_string())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
