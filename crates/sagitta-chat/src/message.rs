//! Chat wire types.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which backend pipeline handles a session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionType {
    /// General chat.
    #[default]
    Default,
    /// Document analysis.
    Analyser,
    /// Web page analysis.
    WebAnalyser,
}

impl SessionType {
    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Analyser => "analyser",
            Self::WebAnalyser => "webAnalyser",
        }
    }

    /// Parse a wire name.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "default" => Some(Self::Default),
            "analyser" => Some(Self::Analyser),
            "webAnalyser" => Some(Self::WebAnalyser),
            _ => None,
        }
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flat query sent for every user message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatQuery {
    /// The user's text.
    pub query: String,
    /// Chat session id.
    pub session_id: String,
    /// Sending user.
    pub user_id: String,
    /// Pipeline selector.
    pub session_type: SessionType,
    /// Assistant persona name.
    pub name: String,
}

/// An assistant reply.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    /// Reply text.
    pub response: String,
    /// Session the reply belongs to.
    pub session_id: String,
    /// Pipeline that produced it, as sent by the server.
    pub session_type: String,
}

impl ChatReply {
    /// Extract a reply from an inbound frame.
    ///
    /// All three fields must be present, be strings, and be non-empty;
    /// anything else is not a reply.
    pub fn from_frame(frame: &Value) -> Option<Self> {
        let field = |name: &str| {
            frame
                .get(name)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
        };
        Some(Self {
            response: field("response")?,
            session_id: field("sessionId")?,
            session_type: field("sessionType")?,
        })
    }
}

/// Location of an uploaded file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Where the upload landed.
    pub url: String,
    /// Original file name.
    pub filename: String,
}

/// Payload of a `file_message` frame, sent after an upload completes.
///
/// Uses snake_case on the wire, unlike [`ChatQuery`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMessage {
    /// Human-readable summary shown in the transcript.
    pub content: String,
    /// Always `"user"` for client-originated uploads.
    pub sender: String,
    /// Chat session id.
    pub session_id: String,
    /// The uploaded file.
    pub file_info: FileInfo,
}

impl FileMessage {
    /// Frame type used with `send`.
    pub const TYPE: &'static str = "file_message";

    /// Announcement for a file the user uploaded.
    pub fn uploaded(session_id: &str, url: &str, filename: &str) -> Self {
        Self {
            content: format!("File uploaded: {filename}"),
            sender: "user".to_owned(),
            session_id: session_id.to_owned(),
            file_info: FileInfo {
                url: url.to_owned(),
                filename: filename.to_owned(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn query_serializes_camel_case() {
        let q = ChatQuery {
            query: "hi".into(),
            session_id: "s1".into(),
            user_id: "u1".into(),
            session_type: SessionType::WebAnalyser,
            name: "Sagittarius".into(),
        };
        assert_eq!(
            serde_json::to_value(&q).unwrap(),
            json!({
                "query": "hi",
                "sessionId": "s1",
                "userId": "u1",
                "sessionType": "webAnalyser",
                "name": "Sagittarius",
            })
        );
    }

    #[test]
    fn session_type_names() {
        for t in [SessionType::Default, SessionType::Analyser, SessionType::WebAnalyser] {
            assert_eq!(SessionType::parse(t.as_str()), Some(t));
            assert_eq!(serde_json::to_value(t).unwrap(), json!(t.to_string()));
        }
        assert_eq!(SessionType::parse("bogus"), None);
    }

    #[test]
    fn reply_requires_all_fields() {
        let full = json!({"response": "r", "sessionId": "s", "sessionType": "default"});
        assert_eq!(
            ChatReply::from_frame(&full),
            Some(ChatReply {
                response: "r".into(),
                session_id: "s".into(),
                session_type: "default".into(),
            })
        );
        assert_eq!(ChatReply::from_frame(&json!({"response": "r", "sessionId": "s"})), None);
        assert_eq!(
            ChatReply::from_frame(&json!({"response": "", "sessionId": "s", "sessionType": "x"})),
            None
        );
        assert_eq!(
            ChatReply::from_frame(&json!({"response": 1, "sessionId": "s", "sessionType": "x"})),
            None
        );
        assert_eq!(ChatReply::from_frame(&json!({"type": "pong"})), None);
    }

    #[test]
    fn file_message_wire_shape() {
        let msg = FileMessage::uploaded("s1", "https://cdn/x.pdf", "x.pdf");
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "content": "File uploaded: x.pdf",
                "sender": "user",
                "session_id": "s1",
                "file_info": {"url": "https://cdn/x.pdf", "filename": "x.pdf"},
            })
        );
    }
}
