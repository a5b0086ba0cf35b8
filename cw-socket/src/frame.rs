//! Wire frames and the JSON codec.
//!
//! Frames are JSON objects discriminated by their `type` field. Decoding
//! never fails loudly: unknown kinds and malformed payloads are logged and
//! dropped so a misbehaving backend cannot take the session down.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use cw_core::constants::text::SOURCE_TITLE_PREFIX;
use cw_core::error::CwResult;

/// All frame kinds understood by the widget protocol.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// User text sent to the backend (`client.message`).
    ClientMessage,
    /// A reply from the backend (`server.message`).
    ServerMessage,
    /// Backend typing indicator (`server.typing`).
    ServerTyping,
    /// The backend failed to answer the last exchange (`server.error`).
    ServerError,
    /// Idle or timeout notice from the backend (`server.warning`).
    ServerWarning,
    /// Keep-alive sent by the client (`ping`).
    Ping,
    /// Keep-alive answer (`pong`).
    Pong,
    /// Unknown/unhandled frame type.
    Unknown(String),
}

impl FrameKind {
    /// Parse a `type` string from the wire.
    pub fn from_str(s: &str) -> Self {
        match s {
            "client.message" => Self::ClientMessage,
            "server.message" => Self::ServerMessage,
            "server.typing" => Self::ServerTyping,
            "server.error" => Self::ServerError,
            "server.warning" => Self::ServerWarning,
            "ping" => Self::Ping,
            "pong" => Self::Pong,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Convert to the wire `type` string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::ClientMessage => "client.message",
            Self::ServerMessage => "server.message",
            Self::ServerTyping => "server.typing",
            Self::ServerError => "server.error",
            Self::ServerWarning => "server.warning",
            Self::Ping => "ping",
            Self::Pong => "pong",
            Self::Unknown(s) => s.as_str(),
        }
    }

    /// Whether this kind originates from the backend.
    pub fn is_server_kind(&self) -> bool {
        matches!(
            self,
            Self::ServerMessage | Self::ServerTyping | Self::ServerError | Self::ServerWarning | Self::Pong
        )
    }
}

/// One protocol frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Frame {
    #[serde(rename = "client.message")]
    ClientMessage { text: String },

    #[serde(rename = "server.message")]
    ServerMessage(ServerMessage),

    #[serde(rename = "server.typing")]
    ServerTyping {
        #[serde(rename = "isTyping", alias = "is_typing", default, deserialize_with = "typing_flag")]
        is_typing: bool,
    },

    #[serde(rename = "server.error")]
    ServerError {
        #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "loose_text")]
        message: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "loose_text")]
        code: Option<String>,
    },

    #[serde(rename = "server.warning")]
    ServerWarning {
        #[serde(default, deserialize_with = "loose_string")]
        message: String,
    },

    #[serde(rename = "ping")]
    Ping { timestamp: i64 },

    #[serde(rename = "pong")]
    Pong {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<Value>,
    },
}

/// A backend reply, normalized from its wire form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawServerMessage")]
pub struct ServerMessage {
    /// Reply text (`message`, falling back to `text`, then empty).
    pub message: String,
    /// Backend timestamp as sent, stringified when numeric.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Documents the reply was grounded on.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<Source>,
}

/// A reference attached to a reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    #[serde(default, alias = "source", skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, alias = "name", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Source {
    /// Title to display for the source at `index` (0-based) in its list.
    pub fn display_title(&self, index: usize) -> String {
        match self.title.as_deref().filter(|t| !t.is_empty()) {
            Some(title) => title.to_string(),
            None => format!("{SOURCE_TITLE_PREFIX} {}", index + 1),
        }
    }
}

#[derive(Deserialize)]
struct RawServerMessage {
    #[serde(default, deserialize_with = "loose_text")]
    message: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    text: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    timestamp: Option<String>,
    #[serde(default)]
    sources: Option<Value>,
}

/// Text form of an optional scalar: strings as-is, null as absent, anything
/// else as its JSON rendering.
fn text_of(value: Option<Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Null) | None => None,
        Some(other) => Some(other.to_string()),
    }
}

fn loose_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Option::<Value>::deserialize(deserializer).map(text_of)
}

fn loose_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    loose_text(deserializer).map(Option::unwrap_or_default)
}

/// A typing flag; null counts as not typing.
fn typing_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Bool(flag)) => Ok(flag),
        Some(Value::Null) | None => Ok(false),
        Some(other) => Err(serde::de::Error::custom(format!(
            "typing flag must be a boolean, got {other}"
        ))),
    }
}

impl From<RawServerMessage> for ServerMessage {
    fn from(raw: RawServerMessage) -> Self {
        let message = raw
            .message
            .filter(|m| !m.is_empty())
            .or(raw.text)
            .unwrap_or_default();

        let sources = match raw.sources {
            Some(Value::Array(items)) => items,
            Some(Value::Null) | None => Vec::new(),
            Some(other) => {
                debug!("ignoring non-list sources: {other}");
                Vec::new()
            }
        };
        let sources = sources
            .into_iter()
            .filter_map(|v| match serde_json::from_value::<Source>(v) {
                Ok(source) => Some(source),
                Err(e) => {
                    debug!("skipping malformed source: {e}");
                    None
                }
            })
            .collect();

        Self {
            message,
            timestamp: raw.timestamp,
            sources,
        }
    }
}

impl Frame {
    /// A `client.message` frame. Text is carried verbatim.
    pub fn client_message(text: impl Into<String>) -> Self {
        Self::ClientMessage { text: text.into() }
    }

    /// A `ping` stamped with the current time in milliseconds.
    pub fn ping_now() -> Self {
        Self::Ping {
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// The kind of this frame.
    pub fn kind(&self) -> FrameKind {
        match self {
            Self::ClientMessage { .. } => FrameKind::ClientMessage,
            Self::ServerMessage(_) => FrameKind::ServerMessage,
            Self::ServerTyping { .. } => FrameKind::ServerTyping,
            Self::ServerError { .. } => FrameKind::ServerError,
            Self::ServerWarning { .. } => FrameKind::ServerWarning,
            Self::Ping { .. } => FrameKind::Ping,
            Self::Pong { .. } => FrameKind::Pong,
        }
    }

    /// Serialize to the wire form.
    pub fn encode(&self) -> CwResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a wire frame.
    ///
    /// Returns `None` (after logging) for invalid JSON, a missing or unknown
    /// `type`, or a payload that does not fit its kind.
    pub fn decode(raw: &str) -> Option<Frame> {
        let value: Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(e) => {
                warn!("dropping malformed frame: {e}");
                return None;
            }
        };

        let kind = FrameKind::from_str(value.get("type").and_then(Value::as_str).unwrap_or_default());
        if let FrameKind::Unknown(name) = &kind {
            warn!("dropping frame of unknown type {name:?}");
            return None;
        }

        match serde_json::from_value::<Frame>(value) {
            Ok(frame) => Some(frame),
            Err(e) => {
                warn!("dropping invalid {} frame: {e}", kind.as_str());
                None
            }
        }
    }
}
