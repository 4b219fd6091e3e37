//! OpenCode server event envelopes.
//!
//! Every SSE frame on `/event` carries `{ "type": …, "properties": … }`.
//! [`OpenCodeEvent::parse`] turns the envelope into a typed variant; event
//! types this crate does not consume become [`OpenCodeEvent::Other`].

use serde::Deserialize;
use serde_json::Value;

use crate::Result;

/// Raw `{type, properties}` envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub properties: Value,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CacheTokens {
    pub read: u64,
    pub write: u64,
}

/// Token usage of one assistant message.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TokenUsage {
    pub input: u64,
    pub output: u64,
    pub reasoning: u64,
    pub cache: CacheTokens,
}

impl TokenUsage {
    /// Tokens the message occupies in the context window.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.input + self.output + self.reasoning + self.cache.read + self.cache.write
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageInfo {
    pub id: String,
    #[serde(rename = "sessionID", default)]
    pub session_id: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub tokens: Option<TokenUsage>,
}

/// `state` of a tool part.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ToolState {
    pub status: String,
    pub input: Option<Value>,
    pub output: Option<Value>,
    pub error: Option<String>,
    pub title: Option<String>,
    pub metadata: Option<Value>,
}

/// A message part: text, reasoning, tool, or one of several kinds this
/// crate skips.
#[derive(Debug, Clone, Deserialize)]
pub struct Part {
    pub id: String,
    #[serde(rename = "sessionID", default)]
    pub session_id: String,
    #[serde(rename = "messageID", default)]
    pub message_id: String,
    #[serde(rename = "type")]
    pub part_type: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(rename = "callID", default)]
    pub call_id: Option<String>,
    #[serde(default)]
    pub tool: Option<String>,
    #[serde(default)]
    pub state: Option<ToolState>,
}

/// Provider error attached to `session.error`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionErrorInfo {
    /// Error class, e.g. `ProviderAuthError`.
    pub name: String,
    pub message: String,
}

impl SessionErrorInfo {
    fn from_value(error: &Value) -> Self {
        let name = error
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("UnknownError")
            .to_owned();
        let message = error
            .pointer("/data/message")
            .or_else(|| error.get("message"))
            .and_then(Value::as_str)
            .map_or_else(|| name.clone(), str::to_owned);
        Self { name, message }
    }

    /// The provider rejected the configured credentials.
    #[must_use]
    pub fn is_auth_error(&self) -> bool {
        self.name == "ProviderAuthError"
    }

    /// The turn was aborted on request.
    #[must_use]
    pub fn is_abort(&self) -> bool {
        self.name == "MessageAbortedError"
    }
}

/// A permission the agent is waiting on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PermissionInfo {
    pub id: String,
    pub session_id: String,
    /// Permission category (`bash`, `edit`, `webfetch`, …).
    pub permission: String,
    pub title: Option<String>,
    pub call_id: Option<String>,
    pub patterns: Vec<String>,
    pub metadata: Value,
}

impl PermissionInfo {
    /// Accepts both the `permission.updated` and `permission.asked` shapes.
    fn from_value(props: &Value) -> Option<Self> {
        let str_at = |pointer: &str| {
            props
                .pointer(pointer)
                .and_then(Value::as_str)
                .map(str::to_owned)
        };

        let patterns = match props.get("patterns").or_else(|| props.get("pattern")) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect(),
            Some(Value::String(pattern)) => vec![pattern.clone()],
            _ => Vec::new(),
        };

        Some(Self {
            id: str_at("/id")?,
            session_id: str_at("/sessionID").unwrap_or_default(),
            permission: str_at("/permission")
                .or_else(|| str_at("/type"))
                .unwrap_or_else(|| String::from("other")),
            title: str_at("/title"),
            call_id: str_at("/callID").or_else(|| str_at("/tool/callID")),
            patterns,
            metadata: props.get("metadata").cloned().unwrap_or(Value::Null),
        })
    }
}

/// Typed OpenCode event.
#[derive(Debug, Clone)]
pub enum OpenCodeEvent {
    MessageUpdated(MessageInfo),
    PartUpdated {
        part: Part,
        delta: Option<String>,
    },
    SessionIdle {
        session_id: String,
    },
    /// `session.status` with a non-idle status (`busy`, `retry`).
    SessionBusy {
        session_id: String,
    },
    SessionError {
        session_id: Option<String>,
        error: SessionErrorInfo,
    },
    PermissionAsked(PermissionInfo),
    Other(String),
}

impl OpenCodeEvent {
    /// Decode one envelope.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Json`](crate::AppError::Json) when a consumed
    /// event type has malformed properties.
    pub fn parse(envelope: Envelope) -> Result<Self> {
        let props = envelope.properties;
        let event = match envelope.event_type.as_str() {
            "message.updated" => {
                let info = props.get("info").cloned().unwrap_or(Value::Null);
                Self::MessageUpdated(serde_json::from_value(info)?)
            }
            "message.part.updated" => {
                let delta = props
                    .get("delta")
                    .and_then(Value::as_str)
                    .map(str::to_owned);
                let part = props.get("part").cloned().unwrap_or(Value::Null);
                Self::PartUpdated {
                    part: serde_json::from_value(part)?,
                    delta,
                }
            }
            "session.idle" => Self::SessionIdle {
                session_id: session_of(&props).unwrap_or_default(),
            },
            "session.status" => {
                let status = props
                    .pointer("/status/type")
                    .or_else(|| props.get("status"))
                    .and_then(Value::as_str);
                let session_id = session_of(&props).unwrap_or_default();
                match status {
                    Some("idle") => Self::SessionIdle { session_id },
                    Some(_) => Self::SessionBusy { session_id },
                    None => Self::Other(envelope.event_type),
                }
            }
            "session.error" => Self::SessionError {
                session_id: session_of(&props),
                error: props
                    .get("error")
                    .map(SessionErrorInfo::from_value)
                    .unwrap_or_default(),
            },
            "permission.asked" | "permission.updated" => {
                match PermissionInfo::from_value(&props) {
                    Some(info) => Self::PermissionAsked(info),
                    None => Self::Other(envelope.event_type),
                }
            }
            _ => Self::Other(envelope.event_type),
        };
        Ok(event)
    }

    /// Session the event belongs to, when it names one.
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        let id = match self {
            Self::MessageUpdated(info) => info.session_id.as_str(),
            Self::PartUpdated { part, .. } => part.session_id.as_str(),
            Self::SessionIdle { session_id } | Self::SessionBusy { session_id } => {
                session_id.as_str()
            }
            Self::SessionError { session_id, .. } => session_id.as_deref()?,
            Self::PermissionAsked(info) => info.session_id.as_str(),
            Self::Other(_) => return None,
        };
        (!id.is_empty()).then_some(id)
    }
}

fn session_of(props: &Value) -> Option<String> {
    props
        .get("sessionID")
        .and_then(Value::as_str)
        .map(str::to_owned)
}
