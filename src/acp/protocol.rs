//! Agent Client Protocol wire types.
//!
//! Only the fields this crate reads or writes are modelled; everything else
//! is ignored on input so newer agents keep working.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::adapter::McpServerConfig;
use crate::models::event::{AvailableCommand, PlanEntry};
use crate::models::permission::{PermissionOption, PermissionResponse};

/// JSON-RPC protocol marker carried by every message.
pub const JSONRPC_VERSION: &str = "2.0";
/// JSON-RPC error code for an unknown method.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// JSON-RPC error code for malformed parameters.
pub const INVALID_PARAMS: i64 = -32602;
/// JSON-RPC error code for a handler failure.
pub const INTERNAL_ERROR: i64 = -32603;

pub const METHOD_INITIALIZE: &str = "initialize";
pub const METHOD_SESSION_NEW: &str = "session/new";
pub const METHOD_SESSION_LOAD: &str = "session/load";
pub const METHOD_SESSION_PROMPT: &str = "session/prompt";
pub const METHOD_SESSION_CANCEL: &str = "session/cancel";
pub const METHOD_SESSION_UPDATE: &str = "session/update";
pub const METHOD_REQUEST_PERMISSION: &str = "session/request_permission";

// ── JSON-RPC framing ─────────────────────────────────────────────────────────

/// Error object of a JSON-RPC response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    #[must_use]
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    #[must_use]
    pub fn method_not_found(method: &str) -> Self {
        Self::new(METHOD_NOT_FOUND, format!("method not found: {method}"))
    }
}

/// One decoded inbound JSON-RPC message.
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    /// Answer to a request this side sent.
    Response {
        id: u64,
        result: std::result::Result<Value, RpcError>,
    },
    /// Agent → client request expecting an answer.
    Request {
        id: Value,
        method: String,
        params: Value,
    },
    /// Fire-and-forget agent → client message.
    Notification { method: String, params: Value },
}

impl Incoming {
    /// Classify a raw JSON value. Returns `None` for anything that is not a
    /// recognisable JSON-RPC message, including responses to ids this side
    /// never issues.
    #[must_use]
    pub fn classify(mut value: Value) -> Option<Self> {
        let obj = value.as_object_mut()?;
        let params = obj.remove("params").unwrap_or(Value::Null);
        let method = match obj.remove("method") {
            Some(Value::String(method)) => Some(method),
            _ => None,
        };

        match (obj.remove("id"), method) {
            (None | Some(Value::Null), Some(method)) => {
                Some(Self::Notification { method, params })
            }
            (Some(id), Some(method)) => Some(Self::Request { id, method, params }),
            (Some(id), None) => {
                let id = id.as_u64()?;
                let result = match obj.remove("error") {
                    Some(error) => Err(serde_json::from_value(error).unwrap_or_else(|_| {
                        RpcError::new(INTERNAL_ERROR, "unparseable error object")
                    })),
                    None => Ok(obj.remove("result").unwrap_or(Value::Null)),
                };
                Some(Self::Response { id, result })
            }
            (None, None) => None,
        }
    }
}

/// Outbound request envelope.
#[must_use]
pub fn request_message(id: u64, method: &str, params: Value) -> Value {
    json!({ "jsonrpc": JSONRPC_VERSION, "id": id, "method": method, "params": params })
}

/// Outbound notification envelope.
#[must_use]
pub fn notification_message(method: &str, params: Value) -> Value {
    json!({ "jsonrpc": JSONRPC_VERSION, "method": method, "params": params })
}

/// Outbound response envelope for an agent request.
#[must_use]
pub fn response_message(id: Value, result: std::result::Result<Value, RpcError>) -> Value {
    match result {
        Ok(result) => json!({ "jsonrpc": JSONRPC_VERSION, "id": id, "result": result }),
        Err(error) => json!({ "jsonrpc": JSONRPC_VERSION, "id": id, "error": error }),
    }
}

// ── initialize ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Implementation {
    pub name: String,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSystemCapability {
    pub read_text_file: bool,
    pub write_text_file: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientCapabilities {
    pub fs: FileSystemCapability,
    pub terminal: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    pub protocol_version: u16,
    pub client_capabilities: ClientCapabilities,
    pub client_info: Implementation,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PromptCapabilities {
    pub image: bool,
    pub audio: bool,
    pub embedded_context: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentCapabilitiesWire {
    pub load_session: bool,
    pub prompt_capabilities: PromptCapabilities,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: u16,
    #[serde(default)]
    pub agent_capabilities: AgentCapabilitiesWire,
    #[serde(default)]
    pub agent_info: Option<Implementation>,
}

// ── sessions ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct EnvVariable {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct McpServerWire {
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    pub env: Vec<EnvVariable>,
}

impl From<&McpServerConfig> for McpServerWire {
    fn from(server: &McpServerConfig) -> Self {
        let mut env: Vec<EnvVariable> = server
            .env
            .iter()
            .map(|(name, value)| EnvVariable {
                name: name.clone(),
                value: value.clone(),
            })
            .collect();
        env.sort_by(|a, b| a.name.cmp(&b.name));
        Self {
            name: server.name.clone(),
            command: server.command.clone(),
            args: server.args.clone(),
            env,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSessionParams {
    pub cwd: String,
    pub mcp_servers: Vec<McpServerWire>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadSessionParams {
    pub session_id: String,
    pub cwd: String,
    pub mcp_servers: Vec<McpServerWire>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionModeState {
    pub current_mode_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSessionResult {
    pub session_id: String,
    #[serde(default)]
    pub modes: Option<SessionModeState>,
}

// ── prompt ───────────────────────────────────────────────────────────────────

/// Prompt content block.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptParams {
    pub session_id: String,
    pub prompt: Vec<ContentBlock>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptResult {
    #[serde(default = "default_stop_reason")]
    pub stop_reason: String,
}

fn default_stop_reason() -> String {
    "end_turn".to_owned()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelParams {
    pub session_id: String,
}

// ── session/update ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionNotification {
    pub session_id: String,
    pub update: SessionUpdate,
}

/// `session/update` payload, tagged by `sessionUpdate`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "sessionUpdate", rename_all = "snake_case")]
pub enum SessionUpdate {
    AgentMessageChunk {
        content: Value,
    },
    AgentThoughtChunk {
        content: Value,
    },
    UserMessageChunk {
        #[serde(default)]
        content: Value,
    },
    ToolCall(ToolCallFields),
    ToolCallUpdate(ToolCallFields),
    Plan {
        #[serde(default)]
        entries: Vec<PlanEntryWire>,
    },
    AvailableCommandsUpdate {
        #[serde(default, rename = "availableCommands")]
        available_commands: Vec<AvailableCommandWire>,
    },
    CurrentModeUpdate {
        #[serde(rename = "currentModeId")]
        current_mode_id: String,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ToolCallLocation {
    pub path: String,
    #[serde(default)]
    pub line: Option<u32>,
}

/// Fields shared by `tool_call`, `tool_call_update` and the `toolCall` of a
/// permission request. Everything but the id is optional on updates.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallFields {
    pub tool_call_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub raw_input: Option<Value>,
    #[serde(default)]
    pub raw_output: Option<Value>,
    #[serde(default)]
    pub content: Option<Vec<Value>>,
    #[serde(default)]
    pub locations: Option<Vec<ToolCallLocation>>,
    #[serde(default, rename = "_meta")]
    pub meta: Option<Value>,
}

impl ToolCallFields {
    /// Vendor tool name: `_meta.claudeCode.toolName`, then the title.
    #[must_use]
    pub fn tool_name(&self) -> Option<&str> {
        self.meta
            .as_ref()
            .and_then(|meta| meta.pointer("/claudeCode/toolName"))
            .and_then(Value::as_str)
            .or(self.title.as_deref())
            .filter(|name| !name.is_empty())
    }

    /// First reported file location.
    #[must_use]
    pub fn first_location(&self) -> Option<&str> {
        self.locations
            .as_ref()
            .and_then(|locs| locs.first())
            .map(|loc| loc.path.as_str())
    }

    /// Tool arguments, when the agent sent a non-empty object.
    #[must_use]
    pub fn arguments(&self) -> Option<&Value> {
        self.raw_input
            .as_ref()
            .filter(|input| input.as_object().is_some_and(|obj| !obj.is_empty()))
    }

    /// Concatenated text of `content` blocks (`{type:"content", content:{type:"text"}}`).
    #[must_use]
    pub fn content_text(&self) -> Option<String> {
        let blocks = self.content.as_ref()?;
        let parts: Vec<&str> = blocks
            .iter()
            .filter_map(|block| match block.get("type").and_then(Value::as_str) {
                Some("content") => block.get("content").and_then(text_of_block),
                _ => None,
            })
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n"))
        }
    }

    /// The first `diff` content block as `(path, old_text, new_text)`.
    #[must_use]
    pub fn content_diff(&self) -> Option<(String, String, String)> {
        self.content.as_ref()?.iter().find_map(|block| {
            if block.get("type").and_then(Value::as_str) != Some("diff") {
                return None;
            }
            let field = |key: &str| {
                block
                    .get(key)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_owned()
            };
            Some((field("path"), field("oldText"), field("newText")))
        })
    }
}

/// Text of a single content block of type `text`.
#[must_use]
pub fn text_of_block(block: &Value) -> Option<&str> {
    match block.get("type").and_then(Value::as_str) {
        Some("text") => block.get("text").and_then(Value::as_str),
        _ => None,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlanEntryWire {
    pub content: String,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl From<PlanEntryWire> for PlanEntry {
    fn from(entry: PlanEntryWire) -> Self {
        Self {
            content: entry.content,
            priority: entry.priority.unwrap_or_default(),
            status: entry.status.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AvailableCommandWire {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub input: Option<Value>,
}

impl From<AvailableCommandWire> for AvailableCommand {
    fn from(command: AvailableCommandWire) -> Self {
        let input_hint = command
            .input
            .as_ref()
            .and_then(|input| input.get("hint"))
            .and_then(Value::as_str)
            .map(str::to_owned);
        Self {
            name: command.name,
            description: command.description.unwrap_or_default(),
            input_hint,
        }
    }
}

// ── session/request_permission ───────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionOptionWire {
    pub option_id: String,
    pub name: String,
    #[serde(default)]
    pub kind: String,
}

impl From<PermissionOptionWire> for PermissionOption {
    fn from(option: PermissionOptionWire) -> Self {
        Self::new(&option.option_id, &option.name, &option.kind)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPermissionParams {
    pub session_id: String,
    pub tool_call: ToolCallFields,
    #[serde(default)]
    pub options: Vec<PermissionOptionWire>,
}

/// `session/request_permission` result body for `response`.
#[must_use]
pub fn permission_outcome(response: &PermissionResponse) -> Value {
    if response.cancelled || response.option_id.is_empty() {
        json!({ "outcome": { "outcome": "cancelled" } })
    } else {
        json!({ "outcome": { "outcome": "selected", "optionId": response.option_id } })
    }
}
