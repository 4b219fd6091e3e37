//! Canonical agent events.
//!
//! An [`AgentEvent`] is built by an adapter for one inbound protocol
//! notification, placed on the adapter's `updates` channel, and consumed
//! exactly once by the downstream sink. Events are never mutated after
//! they leave the adapter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::payload::{NormalizedPayload, ToolStatus};
use crate::models::permission::PermissionOption;

/// Discriminator for [`AgentEvent`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Streamed agent message text.
    MessageChunk,
    /// Streamed reasoning ("thought") text.
    Reasoning,
    /// First sighting of a tool call.
    ToolCall,
    /// Status, output or error change for a known tool call.
    ToolUpdate,
    /// Session lifecycle change (`new`, `resumed`).
    SessionStatus,
    /// Agent switched operating mode.
    SessionMode,
    /// Agent published or revised its plan.
    Plan,
    /// Agent advertised its slash commands.
    AvailableCommands,
    /// A prompt turn finished.
    Complete,
    /// In-band failure report.
    Error,
    /// Agent asks the user to approve an action.
    PermissionRequest,
    /// Token usage for the session's context window changed.
    ContextWindow,
}

/// Session lifecycle values carried by [`EventType::SessionStatus`] events.
pub const SESSION_STATUS_NEW: &str = "new";
/// Session lifecycle value for a resumed session.
pub const SESSION_STATUS_RESUMED: &str = "resumed";

/// One entry of an agent plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanEntry {
    /// Human-readable description of the step.
    pub content: String,
    /// `high`, `medium` or `low`.
    #[serde(default)]
    pub priority: String,
    /// `pending`, `in_progress` or `completed`.
    #[serde(default)]
    pub status: String,
}

/// A slash command the agent accepts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AvailableCommand {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Hint shown for the command's free-form input, when it takes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_hint: Option<String>,
}

/// One observable occurrence in an agent session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub session_id: String,
    /// Turn identifier, for protocols that expose one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_status: Option<ToolStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalized_payload: Option<NormalizedPayload>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plan_entries: Vec<PlanEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub available_commands: Vec<AvailableCommand>,
    /// Correlation id of a pending permission request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<PermissionOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_details: Option<Value>,
    /// Protocol-specific extras.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub data: Map<String, Value>,
    pub timestamp: DateTime<Utc>,
}

impl AgentEvent {
    /// Empty event of the given type for `session_id`.
    #[must_use]
    pub fn new(event_type: EventType, session_id: impl Into<String>) -> Self {
        Self {
            event_type,
            session_id: session_id.into(),
            operation_id: None,
            text: None,
            reasoning_text: None,
            tool_call_id: None,
            tool_name: None,
            tool_title: None,
            tool_status: None,
            normalized_payload: None,
            plan_entries: Vec::new(),
            available_commands: Vec::new(),
            pending_id: None,
            title: None,
            options: Vec::new(),
            action_type: None,
            action_details: None,
            data: Map::new(),
            timestamp: Utc::now(),
        }
    }

    /// Agent message text chunk.
    #[must_use]
    pub fn message_chunk(session_id: impl Into<String>, text: impl Into<String>) -> Self {
        let mut event = Self::new(EventType::MessageChunk, session_id);
        event.text = Some(text.into());
        event
    }

    /// Reasoning text chunk.
    #[must_use]
    pub fn reasoning(session_id: impl Into<String>, text: impl Into<String>) -> Self {
        let mut event = Self::new(EventType::Reasoning, session_id);
        event.reasoning_text = Some(text.into());
        event
    }

    /// Session lifecycle change; `status` is `new` or `resumed`.
    #[must_use]
    pub fn session_status(session_id: impl Into<String>, status: &str) -> Self {
        Self::new(EventType::SessionStatus, session_id).with_data("status", status)
    }

    /// End of a prompt turn.
    #[must_use]
    pub fn complete(session_id: impl Into<String>) -> Self {
        Self::new(EventType::Complete, session_id)
    }

    /// In-band error report.
    #[must_use]
    pub fn error(session_id: impl Into<String>, message: impl Into<String>) -> Self {
        let mut event = Self::new(EventType::Error, session_id);
        event.text = Some(message.into());
        event
    }

    /// Tool-call event (`tool_call` or `tool_update`) carrying `payload`.
    #[must_use]
    pub fn tool(
        event_type: EventType,
        session_id: impl Into<String>,
        tool_call_id: impl Into<String>,
        status: ToolStatus,
        payload: Option<NormalizedPayload>,
    ) -> Self {
        let mut event = Self::new(event_type, session_id);
        event.tool_call_id = Some(tool_call_id.into());
        event.tool_status = Some(status);
        event.normalized_payload = payload;
        event
    }

    /// Attach a protocol-specific extra under `key`.
    #[must_use]
    pub fn with_data(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.data.insert(key.to_owned(), value.into());
        self
    }

    /// Set the turn identifier.
    #[must_use]
    pub fn with_operation_id(mut self, operation_id: Option<String>) -> Self {
        self.operation_id = operation_id;
        self
    }
}
