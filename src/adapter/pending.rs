//! In-flight tool-call bookkeeping.

use std::collections::HashMap;

use serde_json::Value;

use crate::models::event::{AgentEvent, EventType};
use crate::models::payload::{NormalizedPayload, ToolStatus};
use crate::normalize::RawToolResult;

/// A tool call that has been announced but has not reached a terminal status.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingToolCall {
    pub tool_name: String,
    /// Protocol discriminator from the first sighting (ACP `kind`).
    pub kind: Option<String>,
    pub title: Option<String>,
    pub status: ToolStatus,
    /// Arguments the payload was last classified from.
    pub arguments: Option<Value>,
    /// Most recent non-empty result merged into the payload.
    pub last_result: Option<RawToolResult>,
    pub payload: NormalizedPayload,
}

impl PendingToolCall {
    /// Entry with no recorded kind, arguments or result.
    #[must_use]
    pub fn new(
        tool_name: impl Into<String>,
        title: Option<String>,
        status: ToolStatus,
        payload: NormalizedPayload,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            kind: None,
            title,
            status,
            arguments: None,
            last_result: None,
            payload,
        }
    }
}

/// Call id → in-flight payload, owned by exactly one adapter.
///
/// An id is inserted once on first sighting, updated in place by results,
/// and removed once: on a terminal status or at session teardown.
#[derive(Debug, Default)]
pub struct PendingToolCalls {
    calls: HashMap<String, PendingToolCall>,
}

impl PendingToolCalls {
    /// Empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `id` is in flight.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.calls.contains_key(id)
    }

    /// Record a new call. Returns `false` and leaves the existing entry
    /// untouched when `id` is already tracked.
    pub fn insert(&mut self, id: &str, call: PendingToolCall) -> bool {
        if self.calls.contains_key(id) {
            return false;
        }
        self.calls.insert(id.to_owned(), call);
        true
    }

    /// Mutable access for merging a result.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut PendingToolCall> {
        self.calls.get_mut(id)
    }

    /// Remove `id` after a terminal status.
    pub fn remove(&mut self, id: &str) -> Option<PendingToolCall> {
        self.calls.remove(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.calls.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Empty the table, producing a `tool_update(cancelled)` event for every
    /// call still in flight.
    pub fn cancel_all(&mut self, session_id: &str) -> Vec<AgentEvent> {
        let mut drained: Vec<(String, PendingToolCall)> = self.calls.drain().collect();
        drained.sort_by(|a, b| a.0.cmp(&b.0));
        drained
            .into_iter()
            .map(|(id, call)| {
                let mut event = AgentEvent::tool(
                    EventType::ToolUpdate,
                    session_id,
                    id,
                    ToolStatus::Cancelled,
                    Some(call.payload),
                );
                event.tool_name = Some(call.tool_name);
                event.tool_title = call.title;
                event
            })
            .collect()
    }
}
