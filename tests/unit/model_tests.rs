//! Unit tests for the canonical event and payload model.

use serde_json::{json, Value};

use agent_switchboard::adapter::compose_prompt;
use agent_switchboard::models::event::{AgentEvent, EventType, SESSION_STATUS_NEW};
use agent_switchboard::models::payload::{
    NormalizedPayload, ShellExecPayload, ShellOutput, ToolStatus,
};

// ── AgentEvent ───────────────────────────────────────────────────────────────

/// Serialized events use a `type` discriminator and omit unset fields.
#[test]
fn message_chunk_serializes_compactly() {
    let event = AgentEvent::message_chunk("ses_1", "hello");

    let value = serde_json::to_value(&event).expect("serialize");

    assert_eq!(value["type"], "message_chunk");
    assert_eq!(value["session_id"], "ses_1");
    assert_eq!(value["text"], "hello");
    assert!(value.get("tool_call_id").is_none());
    assert!(value.get("plan_entries").is_none());
    assert!(value.get("data").is_none());
    assert!(value.get("timestamp").is_some());
}

#[test]
fn session_status_carries_status_in_data() {
    let event = AgentEvent::session_status("ses_1", SESSION_STATUS_NEW);

    assert_eq!(event.event_type, EventType::SessionStatus);
    assert_eq!(event.data.get("status"), Some(&Value::from("new")));
}

#[test]
fn tool_event_fields_and_operation_id() {
    let event = AgentEvent::tool(
        EventType::ToolCall,
        "ses_1",
        "call_1",
        ToolStatus::PendingPermission,
        Some(NormalizedPayload::generic("mystery", json!({ "a": 1 }))),
    )
    .with_operation_id(Some("msg_1".into()));

    let value = serde_json::to_value(&event).expect("serialize");

    assert_eq!(value["type"], "tool_call");
    assert_eq!(value["tool_call_id"], "call_1");
    assert_eq!(value["tool_status"], "pending_permission");
    assert_eq!(value["operation_id"], "msg_1");
    assert_eq!(value["normalized_payload"]["kind"], "generic");
    assert_eq!(value["normalized_payload"]["name"], "mystery");
}

#[test]
fn event_round_trips_through_json() {
    let event = AgentEvent::error("ses_1", "boom").with_data("code", 42);

    let text = serde_json::to_string(&event).expect("serialize");
    let back: AgentEvent = serde_json::from_str(&text).expect("deserialize");

    assert_eq!(back, event);
}

// ── NormalizedPayload ────────────────────────────────────────────────────────

#[test]
fn payload_kind_matches_serialized_tag() {
    let payload = NormalizedPayload::ShellExec(ShellExecPayload {
        command: "ls".into(),
        output: Some(ShellOutput {
            stdout: "a".into(),
            stderr: String::new(),
            exit_code: Some(0),
        }),
        ..Default::default()
    });

    let value = serde_json::to_value(&payload).expect("serialize");

    assert_eq!(value["kind"], payload.kind());
    assert_eq!(value["kind"], "shell_exec");
    assert_eq!(value["output"]["exit_code"], 0);
    assert!(value.get("work_dir").is_none());
}

#[test]
fn terminal_statuses() {
    assert!(ToolStatus::Complete.is_terminal());
    assert!(ToolStatus::Error.is_terminal());
    assert!(ToolStatus::Cancelled.is_terminal());
    assert!(!ToolStatus::Pending.is_terminal());
    assert!(!ToolStatus::PendingPermission.is_terminal());
    assert!(!ToolStatus::Running.is_terminal());
    assert_eq!(ToolStatus::PendingPermission.as_str(), "pending_permission");
}

// ── Prompt composition ───────────────────────────────────────────────────────

#[test]
fn pending_context_is_prepended() {
    assert_eq!(
        compose_prompt(Some("ctx".into()), "do it"),
        "ctx\n\ndo it"
    );
}

#[test]
fn blank_or_missing_context_is_ignored() {
    assert_eq!(compose_prompt(None, "do it"), "do it");
    assert_eq!(compose_prompt(Some("  \n".into()), "do it"), "do it");
}
