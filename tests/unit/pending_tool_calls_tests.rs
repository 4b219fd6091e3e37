//! Unit tests for in-flight tool-call bookkeeping.

use serde_json::json;

use agent_switchboard::adapter::{PendingToolCall, PendingToolCalls};
use agent_switchboard::models::event::EventType;
use agent_switchboard::models::payload::{NormalizedPayload, ToolStatus};

fn call(name: &str) -> PendingToolCall {
    PendingToolCall::new(
        name,
        Some(format!("run {name}")),
        ToolStatus::Pending,
        NormalizedPayload::generic(name, json!({})),
    )
}

#[test]
fn duplicate_insert_keeps_first_entry() {
    let mut calls = PendingToolCalls::new();

    assert!(calls.insert("call_1", call("first")));
    assert!(!calls.insert("call_1", call("second")));

    assert_eq!(calls.len(), 1);
    assert_eq!(calls.get_mut("call_1").expect("tracked").tool_name, "first");
}

#[test]
fn remove_takes_the_entry_once() {
    let mut calls = PendingToolCalls::new();
    calls.insert("call_1", call("bash"));

    assert!(calls.remove("call_1").is_some());
    assert!(calls.remove("call_1").is_none());
    assert!(calls.is_empty());
    assert!(!calls.contains("call_1"));
}

#[test]
fn cancel_all_emits_sorted_cancellations() {
    let mut calls = PendingToolCalls::new();
    calls.insert("call_b", call("grep"));
    calls.insert("call_a", call("bash"));

    let events = calls.cancel_all("ses_1");

    assert!(calls.is_empty());
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].tool_call_id.as_deref(), Some("call_a"));
    assert_eq!(events[1].tool_call_id.as_deref(), Some("call_b"));
    for event in &events {
        assert_eq!(event.event_type, EventType::ToolUpdate);
        assert_eq!(event.session_id, "ses_1");
        assert_eq!(event.tool_status, Some(ToolStatus::Cancelled));
        assert!(event.normalized_payload.is_some());
    }
    assert_eq!(events[0].tool_name.as_deref(), Some("bash"));
    assert_eq!(events[0].tool_title.as_deref(), Some("run bash"));
}

#[test]
fn cancel_all_on_empty_table_is_empty() {
    let mut calls = PendingToolCalls::new();

    assert!(calls.cancel_all("ses_1").is_empty());
}
