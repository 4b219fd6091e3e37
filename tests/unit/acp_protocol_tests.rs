//! Unit tests for ACP wire types and JSON-RPC message classification.

use serde_json::json;

use agent_switchboard::acp::protocol::{
    permission_outcome, response_message, Incoming, RequestPermissionParams, RpcError,
    SessionNotification, SessionUpdate, METHOD_NOT_FOUND,
};
use agent_switchboard::models::permission::PermissionResponse;

// ── Classification ───────────────────────────────────────────────────────────

#[test]
fn response_with_result_is_classified() {
    let msg = json!({ "jsonrpc": "2.0", "id": 3, "result": { "sessionId": "s1" } });

    let incoming = Incoming::classify(msg).expect("must classify");

    assert_eq!(
        incoming,
        Incoming::Response {
            id: 3,
            result: Ok(json!({ "sessionId": "s1" })),
        }
    );
}

#[test]
fn response_with_error_carries_code_and_message() {
    let msg = json!({
        "jsonrpc": "2.0",
        "id": 4,
        "error": { "code": -32000, "message": "auth required" }
    });

    let Some(Incoming::Response { id, result }) = Incoming::classify(msg) else {
        panic!("expected a response");
    };

    assert_eq!(id, 4);
    let err = result.expect_err("must be an error");
    assert_eq!(err.code, -32000);
    assert_eq!(err.message, "auth required");
}

#[test]
fn request_keeps_its_raw_id() {
    let msg = json!({
        "jsonrpc": "2.0",
        "id": "perm-1",
        "method": "session/request_permission",
        "params": { "x": 1 }
    });

    let incoming = Incoming::classify(msg).expect("must classify");

    assert_eq!(
        incoming,
        Incoming::Request {
            id: json!("perm-1"),
            method: "session/request_permission".into(),
            params: json!({ "x": 1 }),
        }
    );
}

#[test]
fn numeric_id_request_and_null_id_notification() {
    let request = json!({ "jsonrpc": "2.0", "id": 4, "method": "fs/read_text_file", "params": {} });
    assert!(matches!(
        Incoming::classify(request),
        Some(Incoming::Request { ref id, ref method, .. }) if *id == json!(4) && method == "fs/read_text_file"
    ));

    let notification = json!({ "jsonrpc": "2.0", "id": null, "method": "session/update", "params": {} });
    assert!(matches!(
        Incoming::classify(notification),
        Some(Incoming::Notification { ref method, .. }) if method == "session/update"
    ));
}

#[test]
fn message_without_id_is_a_notification() {
    let msg = json!({ "jsonrpc": "2.0", "method": "session/update", "params": {} });

    assert!(matches!(
        Incoming::classify(msg),
        Some(Incoming::Notification { method, .. }) if method == "session/update"
    ));
}

#[test]
fn non_object_and_empty_objects_are_rejected() {
    assert!(Incoming::classify(json!([1, 2, 3])).is_none());
    assert!(Incoming::classify(json!({ "jsonrpc": "2.0" })).is_none());
    assert!(
        Incoming::classify(json!({ "id": "not-ours", "result": {} })).is_none(),
        "responses to non-numeric ids were never issued by this side"
    );
}

#[test]
fn error_response_envelope_serialises_code() {
    let msg = response_message(json!(12), Err(RpcError::method_not_found("fs/read_text_file")));

    assert_eq!(msg["id"], 12);
    assert_eq!(msg["error"]["code"], METHOD_NOT_FOUND);
    assert!(msg.get("result").is_none());
}

// ── session/update payloads ──────────────────────────────────────────────────

#[test]
fn agent_message_chunk_parses() {
    let notification: SessionNotification = serde_json::from_value(json!({
        "sessionId": "s1",
        "update": {
            "sessionUpdate": "agent_message_chunk",
            "content": { "type": "text", "text": "hello" }
        }
    }))
    .expect("parse");

    assert_eq!(notification.session_id, "s1");
    let SessionUpdate::AgentMessageChunk { content } = notification.update else {
        panic!("expected a message chunk");
    };
    assert_eq!(content["text"], "hello");
}

#[test]
fn unknown_update_kind_parses_as_unknown() {
    let notification: SessionNotification = serde_json::from_value(json!({
        "sessionId": "s1",
        "update": { "sessionUpdate": "something_new" }
    }))
    .expect("unknown kinds must not fail parsing");

    assert!(matches!(notification.update, SessionUpdate::Unknown));
}

#[test]
fn tool_call_fields_expose_name_location_and_arguments() {
    let notification: SessionNotification = serde_json::from_value(json!({
        "sessionId": "s1",
        "update": {
            "sessionUpdate": "tool_call",
            "toolCallId": "t1",
            "title": "Read src/lib.rs",
            "kind": "read",
            "status": "pending",
            "rawInput": { "file_path": "src/lib.rs" },
            "locations": [{ "path": "src/lib.rs", "line": 3 }],
            "_meta": { "claudeCode": { "toolName": "Read" } }
        }
    }))
    .expect("parse");

    let SessionUpdate::ToolCall(fields) = notification.update else {
        panic!("expected a tool call");
    };
    assert_eq!(fields.tool_call_id, "t1");
    assert_eq!(fields.tool_name(), Some("Read"), "meta tool name wins over title");
    assert_eq!(fields.first_location(), Some("src/lib.rs"));
    assert_eq!(fields.arguments().expect("args")["file_path"], "src/lib.rs");
}

#[test]
fn empty_raw_input_counts_as_no_arguments() {
    let notification: SessionNotification = serde_json::from_value(json!({
        "sessionId": "s1",
        "update": { "sessionUpdate": "tool_call_update", "toolCallId": "t1", "rawInput": {} }
    }))
    .expect("parse");

    let SessionUpdate::ToolCallUpdate(fields) = notification.update else {
        panic!("expected a tool call update");
    };
    assert!(fields.arguments().is_none());
    assert!(fields.tool_name().is_none());
}

#[test]
fn content_blocks_yield_text_and_diff() {
    let notification: SessionNotification = serde_json::from_value(json!({
        "sessionId": "s1",
        "update": {
            "sessionUpdate": "tool_call_update",
            "toolCallId": "t1",
            "content": [
                { "type": "content", "content": { "type": "text", "text": "first" } },
                { "type": "diff", "path": "a.rs", "oldText": "x", "newText": "y" },
                { "type": "content", "content": { "type": "text", "text": "second" } }
            ]
        }
    }))
    .expect("parse");

    let SessionUpdate::ToolCallUpdate(fields) = notification.update else {
        panic!("expected a tool call update");
    };
    assert_eq!(fields.content_text().as_deref(), Some("first\nsecond"));
    assert_eq!(
        fields.content_diff(),
        Some(("a.rs".to_owned(), "x".to_owned(), "y".to_owned()))
    );
}

#[test]
fn available_commands_keep_input_hint() {
    let notification: SessionNotification = serde_json::from_value(json!({
        "sessionId": "s1",
        "update": {
            "sessionUpdate": "available_commands_update",
            "availableCommands": [
                { "name": "review", "description": "Review changes", "input": { "hint": "branch" } },
                { "name": "init" }
            ]
        }
    }))
    .expect("parse");

    let SessionUpdate::AvailableCommandsUpdate { available_commands } = notification.update
    else {
        panic!("expected available commands");
    };
    assert_eq!(available_commands.len(), 2);
    assert_eq!(available_commands[0].name, "review");
}

// ── Permission bridging ──────────────────────────────────────────────────────

#[test]
fn permission_params_parse_options() {
    let params: RequestPermissionParams = serde_json::from_value(json!({
        "sessionId": "s1",
        "toolCall": { "toolCallId": "t9", "title": "Write file" },
        "options": [
            { "optionId": "allow", "name": "Allow", "kind": "allow_once" },
            { "optionId": "deny", "name": "Deny", "kind": "reject_once" }
        ]
    }))
    .expect("parse");

    assert_eq!(params.tool_call.tool_call_id, "t9");
    assert_eq!(params.options.len(), 2);
    assert_eq!(params.options[1].option_id, "deny");
}

#[test]
fn selected_outcome_names_the_option() {
    let outcome = permission_outcome(&PermissionResponse::selected("allow"));

    assert_eq!(
        outcome,
        json!({ "outcome": { "outcome": "selected", "optionId": "allow" } })
    );
}

#[test]
fn cancelled_or_empty_choice_is_a_cancelled_outcome() {
    let expected = json!({ "outcome": { "outcome": "cancelled" } });

    assert_eq!(permission_outcome(&PermissionResponse::cancelled()), expected);
    assert_eq!(permission_outcome(&PermissionResponse::default()), expected);
}
