//! Unit tests for permission decisions and per-protocol process setup.

use agent_switchboard::acp::AcpAdapter;
use agent_switchboard::models::permission::{
    default_decision, PermissionOption, PermissionResponse,
};
use agent_switchboard::opencode::adapter::{
    permission_options, reply_for, CONFIG_ENV_VAR, REPLY_ALWAYS, REPLY_ONCE, REPLY_REJECT,
};
use agent_switchboard::opencode::OpenCodeAdapter;
use agent_switchboard::{Adapter, AdapterConfig};

// ── Default decision ─────────────────────────────────────────────────────────

#[test]
fn default_decision_selects_first_option() {
    let options = vec![
        PermissionOption::new("allow", "Allow", "allow_once"),
        PermissionOption::new("deny", "Deny", "reject_once"),
    ];

    assert_eq!(default_decision(&options), PermissionResponse::selected("allow"));
}

#[test]
fn default_decision_without_options_cancels() {
    assert_eq!(default_decision(&[]), PermissionResponse::cancelled());
}

#[test]
fn reject_kinds_are_recognised() {
    assert!(PermissionOption::new("x", "X", "reject_always").is_reject());
    assert!(!PermissionOption::new("x", "X", "allow_always").is_reject());
}

// ── OpenCode reply vocabulary ────────────────────────────────────────────────

#[test]
fn reply_mapping() {
    assert_eq!(reply_for(&PermissionResponse::selected(REPLY_ONCE)), "once");
    assert_eq!(reply_for(&PermissionResponse::selected(REPLY_ALWAYS)), "always");
    assert_eq!(reply_for(&PermissionResponse::selected("something")), REPLY_REJECT);
    assert_eq!(reply_for(&PermissionResponse::cancelled()), REPLY_REJECT);
}

#[test]
fn opencode_options_default_to_allow_once() {
    let options = permission_options();

    assert_eq!(options.len(), 3);
    assert_eq!(default_decision(&options).option_id, REPLY_ONCE);
    assert!(options[2].is_reject());
}

// ── Process setup ────────────────────────────────────────────────────────────

#[test]
fn opencode_serves_on_ephemeral_loopback_port() {
    let adapter = OpenCodeAdapter::new(AdapterConfig::default());

    assert_eq!(
        adapter.prepare_command_args(),
        vec!["serve", "--hostname", "127.0.0.1", "--port", "0"]
    );
    assert!(adapter.requires_process_kill());
}

#[test]
fn opencode_environment_carries_permission_policy() {
    let mut config = AdapterConfig::default();
    config.opencode.model = Some("anthropic/claude".into());
    let adapter = OpenCodeAdapter::new(config);

    let env = adapter.prepare_environment().expect("environment");
    let raw = env.get(CONFIG_ENV_VAR).expect("config variable");
    let value: serde_json::Value = serde_json::from_str(raw).expect("json");

    assert_eq!(value["permission"]["bash"], "ask");
    assert_eq!(value["permission"]["edit"], "ask");
    assert_eq!(value["model"], "anthropic/claude");
}

#[test]
fn opencode_auto_approve_allows_everything() {
    let config = AdapterConfig {
        auto_approve: true,
        ..AdapterConfig::default()
    };
    let adapter = OpenCodeAdapter::new(config);

    let env = adapter.prepare_environment().expect("environment");
    let value: serde_json::Value =
        serde_json::from_str(&env[CONFIG_ENV_VAR]).expect("json");

    assert_eq!(value["permission"]["webfetch"], "allow");
}

#[test]
fn acp_needs_no_environment_and_passes_extra_args() {
    let mut config = AdapterConfig::default();
    config.acp.extra_args = vec!["--acp".into()];
    let adapter = AcpAdapter::new(config);

    assert!(adapter.prepare_environment().expect("environment").is_empty());
    assert_eq!(adapter.prepare_command_args(), vec!["--acp"]);
    assert!(!adapter.requires_process_kill());
}
