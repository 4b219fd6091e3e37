//! Unit tests for adapter configuration loading and validation.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use agent_switchboard::{AdapterConfig, AppError};

#[test]
fn empty_document_yields_defaults() {
    let config = AdapterConfig::from_toml_str("").expect("defaults are valid");

    assert_eq!(config.event_channel_capacity, 100);
    assert!(!config.auto_approve);
    assert_eq!(config.workspace_root, PathBuf::from("."));
    assert_eq!(config.client_name, "agent-switchboard");
    assert_eq!(config.acp.protocol_version, 1);
    assert_eq!(config.acp.handshake_timeout(), Duration::from_secs(30));
    assert_eq!(config.opencode.discovery_timeout(), Duration::from_secs(180));
    assert_eq!(config.opencode.health_timeout(), Duration::from_secs(30));
    assert_eq!(config.opencode.health_path, "/global/health");
    assert_eq!(config.opencode.stdout_tail_lines, 64);
    assert_eq!(config, AdapterConfig::default());
}

#[test]
fn nested_tables_override_defaults() {
    let config = AdapterConfig::from_toml_str(
        r#"
event_channel_capacity = 8
auto_approve = true
workspace_root = "/srv/project"

[acp]
handshake_timeout_seconds = 5
extra_args = ["--experimental-acp"]

[opencode]
model = "anthropic/claude-sonnet"
agent = "build"
"#,
    )
    .expect("valid config");

    assert_eq!(config.event_channel_capacity, 8);
    assert!(config.auto_approve);
    assert_eq!(config.workspace_root, PathBuf::from("/srv/project"));
    assert_eq!(config.acp.handshake_timeout_seconds, 5);
    assert_eq!(config.acp.extra_args, vec!["--experimental-acp"]);
    assert_eq!(config.opencode.model.as_deref(), Some("anthropic/claude-sonnet"));
    assert_eq!(config.opencode.agent.as_deref(), Some("build"));
    assert_eq!(config.opencode.health_path, "/global/health");
}

#[test]
fn load_from_path_reads_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "client_name = \"switchboard-test\"").expect("write");

    let config = AdapterConfig::load_from_path(file.path()).expect("load");

    assert_eq!(config.client_name, "switchboard-test");
}

#[test]
fn missing_file_is_config_error() {
    let dir = tempfile::tempdir().expect("temp dir");

    let err = AdapterConfig::load_from_path(dir.path().join("absent.toml"))
        .expect_err("must fail");

    assert!(matches!(err, AppError::Config(ref msg) if msg.starts_with("failed to read config")));
}

#[test]
fn malformed_toml_is_config_error() {
    let err = AdapterConfig::from_toml_str("event_channel_capacity = \"many\"")
        .expect_err("must fail");

    assert!(matches!(err, AppError::Config(ref msg) if msg.starts_with("invalid config")));
}

// ── Validation ───────────────────────────────────────────────────────────────

fn rejected(raw: &str) -> String {
    match AdapterConfig::from_toml_str(raw) {
        Err(AppError::Config(msg)) => msg,
        other => panic!("expected config error for {raw:?}, got {other:?}"),
    }
}

#[test]
fn zero_capacity_is_rejected() {
    assert!(rejected("event_channel_capacity = 0").contains("event_channel_capacity"));
}

#[test]
fn zero_handshake_timeout_is_rejected() {
    assert!(rejected("[acp]\nhandshake_timeout_seconds = 0").contains("handshake_timeout_seconds"));
}

#[test]
fn zero_opencode_timeouts_are_rejected() {
    assert!(rejected("[opencode]\ndiscovery_timeout_seconds = 0").contains("timeouts"));
    assert!(rejected("[opencode]\nhealth_timeout_seconds = 0").contains("timeouts"));
}

#[test]
fn relative_health_path_is_rejected() {
    assert!(rejected("[opencode]\nhealth_path = \"health\"").contains("health_path"));
}

#[test]
fn model_without_provider_is_rejected() {
    assert!(rejected("[opencode]\nmodel = \"gpt\"").contains("provider/model"));
}
