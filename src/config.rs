//! Adapter configuration parsing and validation.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::{AppError, Result};

fn default_channel_capacity() -> usize {
    100
}

fn default_workspace_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_client_name() -> String {
    "agent-switchboard".into()
}

fn default_protocol_version() -> u16 {
    1
}

fn default_handshake_timeout() -> u64 {
    30
}

fn default_discovery_timeout() -> u64 {
    180
}

fn default_health_timeout() -> u64 {
    30
}

fn default_health_path() -> String {
    "/global/health".into()
}

fn default_stdout_tail_lines() -> usize {
    64
}

/// Settings for the JSON-RPC/stdio (ACP) adapter.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", default)]
pub struct AcpConfig {
    /// Protocol version offered during `initialize`.
    pub protocol_version: u16,
    /// Upper bound on the `initialize` round trip.
    pub handshake_timeout_seconds: u64,
    /// Extra arguments appended to the agent command line.
    pub extra_args: Vec<String>,
}

impl Default for AcpConfig {
    fn default() -> Self {
        Self {
            protocol_version: default_protocol_version(),
            handshake_timeout_seconds: default_handshake_timeout(),
            extra_args: Vec::new(),
        }
    }
}

impl AcpConfig {
    /// Handshake timeout as a [`Duration`].
    #[must_use]
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_seconds)
    }
}

/// Settings for the REST + SSE (OpenCode) adapter.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", default)]
pub struct OpenCodeConfig {
    /// How long to wait for the "server listening on" stdout sentinel.
    pub discovery_timeout_seconds: u64,
    /// How long to wait for the health endpoint to answer successfully.
    pub health_timeout_seconds: u64,
    /// Path of the health endpoint, relative to the discovered base URL.
    pub health_path: String,
    /// Number of stdout lines retained for diagnostics.
    pub stdout_tail_lines: usize,
    /// Optional `provider/model` pair sent with every prompt.
    pub model: Option<String>,
    /// Optional agent name sent with every prompt.
    pub agent: Option<String>,
}

impl Default for OpenCodeConfig {
    fn default() -> Self {
        Self {
            discovery_timeout_seconds: default_discovery_timeout(),
            health_timeout_seconds: default_health_timeout(),
            health_path: default_health_path(),
            stdout_tail_lines: default_stdout_tail_lines(),
            model: None,
            agent: None,
        }
    }
}

impl OpenCodeConfig {
    /// Discovery window as a [`Duration`].
    #[must_use]
    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_secs(self.discovery_timeout_seconds)
    }

    /// Health-check window as a [`Duration`].
    #[must_use]
    pub fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health_timeout_seconds)
    }
}

/// Top-level adapter configuration parsed from TOML.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", default)]
pub struct AdapterConfig {
    /// Capacity of the bounded `updates` channel.
    pub event_channel_capacity: usize,
    /// Approve every permission request without consulting a handler.
    pub auto_approve: bool,
    /// Working directory announced to the agent for new sessions.
    pub workspace_root: PathBuf,
    /// Client name announced during handshakes.
    pub client_name: String,
    /// JSON-RPC/stdio adapter settings.
    pub acp: AcpConfig,
    /// REST + SSE adapter settings.
    pub opencode: OpenCodeConfig,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: default_channel_capacity(),
            auto_approve: false,
            workspace_root: default_workspace_root(),
            client_name: default_client_name(),
            acp: AcpConfig::default(),
            opencode: OpenCodeConfig::default(),
        }
    }
}

impl AdapterConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read, contains
    /// invalid TOML, or fails validation.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants that serde defaults cannot express.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` describing the first violated constraint.
    pub fn validate(&self) -> Result<()> {
        if self.event_channel_capacity == 0 {
            return Err(AppError::Config(
                "event_channel_capacity must be greater than zero".into(),
            ));
        }
        if self.acp.handshake_timeout_seconds == 0 {
            return Err(AppError::Config(
                "acp.handshake_timeout_seconds must be greater than zero".into(),
            ));
        }
        if self.opencode.discovery_timeout_seconds == 0
            || self.opencode.health_timeout_seconds == 0
        {
            return Err(AppError::Config(
                "opencode timeouts must be greater than zero".into(),
            ));
        }
        if !self.opencode.health_path.starts_with('/') {
            return Err(AppError::Config(
                "opencode.health_path must start with '/'".into(),
            ));
        }
        if let Some(model) = &self.opencode.model {
            if model.split_once('/').is_none() {
                return Err(AppError::Config(format!(
                    "opencode.model must be 'provider/model', got '{model}'"
                )));
            }
        }
        Ok(())
    }
}
