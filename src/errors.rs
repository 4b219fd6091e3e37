//! Error types shared across the crate.

use std::fmt::{Display, Formatter};

/// Shared crate result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Error enumeration covering every adapter failure mode.
///
/// In-stream anomalies (malformed tool arguments, unknown content blocks,
/// a saturated output channel) are logged and degraded instead of being
/// returned through this type; only handshake, session and prompt calls
/// surface errors to the caller.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// File-system or pipe I/O failure.
    Io(String),
    /// JSON serialisation or deserialisation failure.
    Json(String),
    /// ACP framing or protocol violation.
    Acp(String),
    /// HTTP transport failure talking to a REST agent.
    Http(String),
    /// The protocol handshake failed or timed out.
    Handshake(String),
    /// The agent does not support the requested capability.
    CapabilityUnsupported(String),
    /// `connect` was called on an adapter that already owns a connection.
    AlreadyConnected,
    /// An operation needs a connection that was never established.
    NotConnected,
    /// An operation needs an active session but none exists.
    NoSession,
    /// The agent answered a JSON-RPC request with an error object.
    Rpc {
        /// JSON-RPC error code.
        code: i64,
        /// Error message supplied by the agent.
        message: String,
    },
    /// The subprocess never announced its listening URL.
    DiscoveryTimeout {
        /// Human-readable failure description.
        message: String,
        /// Last lines captured from the subprocess stdout.
        stdout_tail: Vec<String>,
    },
    /// The subprocess endpoint never reported healthy.
    HealthCheckTimeout {
        /// Human-readable failure description.
        message: String,
        /// Last lines captured from the subprocess stdout.
        stdout_tail: Vec<String>,
    },
    /// The agent requires provider authentication before it can run.
    AuthRequired(String),
    /// The operation was cancelled by the caller.
    Cancelled,
    /// The adapter has been closed.
    Closed,
    /// Requested entity does not exist.
    NotFound(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
            Self::Json(msg) => write!(f, "json: {msg}"),
            Self::Acp(msg) => write!(f, "acp: {msg}"),
            Self::Http(msg) => write!(f, "http: {msg}"),
            Self::Handshake(msg) => write!(f, "handshake failed: {msg}"),
            Self::CapabilityUnsupported(msg) => write!(f, "capability unsupported: {msg}"),
            Self::AlreadyConnected => write!(f, "adapter already connected"),
            Self::NotConnected => write!(f, "adapter not connected"),
            Self::NoSession => write!(f, "no active session"),
            Self::Rpc { code, message } => write!(f, "rpc error {code}: {message}"),
            Self::DiscoveryTimeout {
                message,
                stdout_tail,
            }
            | Self::HealthCheckTimeout {
                message,
                stdout_tail,
            } => {
                write!(f, "{message}")?;
                if !stdout_tail.is_empty() {
                    write!(f, "\n--- last stdout lines ---\n{}", stdout_tail.join("\n"))?;
                }
                Ok(())
            }
            Self::AuthRequired(msg) => write!(f, "authentication required: {msg}"),
            Self::Cancelled => write!(f, "operation cancelled"),
            Self::Closed => write!(f, "adapter closed"),
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.to_string())
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}
