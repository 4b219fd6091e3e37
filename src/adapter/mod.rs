//! Protocol-agnostic adapter contract.
//!
//! The [`Adapter`] trait decouples the orchestrator (persistence, UI
//! fan-out, session state machine) from the wire protocol spoken by an
//! agent subprocess. Each implementation owns one subprocess connection,
//! runs its protocol lifecycle, and emits canonical
//! [`AgentEvent`](crate::models::event::AgentEvent)s on a bounded channel.

pub mod pending;
pub mod sink;

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::models::event::AgentEvent;
use crate::models::permission::PermissionHandler;
use crate::Result;

pub use pending::{PendingToolCall, PendingToolCalls};
pub use sink::EventSink;

/// Subprocess stdin handed to [`Adapter::connect`].
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;
/// Subprocess stdout handed to [`Adapter::connect`].
pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
/// Boxed future returned by async adapter operations.
pub type AdapterFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// An MCP server the agent should attach to a new session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct McpServerConfig {
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

/// A binary attachment sent along with a prompt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attachment {
    /// MIME type, e.g. `image/png`.
    pub mime_type: String,
    /// Base64-encoded content.
    pub data: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl Attachment {
    /// Whether the attachment is an image.
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

/// Capabilities the agent advertised during the handshake.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentCapabilities {
    /// The agent can resume an existing session.
    pub load_session: bool,
    pub image: bool,
    pub audio: bool,
    pub embedded_context: bool,
}

/// Agent identity populated by [`Adapter::initialize`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentInfo {
    pub name: String,
    pub version: String,
    /// Negotiated protocol version, when the protocol has one.
    pub protocol_version: Option<u16>,
    pub capabilities: AgentCapabilities,
}

/// Shared lifecycle every protocol adapter implements.
///
/// Methods may be called from several tasks at once; implementations guard
/// their mutable state with a single per-adapter lock.
pub trait Adapter: Send + Sync {
    /// Protocol-specific environment for the subprocess. Empty when unneeded.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Json`](crate::AppError::Json) if the environment
    /// payload cannot be serialised.
    fn prepare_environment(&self) -> Result<HashMap<String, String>>;

    /// Extra command-line arguments for the subprocess.
    fn prepare_command_args(&self) -> Vec<String>;

    /// Wire the adapter to an already-started subprocess.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::AlreadyConnected`](crate::AppError::AlreadyConnected)
    /// on a second call, [`AppError::Closed`](crate::AppError::Closed) after
    /// [`close`](Self::close).
    fn connect(&self, stdin: BoxedWriter, stdout: BoxedReader) -> Result<()>;

    /// Run the protocol handshake and wait until the agent is ready.
    ///
    /// # Errors
    ///
    /// Handshake, discovery and health-check failures are fatal.
    fn initialize(&self) -> AdapterFuture<'_, ()>;

    /// Identity and capabilities learned during [`initialize`](Self::initialize).
    fn agent_info(&self) -> Option<AgentInfo>;

    /// Create a session and emit `session_status(new)`.
    ///
    /// # Errors
    ///
    /// Returns the protocol error if the agent refuses the session.
    fn new_session(&self, mcp_servers: Vec<McpServerConfig>) -> AdapterFuture<'_, String>;

    /// Resume `session_id` and emit `session_status(resumed)`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::CapabilityUnsupported`](crate::AppError::CapabilityUnsupported)
    /// when the agent cannot resume sessions.
    fn load_session<'a>(&'a self, session_id: &'a str) -> AdapterFuture<'a, ()>;

    /// Text to prepend to the next prompt only.
    fn set_pending_context(&self, context: String);

    /// Send one user turn and wait for it to finish.
    ///
    /// Cancelling `cancel` sends a best-effort remote cancel and returns
    /// [`AppError::Cancelled`](crate::AppError::Cancelled).
    ///
    /// # Errors
    ///
    /// Returns protocol failures, [`AppError::NoSession`](crate::AppError::NoSession)
    /// before a session exists, and authentication failures.
    fn prompt<'a>(
        &'a self,
        cancel: CancellationToken,
        message: &'a str,
        attachments: Vec<Attachment>,
    ) -> AdapterFuture<'a, ()>;

    /// Best-effort cancellation of the running turn.
    ///
    /// # Errors
    ///
    /// Returns transport failures writing the cancel request.
    fn cancel(&self) -> AdapterFuture<'_, ()>;

    /// Take the receiving end of the event stream. Yields `Some` once.
    fn updates(&self) -> Option<mpsc::Receiver<AgentEvent>>;

    /// Register (or clear) the permission callback.
    fn set_permission_handler(&self, handler: Option<PermissionHandler>);

    /// Identifier of the active session, if any.
    fn session_id(&self) -> Option<String>;

    /// Tear down the connection. Idempotent.
    ///
    /// # Errors
    ///
    /// Implementations currently never fail; the signature leaves room for
    /// transports that must flush.
    fn close(&self) -> AdapterFuture<'_, ()>;

    /// Whether the subprocess must be killed rather than left to exit when
    /// its stdin closes.
    fn requires_process_kill(&self) -> bool;
}

/// Join a pending context and the user message into one prompt text.
#[must_use]
pub fn compose_prompt(pending_context: Option<String>, message: &str) -> String {
    match pending_context {
        Some(context) if !context.trim().is_empty() => format!("{context}\n\n{message}"),
        _ => message.to_owned(),
    }
}

/// Acquire a read guard, recovering from poisoning.
pub(crate) fn read_state<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

/// Acquire a write guard, recovering from poisoning.
pub(crate) fn write_state<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
