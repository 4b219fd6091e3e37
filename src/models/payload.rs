//! Canonical tool-call payloads.
//!
//! Every vendor tool invocation is classified into exactly one
//! [`NormalizedPayload`] variant. Unrecognised tools land in
//! [`NormalizedPayload::Generic`], which keeps the raw name and arguments
//! verbatim so nothing is lost.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle status of a tool call, shared by every adapter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    /// Call announced but not yet running.
    Pending,
    /// Call blocked on a permission decision.
    PendingPermission,
    /// Call is executing.
    Running,
    /// Call finished successfully.
    Complete,
    /// Call failed.
    Error,
    /// Call was cancelled or abandoned.
    Cancelled,
}

impl ToolStatus {
    /// Whether no further updates are expected for the call.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Error | Self::Cancelled)
    }

    /// Wire representation used in events and logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::PendingPermission => "pending_permission",
            Self::Running => "running",
            Self::Complete => "complete",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Kind of change applied to a file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MutationType {
    /// Whole-file write (create or overwrite).
    Create,
    /// Old/new string replacement.
    Patch,
    /// File removal.
    Delete,
    /// File move or rename.
    Rename,
}

/// One change applied to a file by a modify-file tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileMutation {
    /// What kind of change this is.
    pub mutation_type: MutationType,
    /// Full file content for `Create`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Replaced text for `Patch`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_content: Option<String>,
    /// Replacement text for `Patch`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_content: Option<String>,
    /// Unified diff synthesized for `Patch`; empty when the patch is a no-op.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
    /// First line of the patched region, when the agent reported it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_line: Option<u32>,
    /// Destination path for `Rename`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_path: Option<String>,
}

impl FileMutation {
    /// Mutation with only its type set.
    #[must_use]
    pub fn new(mutation_type: MutationType) -> Self {
        Self {
            mutation_type,
            content: None,
            old_content: None,
            new_content: None,
            diff: None,
            start_line: None,
            new_path: None,
        }
    }
}

/// A file write, patch, delete or move.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModifyFilePayload {
    pub file_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default)]
    pub mutations: Vec<FileMutation>,
    /// Agent-reported result text, when any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of reading a file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReadFileOutput {
    pub content: String,
    pub line_count: usize,
    #[serde(default)]
    pub truncated: bool,
}

/// A file read.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReadFilePayload {
    pub file_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<ReadFileOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Captured process output.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShellOutput {
    pub stdout: String,
    pub stderr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

/// A shell command execution.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShellExecPayload {
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Timeout requested by the agent, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub background: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<ShellOutput>,
}

/// Files matched by a search or listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchOutput {
    #[serde(default)]
    pub files: Vec<String>,
    pub file_count: usize,
    /// Raw result text when the result was not a plain file list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default)]
    pub truncated: bool,
}

/// A grep, glob, find or directory listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CodeSearchPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glob: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<SearchOutput>,
}

/// A web fetch or web search.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HttpRequestPayload {
    pub url: String,
    #[serde(default = "default_http_method")]
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn default_http_method() -> String {
    "GET".into()
}

/// A delegated sub-agent run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubagentTaskPayload {
    pub description: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subagent_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

/// A standalone task created for later work.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateTaskPayload {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

/// One todo-list entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TodoItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub content: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
}

/// A read or rewrite of the agent's todo list.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManageTodosPayload {
    /// `write` or `read`.
    pub operation: String,
    #[serde(default)]
    pub todos: Vec<TodoItem>,
}

/// Catch-all for tools without a canonical shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GenericPayload {
    pub name: String,
    #[serde(default)]
    pub input: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
}

/// Canonical, protocol-agnostic representation of one tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NormalizedPayload {
    ModifyFile(ModifyFilePayload),
    ReadFile(ReadFilePayload),
    ShellExec(ShellExecPayload),
    CodeSearch(CodeSearchPayload),
    HttpRequest(HttpRequestPayload),
    SubagentTask(SubagentTaskPayload),
    CreateTask(CreateTaskPayload),
    ManageTodos(ManageTodosPayload),
    Generic(GenericPayload),
}

impl NormalizedPayload {
    /// Generic payload that keeps `name` and `input` untouched.
    #[must_use]
    pub fn generic(name: impl Into<String>, input: Value) -> Self {
        Self::Generic(GenericPayload {
            name: name.into(),
            input,
            output: None,
        })
    }

    /// Stable kind label, identical to the serialized `kind` tag.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ModifyFile(_) => "modify_file",
            Self::ReadFile(_) => "read_file",
            Self::ShellExec(_) => "shell_exec",
            Self::CodeSearch(_) => "code_search",
            Self::HttpRequest(_) => "http_request",
            Self::SubagentTask(_) => "subagent_task",
            Self::CreateTask(_) => "create_task",
            Self::ManageTodos(_) => "manage_todos",
            Self::Generic(_) => "generic",
        }
    }
}
