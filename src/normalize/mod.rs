//! Tool-call normalization.
//!
//! A [`ToolNormalizer`] turns one vendor's tool vocabulary into
//! [`NormalizedPayload`]s. Classification is total: anything not recognised
//! becomes [`NormalizedPayload::Generic`] with the raw name and arguments.
//!
//! Vendors disagree on argument names for the same concept (`file_path`
//! vs `filePath` vs `path`, `command` vs `cmd`). Each normalizer supplies a
//! [`FieldAliases`] table listing its own spelling first and the other
//! vendors' spellings after it; the shared builders in this module walk
//! that table.

pub mod acp;
pub mod diff;
pub mod language;
pub mod listing;
pub mod opencode;
pub mod shell;
pub mod status;

use serde_json::Value;
use tracing::debug;

use crate::models::payload::{
    CodeSearchPayload, CreateTaskPayload, FileMutation, HttpRequestPayload, ManageTodosPayload,
    ModifyFilePayload, MutationType, NormalizedPayload, ReadFileOutput, ReadFilePayload,
    SearchOutput, ShellExecPayload, SubagentTaskPayload, TodoItem,
};

pub use acp::AcpNormalizer;
pub use diff::generate_unified_diff;
pub use language::detect_language;
pub use opencode::OpenCodeNormalizer;
pub use shell::parse_shell_output;
pub use status::normalize_status;

/// How a tool identifies itself on the wire.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToolIdentity<'a> {
    /// Vendor tool name (`bash`, `Read`, `str_replace`, …).
    pub name: &'a str,
    /// Explicit discriminator, when the protocol carries one (ACP `kind`).
    pub kind: Option<&'a str>,
    /// First affected path reported outside the arguments (ACP `locations`).
    pub location: Option<&'a str>,
}

impl<'a> ToolIdentity<'a> {
    /// Identity with only a tool name.
    #[must_use]
    pub fn named(name: &'a str) -> Self {
        Self {
            name,
            kind: None,
            location: None,
        }
    }
}

/// Raw result of a tool call as reported by the agent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawToolResult {
    /// Structured output (`rawOutput`, OpenCode `state.output`, …).
    pub output: Option<Value>,
    /// Text rendering assembled from content blocks.
    pub text: Option<String>,
    /// Failure message, when the call errored.
    pub error: Option<String>,
    /// Vendor metadata attached to the result.
    pub metadata: Option<Value>,
}

impl RawToolResult {
    /// Best-effort text form of the result.
    #[must_use]
    pub fn text(&self) -> String {
        if let Some(text) = self.text.as_deref().filter(|t| !t.is_empty()) {
            return text.to_owned();
        }
        match &self.output {
            Some(Value::String(text)) => text.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => shell::parse_shell_output(other).stdout,
        }
    }

    /// Whether the result carries nothing at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.output.is_none() && self.text.is_none() && self.error.is_none()
    }
}

/// Vendor-specific tool vocabulary translator.
pub trait ToolNormalizer: Send + Sync {
    /// Classify a tool call. Never fails.
    fn normalize_tool_call(&self, tool: &ToolIdentity<'_>, args: &Value) -> NormalizedPayload;

    /// Fold a result into a payload produced by
    /// [`normalize_tool_call`](Self::normalize_tool_call). May re-classify
    /// the payload (a file read answered with a directory listing becomes a
    /// search).
    fn normalize_tool_result(&self, payload: &mut NormalizedPayload, result: &RawToolResult);
}

/// Argument-name spellings for one vendor, own convention first.
#[derive(Debug, Clone, Copy)]
pub struct FieldAliases {
    pub path: &'static [&'static str],
    pub command: &'static [&'static str],
    pub work_dir: &'static [&'static str],
    pub old_text: &'static [&'static str],
    pub new_text: &'static [&'static str],
    pub content: &'static [&'static str],
}

const TIMEOUT_KEYS: &[&str] = &["timeout", "timeout_ms", "timeoutMs"];
const BACKGROUND_KEYS: &[&str] = &["run_in_background", "background", "is_background"];
const DESCRIPTION_KEYS: &[&str] = &["description", "justification"];
const OFFSET_KEYS: &[&str] = &["offset", "start_line", "line"];
const LIMIT_KEYS: &[&str] = &["limit", "lines"];
const START_LINE_KEYS: &[&str] = &["start_line", "startLine", "line"];
const NEW_PATH_KEYS: &[&str] = &["new_path", "newPath", "destination", "to"];
const PATTERN_KEYS: &[&str] = &["pattern", "regex"];
const QUERY_KEYS: &[&str] = &["query", "q"];
const SEARCH_PATH_KEYS: &[&str] = &["path", "dir", "directory", "cwd"];
const GLOB_KEYS: &[&str] = &["glob", "include", "glob_pattern"];
const URL_KEYS: &[&str] = &["url", "uri"];
const PATCH_KEYS: &[&str] = &["patch", "patchText", "diff"];

// ── Argument helpers ─────────────────────────────────────────────────────────

/// First non-empty string among `keys`.
#[must_use]
pub fn first_str(args: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| args.get(*key).and_then(Value::as_str))
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

/// First unsigned integer among `keys`; numeric strings are accepted.
#[must_use]
pub fn first_u64(args: &Value, keys: &[&str]) -> Option<u64> {
    keys.iter()
        .find_map(|key| args.get(*key))
        .and_then(|value| match value {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
}

fn first_bool(args: &Value, keys: &[&str]) -> bool {
    keys.iter()
        .find_map(|key| args.get(*key).and_then(Value::as_bool))
        .unwrap_or(false)
}

/// Render a command that may be a string or an argv array.
///
/// `["bash", "-lc", "ls -la"]` collapses to the inner script.
#[must_use]
pub fn command_string(value: &Value) -> Option<String> {
    match value {
        Value::String(command) => Some(command.clone()),
        Value::Array(parts) => {
            let parts: Vec<&str> = parts.iter().filter_map(Value::as_str).collect();
            match parts.as_slice() {
                [shell, flag, script] if is_shell(shell) && flag.starts_with('-') => {
                    Some((*script).to_owned())
                }
                [] => None,
                _ => Some(parts.join(" ")),
            }
        }
        _ => None,
    }
}

fn is_shell(program: &str) -> bool {
    let base = program.rsplit('/').next().unwrap_or(program);
    matches!(base, "bash" | "sh" | "zsh" | "fish" | "pwsh" | "powershell")
}

// ── Shared payload builders ──────────────────────────────────────────────────

pub(crate) fn build_shell(args: &Value, aliases: &FieldAliases) -> NormalizedPayload {
    let command = aliases
        .command
        .iter()
        .find_map(|key| args.get(*key))
        .and_then(command_string)
        .unwrap_or_default();

    NormalizedPayload::ShellExec(ShellExecPayload {
        command,
        work_dir: first_str(args, aliases.work_dir),
        description: first_str(args, DESCRIPTION_KEYS),
        timeout: first_u64(args, TIMEOUT_KEYS),
        background: first_bool(args, BACKGROUND_KEYS),
        output: None,
    })
}

pub(crate) fn build_read(
    args: &Value,
    aliases: &FieldAliases,
    location: Option<&str>,
) -> NormalizedPayload {
    let file_path = first_str(args, aliases.path)
        .or_else(|| location.map(str::to_owned))
        .unwrap_or_default();

    NormalizedPayload::ReadFile(ReadFilePayload {
        language: detect_language(&file_path).map(str::to_owned),
        file_path,
        offset: first_u64(args, OFFSET_KEYS),
        limit: first_u64(args, LIMIT_KEYS),
        output: None,
        error: None,
    })
}

/// Build an edit payload: full-file write when a content field is present,
/// otherwise old/new replacement(s).
pub(crate) fn build_edit(
    args: &Value,
    aliases: &FieldAliases,
    location: Option<&str>,
) -> NormalizedPayload {
    let file_path = first_str(args, aliases.path)
        .or_else(|| location.map(str::to_owned))
        .unwrap_or_default();

    let mut mutations = Vec::new();
    if let Some(content) = aliases
        .content
        .iter()
        .find_map(|key| args.get(*key).and_then(Value::as_str))
    {
        let mut mutation = FileMutation::new(MutationType::Create);
        mutation.content = Some(content.to_owned());
        mutations.push(mutation);
    } else if let Some(Value::Array(edits)) = args.get("edits") {
        for edit in edits {
            if let Some(mutation) = patch_mutation(edit, aliases, &file_path) {
                mutations.push(mutation);
            }
        }
    } else if let Some(mutation) = patch_mutation(args, aliases, &file_path) {
        mutations.push(mutation);
    } else if let Some(patch) = first_str(args, PATCH_KEYS) {
        let mut mutation = FileMutation::new(MutationType::Patch);
        mutation.diff = Some(patch);
        mutations.push(mutation);
    }

    NormalizedPayload::ModifyFile(ModifyFilePayload {
        language: detect_language(&file_path).map(str::to_owned),
        file_path,
        mutations,
        output: None,
        error: None,
    })
}

fn patch_mutation(args: &Value, aliases: &FieldAliases, path: &str) -> Option<FileMutation> {
    let old = aliases
        .old_text
        .iter()
        .find_map(|key| args.get(*key).and_then(Value::as_str));
    let new = aliases
        .new_text
        .iter()
        .find_map(|key| args.get(*key).and_then(Value::as_str));
    if old.is_none() && new.is_none() {
        return None;
    }

    let old = old.unwrap_or_default();
    let new = new.unwrap_or_default();
    let start_line = first_u64(args, START_LINE_KEYS).and_then(|n| u32::try_from(n).ok());

    let mut mutation = FileMutation::new(MutationType::Patch);
    mutation.diff = Some(generate_unified_diff(
        old,
        new,
        path,
        start_line.unwrap_or(1),
    ));
    mutation.old_content = Some(old.to_owned());
    mutation.new_content = Some(new.to_owned());
    mutation.start_line = start_line;
    Some(mutation)
}

pub(crate) fn build_delete(
    args: &Value,
    aliases: &FieldAliases,
    location: Option<&str>,
) -> NormalizedPayload {
    let file_path = first_str(args, aliases.path)
        .or_else(|| location.map(str::to_owned))
        .unwrap_or_default();
    NormalizedPayload::ModifyFile(ModifyFilePayload {
        language: detect_language(&file_path).map(str::to_owned),
        file_path,
        mutations: vec![FileMutation::new(MutationType::Delete)],
        output: None,
        error: None,
    })
}

pub(crate) fn build_move(
    args: &Value,
    aliases: &FieldAliases,
    location: Option<&str>,
) -> NormalizedPayload {
    let file_path = first_str(args, &["source", "from"])
        .or_else(|| first_str(args, aliases.path))
        .or_else(|| location.map(str::to_owned))
        .unwrap_or_default();
    let mut mutation = FileMutation::new(MutationType::Rename);
    mutation.new_path = first_str(args, NEW_PATH_KEYS);
    NormalizedPayload::ModifyFile(ModifyFilePayload {
        language: detect_language(&file_path).map(str::to_owned),
        file_path,
        mutations: vec![mutation],
        output: None,
        error: None,
    })
}

/// Build a search payload. `glob_tool` marks tools whose `pattern` argument
/// is a file glob rather than a content regex.
pub(crate) fn build_search(
    args: &Value,
    location: Option<&str>,
    glob_tool: bool,
) -> NormalizedPayload {
    let pattern = first_str(args, PATTERN_KEYS);
    let (pattern, glob) = if glob_tool {
        (None, pattern.or_else(|| first_str(args, GLOB_KEYS)))
    } else {
        (pattern, first_str(args, GLOB_KEYS))
    };

    NormalizedPayload::CodeSearch(CodeSearchPayload {
        query: first_str(args, QUERY_KEYS),
        pattern,
        path: first_str(args, SEARCH_PATH_KEYS).or_else(|| location.map(str::to_owned)),
        glob,
        output: None,
    })
}

pub(crate) fn build_fetch(args: &Value) -> NormalizedPayload {
    NormalizedPayload::HttpRequest(HttpRequestPayload {
        url: first_str(args, URL_KEYS).unwrap_or_default(),
        method: first_str(args, &["method"])
            .map_or_else(|| "GET".to_owned(), |m| m.to_ascii_uppercase()),
        prompt: first_str(args, &["prompt", "query"]),
        response: None,
        error: None,
    })
}

pub(crate) fn build_subagent(args: &Value) -> NormalizedPayload {
    NormalizedPayload::SubagentTask(SubagentTaskPayload {
        description: first_str(args, &["description", "title"]).unwrap_or_default(),
        prompt: first_str(args, &["prompt", "message"]).unwrap_or_default(),
        subagent_type: first_str(args, &["subagent_type", "subagentType", "agent"]),
        output: None,
    })
}

pub(crate) fn build_create_task(args: &Value) -> NormalizedPayload {
    NormalizedPayload::CreateTask(CreateTaskPayload {
        title: first_str(args, &["title", "subject", "name"]).unwrap_or_default(),
        description: first_str(args, &["description", "body"]),
        output: None,
    })
}

pub(crate) fn build_todos(args: &Value) -> NormalizedPayload {
    let items = args
        .get("todos")
        .or_else(|| args.get("plan"))
        .and_then(Value::as_array);
    let todos = items.map(|items| parse_todos(items)).unwrap_or_default();
    NormalizedPayload::ManageTodos(ManageTodosPayload {
        operation: if items.is_some() { "write" } else { "read" }.to_owned(),
        todos,
    })
}

fn parse_todos(items: &[Value]) -> Vec<TodoItem> {
    items
        .iter()
        .filter_map(|item| {
            let content = first_str(item, &["content", "step", "title", "text"])?;
            Some(TodoItem {
                id: first_str(item, &["id"]),
                content,
                status: first_str(item, &["status"]).unwrap_or_else(|| "pending".to_owned()),
                priority: first_str(item, &["priority"]),
            })
        })
        .collect()
}

// ── Result merging ───────────────────────────────────────────────────────────

/// Fold `result` into `payload`. Shared by every normalizer.
pub(crate) fn merge_result(payload: &mut NormalizedPayload, result: &RawToolResult) {
    if result.is_empty() {
        return;
    }

    if let NormalizedPayload::ReadFile(read) = payload {
        let text = result.text();
        if let Some(files) =
            listing::directory_entries(result.output.as_ref(), &text, &read.file_path)
        {
            let path = read.file_path.clone();
            debug!(
                path = path.as_str(),
                entries = files.len(),
                "read result is a directory listing, re-classifying as search"
            );
            *payload = NormalizedPayload::CodeSearch(CodeSearchPayload {
                query: None,
                pattern: None,
                path: Some(path),
                glob: None,
                output: Some(SearchOutput {
                    file_count: files.len(),
                    files,
                    content: None,
                    truncated: false,
                }),
            });
            return;
        }
    }

    match payload {
        NormalizedPayload::ShellExec(shell) => {
            let mut output = match (&result.output, &result.text) {
                (Some(raw), _) => parse_shell_output(raw),
                (None, Some(text)) => parse_shell_output(&Value::String(text.clone())),
                (None, None) => Default::default(),
            };
            if let Some(error) = &result.error {
                if output.stderr.is_empty() {
                    output.stderr.clone_from(error);
                }
            }
            if output.exit_code.is_none() {
                output.exit_code = result
                    .metadata
                    .as_ref()
                    .and_then(|meta| meta.get("exit").or_else(|| meta.get("exitCode")))
                    .and_then(Value::as_i64)
                    .and_then(|code| i32::try_from(code).ok());
            }
            shell.output = Some(output);
        }
        NormalizedPayload::ReadFile(read) => {
            let content = result.text();
            let truncated = result
                .metadata
                .as_ref()
                .and_then(|meta| meta.get("truncated"))
                .and_then(Value::as_bool)
                .unwrap_or(false);
            if !content.is_empty() {
                read.output = Some(ReadFileOutput {
                    line_count: content.lines().count(),
                    content,
                    truncated,
                });
            }
            read.error.clone_from(&result.error);
        }
        NormalizedPayload::ModifyFile(modify) => {
            let text = result.text();
            modify.output = (!text.is_empty()).then_some(text);
            modify.error.clone_from(&result.error);
        }
        NormalizedPayload::CodeSearch(search) => {
            search.output = Some(search_output(result));
        }
        NormalizedPayload::HttpRequest(http) => {
            let text = result.text();
            http.response = (!text.is_empty()).then_some(text);
            http.error.clone_from(&result.error);
        }
        NormalizedPayload::SubagentTask(task) => {
            let text = result.text();
            task.output = Some(text).filter(|t| !t.is_empty()).or_else(|| result.error.clone());
        }
        NormalizedPayload::CreateTask(task) => {
            let text = result.text();
            task.output = Some(text).filter(|t| !t.is_empty()).or_else(|| result.error.clone());
        }
        NormalizedPayload::ManageTodos(todos) => {
            let items = result
                .output
                .as_ref()
                .and_then(|out| out.get("todos").or_else(|| out.get("plan")))
                .and_then(Value::as_array)
                .or_else(|| result.output.as_ref().and_then(Value::as_array));
            if let Some(items) = items {
                let parsed = parse_todos(items);
                if !parsed.is_empty() {
                    todos.todos = parsed;
                }
            }
        }
        NormalizedPayload::Generic(generic) => {
            generic.output = result
                .output
                .clone()
                .or_else(|| result.text.clone().map(Value::String))
                .or_else(|| result.error.clone().map(|e| serde_json::json!({ "error": e })));
        }
    }
}

fn search_output(result: &RawToolResult) -> SearchOutput {
    let structured = result.output.as_ref().and_then(|out| {
        out.get("filenames")
            .or_else(|| out.get("files"))
            .or_else(|| out.get("matches"))
            .and_then(Value::as_array)
            .or_else(|| out.as_array())
    });

    if let Some(items) = structured {
        let files: Vec<String> = items
            .iter()
            .filter_map(|item| match item {
                Value::String(path) => Some(path.clone()),
                other => first_str(other, &["path", "file", "filename"]),
            })
            .collect();
        if !files.is_empty() {
            return SearchOutput {
                file_count: files.len(),
                files,
                content: None,
                truncated: truncated_flag(result),
            };
        }
    }

    let text = result.text();
    let files: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('(') && !line.starts_with("Found "))
        .map(str::to_owned)
        .collect();
    SearchOutput {
        file_count: files.len(),
        files,
        content: (!text.is_empty()).then_some(text),
        truncated: truncated_flag(result),
    }
}

fn truncated_flag(result: &RawToolResult) -> bool {
    [result.output.as_ref(), result.metadata.as_ref()]
        .into_iter()
        .flatten()
        .any(|value| value.get("truncated").and_then(Value::as_bool) == Some(true))
}
