//! Normalizer for agents speaking the Agent Client Protocol.
//!
//! ACP tool calls carry an explicit `kind` discriminator (`read`, `edit`,
//! `execute`, …) which wins when present. Tools reported as `think` or
//! `other`, or without a kind, fall back to the alias table keyed on the
//! tool name. Argument names follow Claude-style spelling first
//! (`file_path`, `command`, `old_string`) and Codex/OpenCode spelling
//! second.

use serde_json::Value;

use super::{
    build_create_task, build_delete, build_edit, build_fetch, build_move, build_read,
    build_search, build_shell, build_subagent, build_todos, merge_result, FieldAliases,
    RawToolResult, ToolIdentity, ToolNormalizer,
};
use crate::models::payload::NormalizedPayload;

const ACP_ALIASES: FieldAliases = FieldAliases {
    path: &["file_path", "path", "filePath", "notebook_path", "abs_path"],
    command: &["command", "cmd"],
    work_dir: &["cwd", "workdir", "work_dir"],
    old_text: &["old_string", "oldText", "old_str", "oldString"],
    new_text: &["new_string", "newText", "new_str", "newString"],
    content: &["content", "file_content", "file_text"],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Read,
    Edit,
    Delete,
    Move,
    Search,
    Glob,
    Execute,
    Fetch,
    Subagent,
    Todos,
    CreateTask,
}

const NAME_ALIASES: &[(&str, Category)] = &[
    ("read", Category::Read),
    ("view", Category::Read),
    ("read_file", Category::Read),
    ("cat", Category::Read),
    ("edit", Category::Edit),
    ("multiedit", Category::Edit),
    ("write", Category::Edit),
    ("write_file", Category::Edit),
    ("create", Category::Edit),
    ("str_replace", Category::Edit),
    ("str_replace_editor", Category::Edit),
    ("apply_patch", Category::Edit),
    ("notebookedit", Category::Edit),
    ("delete", Category::Delete),
    ("rm", Category::Delete),
    ("move", Category::Move),
    ("mv", Category::Move),
    ("rename", Category::Move),
    ("grep", Category::Search),
    ("rg", Category::Search),
    ("search", Category::Search),
    ("codebase_search", Category::Search),
    ("ls", Category::Search),
    ("list", Category::Search),
    ("find", Category::Glob),
    ("glob", Category::Glob),
    ("bash", Category::Execute),
    ("run", Category::Execute),
    ("shell", Category::Execute),
    ("exec", Category::Execute),
    ("exec_command", Category::Execute),
    ("local_shell", Category::Execute),
    ("terminal", Category::Execute),
    ("fetch", Category::Fetch),
    ("webfetch", Category::Fetch),
    ("web_fetch", Category::Fetch),
    ("websearch", Category::Fetch),
    ("web_search", Category::Fetch),
    ("task", Category::Subagent),
    ("agent", Category::Subagent),
    ("todowrite", Category::Todos),
    ("todo_write", Category::Todos),
    ("todoread", Category::Todos),
    ("update_plan", Category::Todos),
    ("taskcreate", Category::CreateTask),
    ("task_create", Category::CreateTask),
    ("create_task", Category::CreateTask),
];

/// [`ToolNormalizer`] for ACP agents.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcpNormalizer;

impl AcpNormalizer {
    /// Create a normalizer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// Strip MCP-style prefixes (`mcp__acp__Read` → `read`) and lowercase.
fn canonical_name(name: &str) -> String {
    name.rsplit("__").next().unwrap_or(name).trim().to_ascii_lowercase()
}

fn category_for_kind(kind: &str, name: &str) -> Option<Category> {
    match kind {
        "read" => Some(Category::Read),
        "edit" => Some(Category::Edit),
        "delete" => Some(Category::Delete),
        "move" => Some(Category::Move),
        "search" if matches!(name, "glob" | "find") => Some(Category::Glob),
        "search" => Some(Category::Search),
        "execute" => Some(Category::Execute),
        "fetch" => Some(Category::Fetch),
        _ => None,
    }
}

fn category_for_name(name: &str) -> Option<Category> {
    NAME_ALIASES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map(|(_, category)| *category)
}

impl ToolNormalizer for AcpNormalizer {
    fn normalize_tool_call(&self, tool: &ToolIdentity<'_>, args: &Value) -> NormalizedPayload {
        let name = canonical_name(tool.name);
        let category = tool
            .kind
            .and_then(|kind| category_for_kind(kind, &name))
            .or_else(|| category_for_name(&name));

        let location = tool.location;
        match category {
            Some(Category::Read) => build_read(args, &ACP_ALIASES, location),
            Some(Category::Edit) => build_edit(args, &ACP_ALIASES, location),
            Some(Category::Delete) => build_delete(args, &ACP_ALIASES, location),
            Some(Category::Move) => build_move(args, &ACP_ALIASES, location),
            Some(Category::Search) => build_search(args, location, false),
            Some(Category::Glob) => build_search(args, location, true),
            Some(Category::Execute) => build_shell(args, &ACP_ALIASES),
            Some(Category::Fetch) => build_fetch(args),
            Some(Category::Subagent) => build_subagent(args),
            Some(Category::Todos) => build_todos(args),
            Some(Category::CreateTask) => build_create_task(args),
            None => NormalizedPayload::generic(tool.name, args.clone()),
        }
    }

    fn normalize_tool_result(&self, payload: &mut NormalizedPayload, result: &RawToolResult) {
        merge_result(payload, result);
    }
}
