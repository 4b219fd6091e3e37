//! Normalizer for the OpenCode tool vocabulary.

use serde_json::Value;

use super::{
    build_create_task, build_delete, build_edit, build_fetch, build_move, build_read,
    build_search, build_shell, build_subagent, build_todos, merge_result, FieldAliases,
    RawToolResult, ToolIdentity, ToolNormalizer,
};
use crate::models::payload::{MutationType, NormalizedPayload};

const OPENCODE_ALIASES: FieldAliases = FieldAliases {
    path: &["filePath", "file_path", "path"],
    command: &["command", "cmd"],
    work_dir: &["workdir", "cwd", "work_dir"],
    old_text: &["oldString", "old_string", "oldText"],
    new_text: &["newString", "new_string", "newText"],
    content: &["content", "file_content"],
};

/// [`ToolNormalizer`] for OpenCode agents.
///
/// OpenCode names tools with short lowercase identifiers and sends no kind
/// discriminator, so classification is by name alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenCodeNormalizer;

impl OpenCodeNormalizer {
    /// Create a normalizer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ToolNormalizer for OpenCodeNormalizer {
    fn normalize_tool_call(&self, tool: &ToolIdentity<'_>, args: &Value) -> NormalizedPayload {
        let name = tool.name.trim().to_ascii_lowercase();
        let location = tool.location;
        match name.as_str() {
            "read" | "view" => build_read(args, &OPENCODE_ALIASES, location),
            "write" | "edit" | "multiedit" | "patch" => {
                build_edit(args, &OPENCODE_ALIASES, location)
            }
            "delete" | "rm" => build_delete(args, &OPENCODE_ALIASES, location),
            "move" | "mv" => build_move(args, &OPENCODE_ALIASES, location),
            "grep" | "search" | "codesearch" | "list" | "ls" => {
                build_search(args, location, false)
            }
            "glob" => build_search(args, location, true),
            "bash" | "run" | "shell" => build_shell(args, &OPENCODE_ALIASES),
            "webfetch" | "fetch" | "websearch" => build_fetch(args),
            "task" | "agent" => build_subagent(args),
            "todowrite" | "todoread" => build_todos(args),
            "taskcreate" | "create_task" => build_create_task(args),
            _ => NormalizedPayload::generic(tool.name, args.clone()),
        }
    }

    fn normalize_tool_result(&self, payload: &mut NormalizedPayload, result: &RawToolResult) {
        merge_result(payload, result);

        // Edits report the applied diff in metadata; prefer it over the
        // synthesized one.
        if let NormalizedPayload::ModifyFile(modify) = payload {
            let applied = result
                .metadata
                .as_ref()
                .and_then(|meta| meta.get("diff"))
                .and_then(Value::as_str)
                .filter(|diff| !diff.is_empty());
            if let Some(diff) = applied {
                if let Some(patch) = modify
                    .mutations
                    .iter_mut()
                    .find(|m| m.mutation_type == MutationType::Patch)
                {
                    patch.diff = Some(diff.to_owned());
                }
            }
        }
    }
}
