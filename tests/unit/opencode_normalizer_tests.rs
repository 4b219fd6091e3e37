//! Unit tests for OpenCode tool-call classification and result merging.

use serde_json::json;

use agent_switchboard::models::payload::{MutationType, NormalizedPayload};
use agent_switchboard::normalize::{
    OpenCodeNormalizer, RawToolResult, ToolIdentity, ToolNormalizer,
};

fn classify(name: &str, args: serde_json::Value) -> NormalizedPayload {
    OpenCodeNormalizer::new().normalize_tool_call(&ToolIdentity::named(name), &args)
}

#[test]
fn bash_with_workdir_and_description() {
    let payload = classify(
        "bash",
        json!({ "command": "npm test", "workdir": "/app", "description": "Run tests" }),
    );

    let NormalizedPayload::ShellExec(shell) = payload else {
        panic!("expected shell_exec");
    };
    assert_eq!(shell.command, "npm test");
    assert_eq!(shell.work_dir.as_deref(), Some("/app"));
    assert_eq!(shell.description.as_deref(), Some("Run tests"));
    assert!(!shell.background);
}

#[test]
fn camel_case_edit_arguments() {
    let payload = classify(
        "edit",
        json!({ "filePath": "/app/index.ts", "oldString": "foo()", "newString": "bar()" }),
    );

    let NormalizedPayload::ModifyFile(modify) = payload else {
        panic!("expected modify_file");
    };
    assert_eq!(modify.file_path, "/app/index.ts");
    assert_eq!(modify.language.as_deref(), Some("typescript"));
    assert_eq!(modify.mutations[0].mutation_type, MutationType::Patch);
}

#[test]
fn write_is_a_create() {
    let payload = classify("write", json!({ "filePath": "a.go", "content": "package a" }));

    let NormalizedPayload::ModifyFile(modify) = payload else {
        panic!("expected modify_file");
    };
    assert_eq!(modify.mutations[0].mutation_type, MutationType::Create);
    assert_eq!(modify.language.as_deref(), Some("go"));
}

#[test]
fn list_is_a_search_of_the_directory() {
    let payload = classify("list", json!({ "path": "/app/src" }));

    let NormalizedPayload::CodeSearch(search) = payload else {
        panic!("expected code_search");
    };
    assert_eq!(search.path.as_deref(), Some("/app/src"));
}

#[test]
fn todowrite_and_todoread() {
    let NormalizedPayload::ManageTodos(write) =
        classify("todowrite", json!({ "todos": [{ "content": "a", "status": "pending", "id": "1" }] }))
    else {
        panic!("expected manage_todos");
    };
    assert_eq!(write.operation, "write");
    assert_eq!(write.todos[0].id.as_deref(), Some("1"));

    let NormalizedPayload::ManageTodos(read) = classify("todoread", json!({})) else {
        panic!("expected manage_todos");
    };
    assert_eq!(read.operation, "read");
    assert!(read.todos.is_empty());
}

#[test]
fn unknown_tool_is_generic() {
    let payload = classify("lsp_hover", json!({ "line": 3 }));

    assert_eq!(payload.kind(), "generic");
}

#[test]
fn bash_result_uses_metadata_exit_code() {
    let normalizer = OpenCodeNormalizer::new();
    let mut payload = classify("bash", json!({ "command": "ls" }));

    normalizer.normalize_tool_result(
        &mut payload,
        &RawToolResult {
            output: Some(json!("a.txt\nb.txt\n")),
            metadata: Some(json!({ "exit": 0, "description": "list" })),
            ..RawToolResult::default()
        },
    );

    let NormalizedPayload::ShellExec(shell) = payload else {
        panic!("expected shell_exec");
    };
    let output = shell.output.expect("output");
    assert_eq!(output.stdout, "a.txt\nb.txt\n");
    assert_eq!(output.exit_code, Some(0));
}

#[test]
fn edit_result_prefers_applied_diff_from_metadata() {
    let normalizer = OpenCodeNormalizer::new();
    let mut payload = classify(
        "edit",
        json!({ "filePath": "a.rs", "oldString": "a", "newString": "b" }),
    );

    normalizer.normalize_tool_result(
        &mut payload,
        &RawToolResult {
            output: Some(json!("Edit applied")),
            metadata: Some(json!({ "diff": "--- a.rs\n+++ a.rs\n@@ -1 +1 @@\n-a\n+b\n" })),
            ..RawToolResult::default()
        },
    );

    let NormalizedPayload::ModifyFile(modify) = payload else {
        panic!("expected modify_file");
    };
    assert_eq!(modify.output.as_deref(), Some("Edit applied"));
    assert!(modify.mutations[0]
        .diff
        .as_deref()
        .expect("diff")
        .starts_with("--- a.rs\n"));
}

#[test]
fn failed_read_records_error() {
    let normalizer = OpenCodeNormalizer::new();
    let mut payload = classify("read", json!({ "filePath": "missing.txt" }));

    normalizer.normalize_tool_result(
        &mut payload,
        &RawToolResult {
            error: Some("File not found".into()),
            ..RawToolResult::default()
        },
    );

    let NormalizedPayload::ReadFile(read) = payload else {
        panic!("expected read_file");
    };
    assert_eq!(read.error.as_deref(), Some("File not found"));
    assert!(read.output.is_none());
}

#[test]
fn read_of_slash_terminated_lines_keeps_the_content() {
    let normalizer = OpenCodeNormalizer::new();
    let mut payload = classify("read", json!({ "filePath": "/app/.dockerignore" }));

    normalizer.normalize_tool_result(
        &mut payload,
        &RawToolResult {
            output: Some(json!("target/\ndist/\n")),
            ..RawToolResult::default()
        },
    );

    let NormalizedPayload::ReadFile(read) = payload else {
        panic!("expected read_file, got {payload:?}");
    };
    assert_eq!(read.output.expect("output").line_count, 2);
}
