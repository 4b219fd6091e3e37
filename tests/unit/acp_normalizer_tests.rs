//! Unit tests for ACP tool-call classification and result merging.

use serde_json::json;

use agent_switchboard::models::payload::{MutationType, NormalizedPayload, ToolStatus};
use agent_switchboard::normalize::{
    normalize_status, AcpNormalizer, RawToolResult, ToolIdentity, ToolNormalizer,
};

fn classify(name: &str, kind: Option<&str>, args: serde_json::Value) -> NormalizedPayload {
    let tool = ToolIdentity {
        name,
        kind,
        location: None,
    };
    AcpNormalizer::new().normalize_tool_call(&tool, &args)
}

// ── Classification ───────────────────────────────────────────────────────────

#[test]
fn explicit_execute_kind_wins_over_name() {
    let payload = classify("Run the tests", Some("execute"), json!({ "command": "cargo test" }));

    let NormalizedPayload::ShellExec(shell) = payload else {
        panic!("expected shell_exec, got {payload:?}");
    };
    assert_eq!(shell.command, "cargo test");
}

#[test]
fn argv_commands_collapse_to_the_script() {
    let payload = classify(
        "exec_command",
        None,
        json!({ "cmd": ["bash", "-lc", "ls -la"], "workdir": "/tmp", "timeout_ms": 5000 }),
    );

    let NormalizedPayload::ShellExec(shell) = payload else {
        panic!("expected shell_exec");
    };
    assert_eq!(shell.command, "ls -la");
    assert_eq!(shell.work_dir.as_deref(), Some("/tmp"));
    assert_eq!(shell.timeout, Some(5000));
}

#[test]
fn mcp_prefixed_read_is_a_file_read() {
    let payload = classify(
        "mcp__acp__Read",
        Some("other"),
        json!({ "file_path": "src/main.rs", "offset": 10, "limit": 20 }),
    );

    let NormalizedPayload::ReadFile(read) = payload else {
        panic!("expected read_file");
    };
    assert_eq!(read.file_path, "src/main.rs");
    assert_eq!(read.language.as_deref(), Some("rust"));
    assert_eq!(read.offset, Some(10));
    assert_eq!(read.limit, Some(20));
}

#[test]
fn read_falls_back_to_reported_location() {
    let tool = ToolIdentity {
        name: "Read",
        kind: Some("read"),
        location: Some("/repo/README.md"),
    };
    let payload = AcpNormalizer::new().normalize_tool_call(&tool, &json!({}));

    let NormalizedPayload::ReadFile(read) = payload else {
        panic!("expected read_file");
    };
    assert_eq!(read.file_path, "/repo/README.md");
    assert_eq!(read.language.as_deref(), Some("markdown"));
}

#[test]
fn write_with_content_is_a_create_mutation() {
    let payload = classify(
        "Write",
        Some("edit"),
        json!({ "file_path": "notes.txt", "content": "hello" }),
    );

    let NormalizedPayload::ModifyFile(modify) = payload else {
        panic!("expected modify_file");
    };
    assert_eq!(modify.mutations.len(), 1);
    assert_eq!(modify.mutations[0].mutation_type, MutationType::Create);
    assert_eq!(modify.mutations[0].content.as_deref(), Some("hello"));
}

#[test]
fn string_replacement_is_a_patch_with_diff() {
    let payload = classify(
        "Edit",
        Some("edit"),
        json!({ "file_path": "src/lib.rs", "old_string": "let a = 1;", "new_string": "let a = 2;" }),
    );

    let NormalizedPayload::ModifyFile(modify) = payload else {
        panic!("expected modify_file");
    };
    let mutation = &modify.mutations[0];
    assert_eq!(mutation.mutation_type, MutationType::Patch);
    assert_eq!(mutation.old_content.as_deref(), Some("let a = 1;"));
    assert_eq!(mutation.new_content.as_deref(), Some("let a = 2;"));
    let diff = mutation.diff.as_deref().expect("diff");
    assert!(diff.contains("-let a = 1;"));
    assert!(diff.contains("+let a = 2;"));
}

#[test]
fn multiedit_produces_one_patch_per_edit() {
    let payload = classify(
        "MultiEdit",
        None,
        json!({
            "file_path": "a.py",
            "edits": [
                { "old_string": "x = 1", "new_string": "x = 2" },
                { "old_string": "y = 1", "new_string": "y = 2" }
            ]
        }),
    );

    let NormalizedPayload::ModifyFile(modify) = payload else {
        panic!("expected modify_file");
    };
    assert_eq!(modify.mutations.len(), 2);
    assert_eq!(modify.language.as_deref(), Some("python"));
}

#[test]
fn glob_pattern_is_recorded_as_glob() {
    let payload = classify("Glob", Some("search"), json!({ "pattern": "**/*.rs", "path": "src" }));

    let NormalizedPayload::CodeSearch(search) = payload else {
        panic!("expected code_search");
    };
    assert_eq!(search.glob.as_deref(), Some("**/*.rs"));
    assert!(search.pattern.is_none());
    assert_eq!(search.path.as_deref(), Some("src"));
}

#[test]
fn grep_pattern_is_recorded_as_pattern() {
    let payload = classify("Grep", Some("search"), json!({ "pattern": "fn main", "glob": "*.rs" }));

    let NormalizedPayload::CodeSearch(search) = payload else {
        panic!("expected code_search");
    };
    assert_eq!(search.pattern.as_deref(), Some("fn main"));
    assert_eq!(search.glob.as_deref(), Some("*.rs"));
}

#[test]
fn todo_write_lists_items() {
    let payload = classify(
        "TodoWrite",
        None,
        json!({ "todos": [
            { "content": "write tests", "status": "in_progress" },
            { "content": "ship", "status": "pending", "priority": "high" }
        ] }),
    );

    let NormalizedPayload::ManageTodos(todos) = payload else {
        panic!("expected manage_todos");
    };
    assert_eq!(todos.operation, "write");
    assert_eq!(todos.todos.len(), 2);
    assert_eq!(todos.todos[1].priority.as_deref(), Some("high"));
}

#[test]
fn task_is_a_subagent() {
    let payload = classify(
        "Task",
        Some("think"),
        json!({ "description": "Find callers", "prompt": "search", "subagent_type": "explore" }),
    );

    let NormalizedPayload::SubagentTask(task) = payload else {
        panic!("expected subagent_task");
    };
    assert_eq!(task.description, "Find callers");
    assert_eq!(task.subagent_type.as_deref(), Some("explore"));
}

#[test]
fn fetch_uppercases_method() {
    let payload = classify("WebFetch", Some("fetch"), json!({ "url": "https://x.dev", "method": "post" }));

    let NormalizedPayload::HttpRequest(http) = payload else {
        panic!("expected http_request");
    };
    assert_eq!(http.url, "https://x.dev");
    assert_eq!(http.method, "POST");
}

#[test]
fn unknown_tools_are_generic_and_keep_arguments() {
    let args = json!({ "anything": [1, 2, 3] });
    let payload = classify("frobnicate", Some("other"), args.clone());

    let NormalizedPayload::Generic(generic) = payload else {
        panic!("expected generic");
    };
    assert_eq!(generic.name, "frobnicate");
    assert_eq!(generic.input, args);
}

// ── Results ──────────────────────────────────────────────────────────────────

#[test]
fn shell_result_parses_structured_output() {
    let normalizer = AcpNormalizer::new();
    let mut payload = classify("Bash", Some("execute"), json!({ "command": "false" }));

    normalizer.normalize_tool_result(
        &mut payload,
        &RawToolResult {
            output: Some(json!({ "stdout": "", "stderr": "boom", "exit_code": 1 })),
            ..RawToolResult::default()
        },
    );

    let NormalizedPayload::ShellExec(shell) = payload else {
        panic!("expected shell_exec");
    };
    let output = shell.output.expect("output");
    assert_eq!(output.stderr, "boom");
    assert_eq!(output.exit_code, Some(1));
}

#[test]
fn directory_read_is_reclassified_as_search() {
    let normalizer = AcpNormalizer::new();
    let mut payload = classify("Read", Some("read"), json!({ "file_path": "src" }));

    normalizer.normalize_tool_result(
        &mut payload,
        &RawToolResult {
            output: Some(json!({
                "isDirectory": true,
                "entries": ["lib.rs", "main.rs", "acp/"]
            })),
            ..RawToolResult::default()
        },
    );

    let NormalizedPayload::CodeSearch(search) = payload else {
        panic!("expected read to become code_search, got {payload:?}");
    };
    assert_eq!(search.path.as_deref(), Some("src"));
    let output = search.output.expect("output");
    assert_eq!(output.file_count, 3);
    assert_eq!(output.files, vec!["lib.rs", "main.rs", "acp/"]);
}

#[test]
fn ignore_file_read_stays_a_read() {
    let normalizer = AcpNormalizer::new();
    let mut payload = classify("Read", Some("read"), json!({ "file_path": "/repo/.gitignore" }));

    normalizer.normalize_tool_result(
        &mut payload,
        &RawToolResult {
            text: Some("target/\nnode_modules/\n*.log\n".into()),
            ..RawToolResult::default()
        },
    );

    let NormalizedPayload::ReadFile(read) = payload else {
        panic!("expected read_file, got {payload:?}");
    };
    let output = read.output.expect("output");
    assert!(output.content.contains("*.log"));
    assert_eq!(output.line_count, 3);
}

#[test]
fn file_read_result_counts_lines() {
    let normalizer = AcpNormalizer::new();
    let mut payload = classify("Read", Some("read"), json!({ "file_path": "a.txt" }));

    normalizer.normalize_tool_result(
        &mut payload,
        &RawToolResult {
            text: Some("one\ntwo\nthree".into()),
            ..RawToolResult::default()
        },
    );

    let NormalizedPayload::ReadFile(read) = payload else {
        panic!("expected read_file");
    };
    let output = read.output.expect("output");
    assert_eq!(output.line_count, 3);
    assert!(!output.truncated);
}

#[test]
fn search_text_result_lists_files() {
    let normalizer = AcpNormalizer::new();
    let mut payload = classify("Grep", Some("search"), json!({ "pattern": "todo" }));

    normalizer.normalize_tool_result(
        &mut payload,
        &RawToolResult {
            text: Some("Found 2 files\nsrc/a.rs\nsrc/b.rs\n".into()),
            ..RawToolResult::default()
        },
    );

    let NormalizedPayload::CodeSearch(search) = payload else {
        panic!("expected code_search");
    };
    let output = search.output.expect("output");
    assert_eq!(output.files, vec!["src/a.rs", "src/b.rs"]);
    assert_eq!(output.file_count, 2);
}

#[test]
fn generic_result_keeps_raw_output() {
    let normalizer = AcpNormalizer::new();
    let mut payload = classify("frobnicate", None, json!({}));

    normalizer.normalize_tool_result(
        &mut payload,
        &RawToolResult {
            output: Some(json!({ "ok": true })),
            ..RawToolResult::default()
        },
    );

    let NormalizedPayload::Generic(generic) = payload else {
        panic!("expected generic");
    };
    assert_eq!(generic.output, Some(json!({ "ok": true })));
}

#[test]
fn empty_result_leaves_payload_untouched() {
    let normalizer = AcpNormalizer::new();
    let mut payload = classify("Bash", Some("execute"), json!({ "command": "ls" }));
    let before = payload.clone();

    normalizer.normalize_tool_result(&mut payload, &RawToolResult::default());

    assert_eq!(payload, before);
}

// ── Status vocabulary ────────────────────────────────────────────────────────

#[test]
fn acp_status_strings_normalise() {
    assert_eq!(normalize_status("pending"), ToolStatus::Pending);
    assert_eq!(normalize_status("in_progress"), ToolStatus::Running);
    assert_eq!(normalize_status("completed"), ToolStatus::Complete);
    assert_eq!(normalize_status("failed"), ToolStatus::Error);
    assert!(ToolStatus::Cancelled.is_terminal());
    assert!(!ToolStatus::PendingPermission.is_terminal());
}
