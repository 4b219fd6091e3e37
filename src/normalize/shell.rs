//! Shell command result parsing.
//!
//! Agents report command output in many shapes. [`parse_shell_output`]
//! accepts all of them and never fails; anything it does not recognise is
//! rendered back to text and kept as stdout.
//!
//! | Shape | Example |
//! |---|---|
//! | plain string | `"hello\n"` |
//! | JSON text | `"{\"output\":\"hi\",\"exitCode\":0}"` |
//! | object | `{"stdout": "…", "stderr": "…", "exit_code": 1}` |
//! | content blocks | `[{"type":"text","text":"…"}, "…"]` |
//! | tagged text | `<return-code>0</return-code><output>…</output>` |

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::models::payload::ShellOutput;

static RETURN_CODE_TAG: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)<return-code>\s*(-?\d+)\s*</return-code>").ok());
static OUTPUT_TAG: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)<output>(.*?)</output>").ok());
static STDERR_TAG: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)<stderr>(.*?)</stderr>").ok());

const STDOUT_KEYS: &[&str] = &[
    "stdout",
    "output",
    "formatted_output",
    "aggregated_output",
    "text",
];
const STDERR_KEYS: &[&str] = &["stderr"];
const EXIT_CODE_KEYS: &[&str] = &["exitCode", "exit_code", "returnCode", "return_code", "code"];

/// Parse a raw shell result into stdout, stderr and exit code.
#[must_use]
pub fn parse_shell_output(raw: &Value) -> ShellOutput {
    match raw {
        Value::Null => ShellOutput::default(),
        Value::String(text) => parse_text(text),
        Value::Object(map) => parse_object(map),
        Value::Array(items) => parse_text(&concat_blocks(items)),
        other => ShellOutput {
            stdout: other.to_string(),
            ..ShellOutput::default()
        },
    }
}

fn parse_text(text: &str) -> ShellOutput {
    let trimmed = text.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        if let Ok(value @ (Value::Object(_) | Value::Array(_))) =
            serde_json::from_str::<Value>(trimmed)
        {
            return parse_shell_output(&value);
        }
    }

    if let Some(tagged) = parse_tagged(text) {
        return tagged;
    }

    ShellOutput {
        stdout: text.to_owned(),
        ..ShellOutput::default()
    }
}

/// Parse the `<return-code>`/`<output>`/`<stderr>` tag format.
fn parse_tagged(text: &str) -> Option<ShellOutput> {
    let capture = |re: &LazyLock<Option<Regex>>| -> Option<String> {
        re.as_ref()?
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim_matches('\n').to_owned())
    };

    let exit_code = capture(&RETURN_CODE_TAG).and_then(|code| code.trim().parse::<i32>().ok());
    let stdout = capture(&OUTPUT_TAG);
    let stderr = capture(&STDERR_TAG);

    if exit_code.is_none() && stdout.is_none() && stderr.is_none() {
        return None;
    }

    Some(ShellOutput {
        stdout: stdout.unwrap_or_default(),
        stderr: stderr.unwrap_or_default(),
        exit_code,
    })
}

fn parse_object(map: &Map<String, Value>) -> ShellOutput {
    // Some agents nest the real result one level down.
    if let Some(inner @ (Value::Object(_) | Value::Array(_))) =
        map.get("result").or_else(|| map.get("content"))
    {
        if !STDOUT_KEYS.iter().any(|key| map.contains_key(*key)) {
            let mut parsed = parse_shell_output(inner);
            if parsed.exit_code.is_none() {
                parsed.exit_code = exit_code_from(map);
            }
            return parsed;
        }
    }

    let stdout = STDOUT_KEYS
        .iter()
        .find_map(|key| map.get(*key))
        .map(value_to_text)
        .unwrap_or_default();
    let stderr = STDERR_KEYS
        .iter()
        .find_map(|key| map.get(*key))
        .map(value_to_text)
        .unwrap_or_default();

    // A bare `output` string may itself be tagged text.
    if stderr.is_empty() && exit_code_from(map).is_none() {
        if let Some(tagged) = parse_tagged(&stdout) {
            return tagged;
        }
    }

    ShellOutput {
        stdout,
        stderr,
        exit_code: exit_code_from(map),
    }
}

fn exit_code_from(map: &Map<String, Value>) -> Option<i32> {
    EXIT_CODE_KEYS
        .iter()
        .find_map(|key| map.get(*key))
        .or_else(|| map.get("metadata").and_then(|meta| meta.get("exit")))
        .and_then(|value| match value {
            Value::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
            Value::String(s) => s.trim().parse::<i32>().ok(),
            _ => None,
        })
}

/// Concatenate string and `{text}` blocks; other objects contribute their stdout.
fn concat_blocks(items: &[Value]) -> String {
    let mut out = String::new();
    for item in items {
        match item {
            Value::String(text) => out.push_str(text),
            Value::Object(map) => {
                if let Some(text) = map.get("text").and_then(Value::as_str) {
                    out.push_str(text);
                } else if let Some(text) = map
                    .get("content")
                    .and_then(|content| content.get("text"))
                    .and_then(Value::as_str)
                {
                    out.push_str(text);
                } else {
                    let parsed = parse_object(map);
                    out.push_str(&parsed.stdout);
                }
            }
            Value::Null => {}
            other => out.push_str(&other.to_string()),
        }
    }
    out
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        Value::Array(items) => concat_blocks(items),
        other => other.to_string(),
    }
}
