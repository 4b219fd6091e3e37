//! Detection of directory listings returned by file-read tools.
//!
//! Agents sometimes answer a read of a directory path with the directory
//! contents. Those results are re-classified as searches so consumers do
//! not render a file list as file content.

use serde_json::Value;

const ENTRY_KEYS: &[&str] = &["directoryEntries", "directory_entries", "entries"];
const IS_DIRECTORY_KEYS: &[&str] = &["isDirectory", "is_directory", "isDir"];

/// Extract the entries of a directory listing, if `raw` (or its text
/// rendering `text`) is one. `path` is the path the read asked for.
///
/// Structured results are checked first (`isDirectory: true` with an
/// entries array); otherwise the text must open with a listing header or
/// with `path` itself followed by a trailing `/`. Plain file content never
/// qualifies, even when its lines end with `/`.
#[must_use]
pub fn directory_entries(raw: Option<&Value>, text: &str, path: &str) -> Option<Vec<String>> {
    if let Some(entries) = raw.and_then(|raw| structured_entries(raw, path)) {
        return Some(entries);
    }

    if looks_like_listing(text, path) {
        return Some(entries_from_text(text, path));
    }

    None
}

fn structured_entries(raw: &Value, path: &str) -> Option<Vec<String>> {
    let map = raw.as_object()?;
    let flagged = IS_DIRECTORY_KEYS
        .iter()
        .any(|key| map.get(*key).and_then(Value::as_bool) == Some(true))
        || map.get("type").and_then(Value::as_str) == Some("directory");
    if !flagged {
        return None;
    }

    let entries = ENTRY_KEYS.iter().find_map(|key| map.get(*key));
    match entries {
        Some(Value::Array(items)) => Some(
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(name) => Some(name.clone()),
                    Value::Object(entry) => entry
                        .get("name")
                        .or_else(|| entry.get("path"))
                        .and_then(Value::as_str)
                        .map(str::to_owned),
                    _ => None,
                })
                .collect(),
        ),
        Some(Value::String(text)) => Some(entries_from_text(text, path)),
        _ => {
            let text = map
                .get("content")
                .or_else(|| map.get("output"))
                .and_then(Value::as_str)
                .unwrap_or_default();
            Some(entries_from_text(text, path))
        }
    }
}

fn looks_like_listing(text: &str, path: &str) -> bool {
    let Some(first) = text.lines().map(str::trim).find(|line| !line.is_empty()) else {
        return false;
    };

    first.starts_with("<directory")
        || first.starts_with("Directory:")
        || first.starts_with("Directory listing")
        || first.starts_with("Contents of ")
        || first.contains("EISDIR")
        || (names_directory(first, path) && text.lines().count() > 1)
}

/// `line` is the requested directory echoed back as `<path>/`.
fn names_directory(line: &str, path: &str) -> bool {
    let path = path.trim_end_matches('/');
    !path.is_empty() && line.ends_with('/') && line.trim_end_matches('/') == path
}

/// Strip tree-drawing prefixes (`├── `, `|-- `, `- `, `* `) from an entry.
fn strip_tree_marker(line: &str) -> &str {
    let rest = line.trim_start_matches(['├', '└', '─', '│', ' ']);
    for marker in ["|-- ", "`-- ", "-- ", "- ", "* "] {
        if let Some(name) = rest.strip_prefix(marker) {
            return name.trim_start();
        }
    }
    rest
}

/// Non-path lines found in listing output.
fn is_header_line(line: &str) -> bool {
    line.starts_with("<directory")
        || line.starts_with("</directory")
        || line.starts_with("Directory:")
        || line.starts_with("Directory listing")
        || line.starts_with("Contents of ")
        || line.starts_with("total ")
        || line.contains("EISDIR")
        || (line.starts_with('(') && line.ends_with(')'))
        || line.ends_with(':')
}

fn entries_from_text(text: &str, path: &str) -> Vec<String> {
    let mut lines = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .peekable();

    if lines.peek().is_some_and(|first| names_directory(first, path)) {
        lines.next();
    }

    lines
        .filter(|line| !is_header_line(line))
        .map(|line| {
            // `ls -l` style rows keep the name in the last column.
            if line.starts_with(['d', '-', 'l']) && line.split_whitespace().count() >= 9 {
                return line.split_whitespace().last().unwrap_or(line).to_owned();
            }
            strip_tree_marker(line).to_owned()
        })
        .filter(|line| !line.is_empty())
        .collect()
}
