//! Coarse unified-diff synthesis for string-replacement edits.
//!
//! The diff is a single hunk: every old line removed, then every new line
//! added. It is not a minimal diff, only a renderable one.

use std::fmt::Write as _;

/// Build a unified diff turning `old` into `new` at `start_line` (1-based,
/// `0` is treated as `1`).
///
/// Returns an empty string when either side is empty or both are identical;
/// callers treat that as "nothing to show".
#[must_use]
pub fn generate_unified_diff(old: &str, new: &str, path: &str, start_line: u32) -> String {
    if old.is_empty() || new.is_empty() || old == new {
        return String::new();
    }

    let old_lines: Vec<&str> = old.lines().collect();
    let new_lines: Vec<&str> = new.lines().collect();
    let start = start_line.max(1);
    let path = path.trim_start_matches('/');

    let mut out = String::new();
    let _ = writeln!(out, "--- a/{path}");
    let _ = writeln!(out, "+++ b/{path}");
    let _ = writeln!(
        out,
        "@@ -{start},{} +{start},{} @@",
        old_lines.len(),
        new_lines.len()
    );
    for line in &old_lines {
        let _ = writeln!(out, "-{line}");
    }
    for line in &new_lines {
        let _ = writeln!(out, "+{line}");
    }
    out
}
