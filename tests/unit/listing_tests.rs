//! Unit tests for directory-listing detection on read results.

use serde_json::json;

use agent_switchboard::normalize::listing::directory_entries;

#[test]
fn structured_listing_with_object_entries() {
    let raw = json!({
        "type": "directory",
        "entries": [{ "name": "a.rs" }, { "path": "b/" }, 7]
    });

    assert_eq!(
        directory_entries(Some(&raw), "", "/app"),
        Some(vec!["a.rs".to_owned(), "b/".to_owned()])
    );
}

#[test]
fn structured_listing_with_text_content() {
    let raw = json!({ "is_directory": true, "content": "x.txt\ny.txt\n" });

    assert_eq!(
        directory_entries(Some(&raw), "", "/app"),
        Some(vec!["x.txt".to_owned(), "y.txt".to_owned()])
    );
}

#[test]
fn xml_style_directory_text() {
    let text = "<directory path=\"/app\">\nsrc/\nCargo.toml\n</directory>";

    assert_eq!(
        directory_entries(None, text, "/app"),
        Some(vec!["src/".to_owned(), "Cargo.toml".to_owned()])
    );
}

#[test]
fn tree_style_listing_strips_decorations() {
    let text = "/app/\n  - src/\n  - README.md\n├── build.rs\n`-- *.md\n";

    assert_eq!(
        directory_entries(None, text, "/app"),
        Some(vec![
            "src/".to_owned(),
            "README.md".to_owned(),
            "build.rs".to_owned(),
            "*.md".to_owned(),
        ])
    );
}

#[test]
fn ls_long_format_keeps_names() {
    let text = "Directory: /app\ntotal 8\n\
drwxr-xr-x  2 user staff  64 Jan  1 10:00 src\n\
-rw-r--r--  1 user staff 120 Jan  1 10:00 Cargo.toml\n";

    assert_eq!(
        directory_entries(None, text, "/app"),
        Some(vec!["src".to_owned(), "Cargo.toml".to_owned()])
    );
}

#[test]
fn eisdir_error_counts_as_listing() {
    let text = "EISDIR: illegal operation on a directory\nmod.rs\n";

    assert_eq!(directory_entries(None, text, "/app"), Some(vec!["mod.rs".to_owned()]));
}

#[test]
fn regular_file_content_is_not_a_listing() {
    assert_eq!(directory_entries(None, "fn main() {}\n", "/app/main.rs"), None);
    assert_eq!(directory_entries(Some(&json!({ "content": "x" })), "x", "/app/x"), None);
    assert_eq!(directory_entries(None, "", "/app"), None);
}

#[test]
fn ignore_file_content_is_not_a_listing() {
    let text = "target/\nnode_modules/\n*.log\n";

    assert_eq!(directory_entries(None, text, "/repo/.gitignore"), None);
    assert_eq!(directory_entries(None, "target/\ndist/\n", "/repo/.dockerignore"), None);
}

#[test]
fn echoed_directory_must_match_the_requested_path() {
    let text = "src/\nlib.rs\n";

    assert_eq!(directory_entries(None, text, "/repo/src/notes.txt"), None);
    assert_eq!(
        directory_entries(None, text, "src"),
        Some(vec!["lib.rs".to_owned()])
    );
}
