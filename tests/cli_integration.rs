//! Integration tests for the CLI
//!
//! Tests the apply, map and batch commands against the built binary

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const TEXT: &str = "ABCDEFGHIJ";

const CHANGES: &str = r#"[meta]
document_id = "doc-1"

[[changes]]
begin = 3
end = 6
operation = "cut"

[[changes]]
begin = 4
end = 4
operation = "insert"
value = "XYZ"

[[changes]]
begin = 0
end = 0
operation = "insert"
value = "XY"
"#;

/// Helper to create a directory with one document and its change set
fn setup_document() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("doc.txt"), TEXT).unwrap();
    fs::write(dir.path().join("doc.changes.toml"), CHANGES).unwrap();
    dir
}

fn edit_align(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_edit-align"))
        .args(args)
        .env_remove("EDIT_ALIGN_LOG")
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_apply_help() {
    let output = edit_align(&["apply", "--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--changes"));
    assert!(stdout.contains("--output"));
}

#[test]
fn test_apply_prints_transformed_text() {
    let dir = setup_document();
    let input = dir.path().join("doc.txt");
    let changes = dir.path().join("doc.changes.toml");

    let output = edit_align(&["apply", "-i", path_str(&input), "-c", path_str(&changes)]);

    assert!(output.status.success(), "{:?}", output);
    assert_eq!(String::from_utf8_lossy(&output.stdout), "XYABCGHIJ");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("2 applied"));
    assert!(stderr.contains("1 discarded"));
}

#[test]
fn test_apply_writes_output_file() {
    let dir = setup_document();
    let input = dir.path().join("doc.txt");
    let changes = dir.path().join("doc.changes.toml");
    let target = dir.path().join("out.txt");

    let output = edit_align(&[
        "apply",
        "-i",
        path_str(&input),
        "-c",
        path_str(&changes),
        "-o",
        path_str(&target),
    ]);

    assert!(output.status.success(), "{:?}", output);
    assert!(output.stdout.is_empty());
    assert_eq!(fs::read_to_string(&target).unwrap(), "XYABCGHIJ");
    // Source untouched
    assert_eq!(fs::read_to_string(&input).unwrap(), TEXT);
}

#[test]
fn test_apply_json_report() {
    let dir = setup_document();
    let input = dir.path().join("doc.txt");
    let changes = dir.path().join("doc.changes.toml");

    let output = edit_align(&[
        "apply",
        "-i",
        path_str(&input),
        "-c",
        path_str(&changes),
        "--json",
    ]);

    assert!(output.status.success(), "{:?}", output);
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["document"], "doc-1");
    assert_eq!(report["text"], "XYABCGHIJ");
    assert_eq!(report["applied"].as_array().unwrap().len(), 2);
    assert_eq!(report["discarded"][0]["operation"], "insert");
    assert_eq!(report["chunks"][0]["type"], "inserted");
    assert_eq!(report["chunks"][1]["range"]["end"], 3);
}

#[test]
fn test_apply_shows_inline_diff() {
    let dir = setup_document();
    let input = dir.path().join("doc.txt");
    let changes = dir.path().join("doc.changes.toml");

    let output = edit_align(&[
        "apply",
        "-i",
        path_str(&input),
        "-c",
        path_str(&changes),
        "--diff",
    ]);

    assert!(output.status.success(), "{:?}", output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("edits in"));
    assert!(stdout.contains("2 bytes inserted, 3 bytes removed"));
}

#[test]
fn test_apply_rejects_hash_mismatch() {
    let dir = setup_document();
    let input = dir.path().join("doc.txt");
    let changes = dir.path().join("doc.changes.toml");
    fs::write(
        &changes,
        "[meta]\nexpected_hash = \"0000000000000000\"\n",
    )
    .unwrap();

    let output = edit_align(&["apply", "-i", path_str(&input), "-c", path_str(&changes)]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("hash mismatch"));
}

#[test]
fn test_map_to_original() {
    let dir = setup_document();
    let input = dir.path().join("doc.txt");
    let changes = dir.path().join("doc.changes.toml");

    // "GH" in "XYABCGHIJ"
    let output = edit_align(&[
        "map",
        "-i",
        path_str(&input),
        "-c",
        path_str(&changes),
        "--begin",
        "5",
        "--end",
        "7",
    ]);

    assert!(output.status.success(), "{:?}", output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[5, 7) -> [6, 8)"));
    assert!(stdout.contains("\"GH\" -> \"GH\""));
}

#[test]
fn test_map_to_current() {
    let dir = setup_document();
    let input = dir.path().join("doc.txt");
    let changes = dir.path().join("doc.changes.toml");

    let output = edit_align(&[
        "map",
        "-i",
        path_str(&input),
        "-c",
        path_str(&changes),
        "--begin",
        "0",
        "--end",
        "2",
        "--to",
        "current",
    ]);

    assert!(output.status.success(), "{:?}", output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[0, 2) -> [2, 4)"));
}

#[test]
fn test_batch_processes_directory() {
    let dir = setup_document();
    fs::write(dir.path().join("other.txt"), "hello world").unwrap();
    fs::write(
        dir.path().join("other.changes.toml"),
        "[[changes]]\nbegin = 0\nend = 5\noperation = \"replace\"\nvalue = \"goodbye\"\n",
    )
    .unwrap();
    // No change set: ignored
    fs::write(dir.path().join("lonely.txt"), "unchanged").unwrap();

    let output = edit_align(&["batch", "-d", path_str(dir.path()), "-j", "2"]);

    assert!(output.status.success(), "{:?}", output);
    assert_eq!(
        fs::read_to_string(dir.path().join("doc.out.txt")).unwrap(),
        "XYABCGHIJ"
    );
    assert_eq!(
        fs::read_to_string(dir.path().join("other.out.txt")).unwrap(),
        "goodbye world"
    );
    assert!(!dir.path().join("lonely.out.txt").exists());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("2 alignments registered"));
}

#[test]
fn test_batch_identical_documents_without_ids() {
    let dir = TempDir::new().unwrap();
    let changes = "[[changes]]\nbegin = 0\nend = 0\noperation = \"insert\"\nvalue = \"> \"\n";
    for name in ["a", "b"] {
        fs::write(dir.path().join(format!("{name}.txt")), "same text").unwrap();
        fs::write(dir.path().join(format!("{name}.changes.toml")), changes).unwrap();
    }

    let output = edit_align(&["batch", "-d", path_str(dir.path())]);

    assert!(output.status.success(), "{:?}", output);
    for name in ["a", "b"] {
        assert_eq!(
            fs::read_to_string(dir.path().join(format!("{name}.out.txt"))).unwrap(),
            "> same text"
        );
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("2 alignments registered"));
}

#[test]
fn test_batch_empty_directory_fails() {
    let dir = TempDir::new().unwrap();
    let output = edit_align(&["batch", "-d", path_str(dir.path())]);
    assert!(!output.status.success());
}
