//! Integration tests for the rustlog-store CLI
//!
//! These run the built binary against store files on disk and check:
//! - stat reports valid and torn bytes for a file with a torn tail
//! - append followed by read round-trips through the JSON output
//! - errors come back as JSON with a non-zero exit code

use rustlog_store::storage::frame;
use rustlog_store::Store;
use serde_json::Value;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Run the CLI with `args` and parse its stdout as JSON.
fn run_cli(args: &[&str]) -> (Output, Value) {
    let output = Command::new(env!("CARGO_BIN_EXE_rustlog-store"))
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .expect("failed to run rustlog-store");

    let json = serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "stdout is not JSON ({}): {}",
            e,
            String::from_utf8_lossy(&output.stdout)
        )
    });
    (output, json)
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("temp path is not UTF-8")
}

#[test]
fn test_stat_reports_torn_tail() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("torn.store");

    let store = Store::open_path(&path).unwrap();
    store.append(b"first").unwrap();
    store.append(b"hello world").unwrap();
    store.close().unwrap();

    // Crash mid-append: prefix plus 4 of 11 payload bytes
    let torn = frame::encode_frame(b"never done!");
    let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(&torn[..12]).unwrap();
    drop(file);

    let (output, stat) = run_cli(&["stat", path_str(&path)]);
    assert!(output.status.success());

    assert_eq!(stat["size"], 13 + 19 + 12);
    assert_eq!(stat["frames"], 2);
    assert_eq!(stat["valid_bytes"], 13 + 19);
    assert_eq!(stat["torn_bytes"], 12);
    assert!(stat["corruption"].is_string());
}

#[test]
fn test_stat_clean_file_has_no_corruption() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("clean.store");

    let store = Store::open_path(&path).unwrap();
    store.append(b"hello world").unwrap();
    store.close().unwrap();

    let (output, stat) = run_cli(&["stat", path_str(&path)]);
    assert!(output.status.success());

    assert_eq!(stat["frames"], 1);
    assert_eq!(stat["valid_bytes"], 19);
    assert_eq!(stat["torn_bytes"], 0);
    assert!(stat["corruption"].is_null());
}

#[test]
fn test_append_then_read() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cli.store");

    let (output, first) = run_cli(&["append", path_str(&path), "hello world"]);
    assert!(output.status.success());
    assert_eq!(first["status"], "success");
    assert_eq!(first["offset"], 0);
    assert_eq!(first["width"], 19);

    let (_, second) = run_cli(&["append", path_str(&path), "again"]);
    assert_eq!(second["offset"], 19);

    let (output, read) = run_cli(&["read", path_str(&path), "19"]);
    assert!(output.status.success());
    assert_eq!(read["length"], 5);
    assert_eq!(read["payload"], "again");

    let (_, dump) = run_cli(&["dump", path_str(&path)]);
    let frames = dump.as_array().expect("dump should be an array");
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0]["payload"], "hello world");
}

#[test]
fn test_read_out_of_range_is_json_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cli.store");

    run_cli(&["append", path_str(&path), "hello world"]);

    let (output, err) = run_cli(&["read", path_str(&path), "19"]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(err["status"], "error");
    assert!(err["message"].as_str().unwrap().contains("out of range"));
}
