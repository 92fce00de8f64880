//! Smoke tests for the `skein` binary surface.

use serde_json::Value;
use std::ffi::OsStr;
use std::fs;
use std::process::{Command, Output};

fn run_skein<I, S>(args: I) -> Output
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let bin = env!("CARGO_BIN_EXE_skein");
    Command::new(bin)
        .args(args)
        .output()
        .expect("skein command should execute")
}

fn assert_success(output: &Output) {
    if !output.status.success() {
        panic!(
            "command failed with status {:?}\nstdout:\n{}\nstderr:\n{}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }
}

#[test]
fn help_lists_both_commands() {
    let output = run_skein(["--help"]);
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("serve"));
    assert!(stdout.contains("show"));
}

#[test]
fn show_json_on_missing_snapshot_prints_the_empty_document() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let data = dir.path().join("issues.json");
    let output = run_skein([
        OsStr::new("show"),
        OsStr::new("--data"),
        data.as_os_str(),
        OsStr::new("--json"),
    ]);
    assert_success(&output);

    let value: Value = serde_json::from_slice(&output.stdout).expect("stdout should be json");
    assert_eq!(value["lastId"], 0);
    assert_eq!(value["issues"], serde_json::json!([]));
}

#[test]
fn show_summarizes_a_snapshot_fixture() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let data = dir.path().join("issues.json");
    fs::write(
        &data,
        r#"{
  "lastId": 1,
  "issues": [
    {
      "id": 1,
      "title": "Bug A",
      "description": "",
      "status": "Open",
      "createdBy": "alice",
      "createdAt": "2026-01-01T00:00:00Z",
      "comments": []
    }
  ]
}
"#,
    )
    .expect("fixture should write");

    let output = run_skein([OsStr::new("show"), OsStr::new("--data"), data.as_os_str()]);
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("1 issues (lastId=1)"));
    assert!(stdout.contains("#1 [Open] Bug A (by alice, 0 comments)"));
}

#[test]
fn serve_rejects_an_unparsable_bind_address() {
    let output = run_skein(["serve", "--bind", "not-an-address"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid --bind address"));
}
