//! E2E CLI tests for `snapls list` and `snapls cursor`.
//!
//! Each test runs the binary against a fixture written to a temp directory,
//! with an explicit (missing) config path so user config never leaks in.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const FIXTURE: &str = r#"{
    "repositories": [
        {
            "name": "r1",
            "snapshots": [
                { "name": "a", "start_time": 100, "end_time": 130, "indices": ["logs"], "total_shards": 2 },
                { "name": "b", "start_time": 200, "end_time": 205, "total_shards": 4, "failed_shards": 1,
                  "state": "partial" }
            ]
        },
        {
            "name": "r2",
            "snapshots": [
                { "name": "c", "start_time": 150, "end_time": 190, "indices": ["logs", "metrics"],
                  "catalogue_details": false }
            ]
        },
        { "name": "r3", "unavailable": "bucket credentials expired" }
    ]
}"#;

struct Harness {
    dir: TempDir,
}

impl Harness {
    fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(dir.path().join("repos.json"), FIXTURE).expect("write fixture");
        Self { dir }
    }

    fn fixture(&self) -> PathBuf {
        self.dir.path().join("repos.json")
    }

    fn config(&self) -> PathBuf {
        self.dir.path().join("config.toml")
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("snapls"));
        cmd.current_dir(self.dir.path());
        cmd.env("SNAPLS_LOG", "error");
        cmd.env_remove("FORMAT");
        cmd.arg("--config").arg(self.config());
        cmd
    }

    fn list_json(&self, extra: &[&str]) -> Value {
        let output = self
            .cmd()
            .arg("list")
            .arg("--fixture")
            .arg(self.fixture())
            .args(["--format", "json"])
            .args(extra)
            .output()
            .expect("list should not crash");
        assert!(
            output.status.success(),
            "list failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).expect("list --format json should produce JSON")
    }
}

fn names(page: &Value) -> Vec<String> {
    page["snapshots"]
        .as_array()
        .expect("snapshots array")
        .iter()
        .map(|row| row["snapshot"].as_str().expect("snapshot name").to_string())
        .collect()
}

fn write_config(path: &Path, body: &str) {
    std::fs::write(path, body).expect("write config");
}

#[test]
fn first_page_then_follow_next_token() {
    let h = Harness::new();
    let page = h.list_json(&["-n", "2"]);
    assert_eq!(names(&page), vec!["a", "c"]);
    assert_eq!(page["total"], 3);
    assert_eq!(page["remaining"], 1);
    assert_eq!(page["failures"]["r3"], "repository [r3] unavailable: bucket credentials expired");

    let next = page["next"].as_str().expect("next token").to_string();
    let page = h.list_json(&["-n", "2", "--after", &next]);
    assert_eq!(names(&page), vec!["b"]);
    assert_eq!(page["remaining"], 0);
    assert!(page.get("next").is_none());
}

#[test]
fn sort_order_and_repository_filters() {
    let h = Harness::new();
    let page = h.list_json(&["--sort", "duration", "--order", "desc"]);
    assert_eq!(names(&page), vec!["c", "a", "b"]);
    assert_eq!(page["snapshots"][0]["sort_value"], "40");

    let page = h.list_json(&["--repository", "r1", "--sort", "shard_count"]);
    assert_eq!(names(&page), vec!["a", "b"]);
    assert!(page.get("failures").is_none());
}

#[test]
fn from_sort_value_is_inclusive() {
    let h = Harness::new();
    let page = h.list_json(&["--from-sort-value", "150"]);
    assert_eq!(names(&page), vec!["c", "b"]);

    let page = h.list_json(&["--sort", "name", "--order", "desc", "--from-sort-value", "b"]);
    assert_eq!(names(&page), vec!["b", "a"]);
}

#[test]
fn offset_paging() {
    let h = Harness::new();
    let page = h.list_json(&["-n", "1", "--offset", "1"]);
    assert_eq!(names(&page), vec!["c"]);
    assert_eq!(page["remaining"], 1);
}

#[test]
fn config_defaults_apply() {
    let h = Harness::new();
    write_config(
        &h.config(),
        "[listing]\ndefault_size = 1\ndefault_sort = \"name\"\ndefault_order = \"desc\"\n",
    );
    let page = h.list_json(&[]);
    assert_eq!(names(&page), vec!["c"]);
    assert_eq!(page["sort"], "name");
    assert_eq!(page["order"], "desc");
}

#[test]
fn broken_config_names_the_file() {
    let h = Harness::new();
    write_config(&h.config(), "[listing\n");
    h.cmd()
        .args(["list", "--fixture"])
        .arg(h.fixture())
        .assert()
        .failure()
        .stderr(predicate::str::contains("config.toml"));
}

#[test]
fn broken_config_json_error_code() {
    let h = Harness::new();
    write_config(&h.config(), "[listing]\ndefault_order = \"sideways\"\n");
    h.cmd()
        .args(["list", "--json", "--fixture"])
        .arg(h.fixture())
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"error_code\": \"E6001\""));
}

#[test]
fn text_output_has_footer() {
    let h = Harness::new();
    h.cmd()
        .args(["list", "--format", "text", "-n", "1", "--fixture"])
        .arg(h.fixture())
        .assert()
        .success()
        .stdout(predicate::str::contains("r1  a  success"))
        .stdout(predicate::str::contains("total=3 remaining=2"))
        .stdout(predicate::str::contains("next="));
}

#[test]
fn invalid_arguments_report_error_codes() {
    let h = Harness::new();
    h.cmd()
        .args(["list", "--format", "json", "--sort", "size", "--fixture"])
        .arg(h.fixture())
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"error_code\": \"E1001\""));

    h.cmd()
        .args(["list", "--format", "json", "--after", "@@@", "--fixture"])
        .arg(h.fixture())
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"error_code\": \"E1002\""));

    let token = "MSxyMSxh";
    h.cmd()
        .args(["list", "--format", "text", "--after", token, "--offset", "1", "--fixture"])
        .arg(h.fixture())
        .assert()
        .failure()
        .stderr(predicate::str::contains("can't use after and offset simultaneously"));
}

#[test]
fn missing_fixture_fails_with_path() {
    let h = Harness::new();
    h.cmd()
        .args(["list", "--fixture", "nope.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope.json"));
}

#[test]
fn cursor_decode_prints_fields() {
    let h = Harness::new();
    h.cmd()
        .args(["cursor", "decode", "MTUwLHIyLGM=", "--format", "text"])
        .assert()
        .success()
        .stdout("150  r2  c\n");

    let output = h
        .cmd()
        .args(["--json", "cursor", "decode", "MTUwLHIyLGM"])
        .output()
        .expect("decode");
    assert!(output.status.success());
    let cursor: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(cursor["repository"], "r2");
    assert_eq!(cursor["snapshot"], "c");
}

#[test]
fn cursor_decode_rejects_wrong_field_count() {
    let h = Harness::new();
    // "a,b" has two fields.
    h.cmd()
        .args(["cursor", "decode", "YSxi", "--format", "text"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected 3"));
}
