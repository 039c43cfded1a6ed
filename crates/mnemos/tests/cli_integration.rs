//! CLI integration tests for the Mnemos command-line interface.
//!
//! Every test gets its own database and config directory so nothing touches
//! the user's real data or logs.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// A mnemos command bound to a scratch database and config directory.
struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("mnemos").unwrap();
        cmd.env_remove("MNEMOS_DB")
            .env_remove("RUST_LOG")
            .current_dir(self.dir.path())
            .arg("--db")
            .arg(self.dir.path().join("mnemos.db"))
            .arg("--config-dir")
            .arg(self.dir.path().join("config"));
        cmd
    }

    fn store(&self, content: &str, project: &str) -> String {
        let output = self
            .cmd()
            .args(["--json", "store", content, "--project", project])
            .output()
            .unwrap();
        assert!(output.status.success());
        let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        value["memory_id"].as_str().unwrap().to_string()
    }
}

fn mnemos() -> Command {
    Command::cargo_bin("mnemos").unwrap()
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_displays() {
    mnemos()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Mnemos"));
}

#[test]
fn test_version_displays() {
    mnemos()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("mnemos"));
}

#[test]
fn test_help_lists_subcommands() {
    let mut assert = mnemos().arg("--help").assert().success();
    for sub in [
        "store", "get", "search", "related", "trace", "promote", "maintain", "insights",
        "graph", "config",
    ] {
        assert = assert.stdout(predicate::str::contains(sub));
    }
}

#[test]
fn test_store_requires_content() {
    mnemos()
        .arg("store")
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONTENT"));
}

#[test]
fn test_invalid_layer_rejected() {
    mnemos()
        .args(["promote", "x", "--layer", "attic"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("attic"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine Round Trips
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_store_then_search() {
    let sandbox = Sandbox::new();
    let id = sandbox.store("Fix the Python parser error on empty input", "tools");
    sandbox.store("Weekly grocery list", "home");

    let output = sandbox
        .cmd()
        .args(["--json", "search", "parser", "--project", "tools"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let results = value["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["memory_id"].as_str(), Some(id.as_str()));
}

#[test]
fn test_get_counts_reads_across_runs() {
    let sandbox = Sandbox::new();
    let id = sandbox.store("Remember to rotate the API keys", "ops");

    sandbox.cmd().args(["get", &id]).assert().success();
    let output = sandbox.cmd().args(["--json", "get", &id]).output().unwrap();
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["memory"]["metadata"]["access_count"], 2);
}

#[test]
fn test_get_unknown_memory_fails() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["get", "6f1c2f3e-8a44-4f0c-9a43-2f6c1f0a9b11"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No such memory"));
}

#[test]
fn test_get_rejects_malformed_id() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["get", "not-an-id"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a valid memory ID"));
}

#[test]
fn test_trace_between_linked_memories() {
    let sandbox = Sandbox::new();
    let first = sandbox.store("Docker build cache notes", "infra");
    let second = sandbox.store("Docker registry credentials", "infra");

    // newer memories link back to older ones in the same project
    let output = sandbox
        .cmd()
        .args(["--json", "trace", "--ids", &second, &first])
        .output()
        .unwrap();
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let path = value["path"].as_array().unwrap();
    assert_eq!(path.len(), 2);
}

#[test]
fn test_promote_and_maintain() {
    let sandbox = Sandbox::new();
    let id = sandbox.store("TODO: review the release checklist", "release");

    sandbox
        .cmd()
        .args(["promote", &id, "--layer", "procedural", "--weight", "3.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Promoted"));

    let output = sandbox.cmd().args(["--json", "maintain"]).output().unwrap();
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["processed"], 1);
    assert_eq!(report["cancelled"], false);

    let output = sandbox.cmd().args(["--json", "get", &id]).output().unwrap();
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["memory"]["metadata"]["layer"], "procedural");
    assert_eq!(value["memory"]["metadata"]["emotional_weight"], 1.0);
}

#[test]
fn test_insights_reports_totals() {
    let sandbox = Sandbox::new();
    sandbox.store("React hooks notes", "web");
    sandbox.store("React testing notes", "web");

    sandbox
        .cmd()
        .args(["insights", "--project", "web"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Memories:"))
        .stdout(predicate::str::contains("2"));
}

#[test]
fn test_config_show_prints_defaults() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("[engine]"))
        .stdout(predicate::str::contains("connection_strength_threshold = "))
        .stdout(predicate::str::contains("[query.ranking]"));
}

#[test]
fn test_project_config_overrides_defaults() {
    let sandbox = Sandbox::new();
    std::fs::write(
        sandbox.dir.path().join("mnemos.toml"),
        "[engine]\nshort_term_limit = 3\n",
    )
    .unwrap();
    sandbox
        .cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("short_term_limit = 3"));
}

#[test]
fn test_config_init_writes_user_config_once() {
    let sandbox = Sandbox::new();
    let path = sandbox.dir.path().join("config").join("config.toml");

    sandbox
        .cmd()
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created config file"));
    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("[engine]"));

    sandbox
        .cmd()
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));

    // the written defaults load back cleanly
    sandbox
        .cmd()
        .args(["config", "which"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 config file(s) loaded."));
}

#[test]
fn test_config_init_local() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["config", "init", "--local"])
        .assert()
        .success();
    assert!(sandbox.dir.path().join("mnemos.toml").exists());
}
