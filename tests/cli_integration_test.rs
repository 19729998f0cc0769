//! CLI integration tests for the convoy binary.

use std::path::Path;
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::TempDir;

// ============================================================
// Helper functions
// ============================================================

/// Run the `convoy` binary with its working directory set to `dir`.
fn convoy(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_convoy"))
        .current_dir(dir)
        .env("RUST_LOG", "error")
        .args(args)
        .output()
        .expect("failed to run convoy")
}

/// Run a command with `--json`, assert success, and return the parsed stdout.
fn run_json(dir: &Path, args: &[&str]) -> Value {
    let mut full = vec!["--json"];
    full.extend_from_slice(args);
    let output = convoy(dir, &full);
    assert!(
        output.status.success(),
        "convoy {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout)
        .unwrap_or_else(|e| panic!("Failed to parse JSON from {:?}: {}", args, e))
}

fn write_task(dir: &Path, name: &str, task_type: &str) {
    let body = format!(
        "id: t-1\ntype: {task_type}\ndescription: Add search\nworkspaceId: ws-1\nuserId: u-1\nconfig:\n  maxRetries: 1\n"
    );
    std::fs::write(dir.join(name), body).unwrap();
}

// ============================================================
// route
// ============================================================

#[test]
fn test_route_full_lifecycle() {
    let dir = TempDir::new().unwrap();
    write_task(dir.path(), "task.yaml", "full-lifecycle");

    let json = run_json(dir.path(), &["route", "task.yaml"]);

    assert_eq!(json["taskId"], "t-1");
    assert_eq!(
        json["phases"],
        serde_json::json!(["planning", "implementation", "qa", "deployment"])
    );
    assert_eq!(json["guardedDeployment"], true);
}

#[test]
fn test_route_unknown_type_fails() {
    let dir = TempDir::new().unwrap();
    write_task(dir.path(), "task.yaml", "unknown-type");

    let output = convoy(dir.path(), &["route", "task.yaml"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unknown task type: unknown-type"));
}

// ============================================================
// simulate
// ============================================================

#[test]
fn test_simulate_qa_exhaustion() {
    let dir = TempDir::new().unwrap();
    write_task(dir.path(), "task.yaml", "fix-bug");

    let json = run_json(dir.path(), &["simulate", "task.yaml", "--qa-failures", "5"]);

    assert_eq!(json["status"], "failed");
    assert_eq!(json["error"], "QA verification failed after 1 retries");
    assert_eq!(json["invocations"]["dev"], 2);
    assert_eq!(json["invocations"]["qa"], 2);
    assert_eq!(json["events"][0], "workflow.started");
}

#[test]
fn test_simulate_smoke_failure_rolls_back() {
    let dir = TempDir::new().unwrap();
    write_task(dir.path(), "deploy.yaml", "deploy");

    let json = run_json(dir.path(), &["simulate", "deploy.yaml", "--smoke-fail"]);

    assert_eq!(json["status"], "failed");
    assert_eq!(json["phaseResults"]["rollback"]["status"], "rollback_completed");
    assert_eq!(json["invocations"]["rollback"], 1);
}

#[test]
fn test_simulate_human_output() {
    let dir = TempDir::new().unwrap();
    write_task(dir.path(), "task.yaml", "implement-feature");

    let output = convoy(dir.path(), &["simulate", "task.yaml"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Status:  completed"));
    assert!(stdout.contains("workflow.completed"));
}

// ============================================================
// config
// ============================================================

#[test]
fn test_config_validate_rejects_bad_file() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("bad.yaml"), "events:\n  channel_capacity: 0\n").unwrap();

    let output = convoy(dir.path(), &["config", "validate", "--file", "bad.yaml"]);

    assert!(!output.status.success());
}

#[test]
fn test_config_show_reads_project_file() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir(dir.path().join(".convoy")).unwrap();
    std::fs::write(
        dir.path().join(".convoy/config.yaml"),
        "orchestrator:\n  default_environment: qa-east\n",
    )
    .unwrap();

    let json = run_json(dir.path(), &["config", "show"]);

    assert_eq!(json["orchestrator"]["default_environment"], "qa-east");
    assert_eq!(json["orchestrator"]["default_max_retries"], 2);
}
