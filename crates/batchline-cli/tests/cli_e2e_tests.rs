//! End-to-end tests for the batchline binary
//!
//! Each test runs against its own SQLite database in a temp directory,
//! passed via `--database-url`, so tests stay isolated and hermetic.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

struct TestEnv {
    url: String,
    _dir: TempDir,
}

fn test_env() -> TestEnv {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let url = format!(
        "sqlite://{}?mode=rwc",
        dir.path().join("batchline.db").display()
    );
    TestEnv { url, _dir: dir }
}

fn batchline(env: &TestEnv) -> Command {
    let mut cmd = Command::cargo_bin("batchline").expect("binary should build");
    cmd.arg("--database-url").arg(&env.url);
    cmd
}

#[test]
fn test_seed_then_run_processes_all_customers() {
    let env = test_env();

    batchline(&env)
        .args(["seed", "--count", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Inserted 5 customers"));

    batchline(&env)
        .args(["run", "--chunk-size", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("completed"))
        .stdout(predicate::str::contains("COMPLETED"));
}

#[test]
fn test_run_with_edge_cases_reports_filtered_items() {
    let env = test_env();

    batchline(&env)
        .args(["seed", "--count", "3", "--with-edge-cases"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Inserted 6 customers"));

    // 4 processable (3 valid + 1 inactive), 2 filtered.
    batchline(&env)
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("completed"));

    batchline(&env)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("completed:     1"))
        .stdout(predicate::str::contains("total written: 4"));
}

#[test]
fn test_run_on_empty_database_exits_no_data() {
    let env = test_env();

    batchline(&env)
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("NO_DATA"));
}

#[test]
fn test_status_shows_execution_detail() {
    let env = test_env();

    batchline(&env)
        .args(["seed", "--count", "2"])
        .assert()
        .success();
    batchline(&env).arg("run").assert().success();

    batchline(&env)
        .args(["status", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("customer-processing-job"))
        .stdout(predicate::str::contains("process-customers"));
}

#[test]
fn test_status_unknown_execution_fails() {
    let env = test_env();

    batchline(&env)
        .args(["status", "42"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not found"));
}

#[test]
fn test_list_shows_history_newest_first() {
    let env = test_env();

    batchline(&env)
        .args(["seed", "--count", "1"])
        .assert()
        .success();
    batchline(&env).arg("run").assert().success();
    batchline(&env)
        .args(["run", "--new-instance"])
        .assert()
        .success();

    batchline(&env)
        .args(["list", "--limit", "10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("NO_DATA"))
        .stdout(predicate::str::contains("COMPLETED"));
}

#[test]
fn test_second_run_same_instance_reads_nothing() {
    let env = test_env();

    batchline(&env)
        .args(["seed", "--count", "2"])
        .assert()
        .success();
    batchline(&env).arg("run").assert().success();

    // Same parameters, same instance; the working set is empty now.
    batchline(&env)
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("NO_DATA"));
}

#[test]
fn test_recover_rejects_completed_execution() {
    let env = test_env();

    batchline(&env)
        .args(["seed", "--count", "1"])
        .assert()
        .success();
    batchline(&env).arg("run").assert().success();

    batchline(&env)
        .args(["recover", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Recovery rejected"));
}

#[test]
fn test_stop_rejects_execution_that_is_not_running() {
    let env = test_env();

    batchline(&env)
        .args(["seed", "--count", "1"])
        .assert()
        .success();
    batchline(&env).arg("run").assert().success();

    batchline(&env)
        .args(["stop", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid status transition"));
}

#[test]
fn test_invalid_param_format_is_rejected() {
    let env = test_env();

    batchline(&env)
        .args(["run", "--param", "not-a-pair"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("KEY=VALUE"));
}
