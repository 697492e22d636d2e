//! End-to-end integration tests for the trackify binary.
//!
//! Drives the full flow through the CLI: membership and policy setup,
//! start/stop, entry listing, reporting and migrations.

use std::process::Command;

use tempfile::TempDir;

fn trackify_binary() -> String {
    env!("CARGO_BIN_EXE_trackify").to_string()
}

fn run_trackify(temp: &TempDir, args: &[&str]) -> std::process::Output {
    Command::new(trackify_binary())
        .env("TRACKIFY_DATABASE_PATH", temp.path().join("trackify.db"))
        .args(args)
        .output()
        .expect("failed to run trackify")
}

fn run_ok(temp: &TempDir, args: &[&str]) -> String {
    let output = run_trackify(temp, args);
    assert!(
        output.status.success(),
        "trackify {args:?} should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).unwrap()
}

#[test]
fn start_stop_and_list_flow() {
    let temp = TempDir::new().unwrap();

    let stdout = run_ok(
        &temp,
        &[
            "start", "--user", "alice", "--workspace", "acme", "--project", "proj-1", "--title",
            "deep work",
        ],
    );
    assert!(stdout.contains("Started timer for alice in acme"));

    let stdout = run_ok(&temp, &["status", "--user", "alice"]);
    assert!(stdout.contains("Timer running for alice in acme"));

    let stdout = run_ok(&temp, &["stop", "--user", "alice"]);
    assert!(stdout.contains("Stopped timer for alice"));

    let stdout = run_ok(
        &temp,
        &["entries", "--user", "alice", "--workspace", "acme"],
    );
    assert!(stdout.contains("deep work"));
}

#[test]
fn double_start_fails_with_conflict() {
    let temp = TempDir::new().unwrap();
    let start_args = [
        "start", "--user", "alice", "--workspace", "acme", "--project", "proj-1", "--title",
        "one",
    ];
    run_ok(&temp, &start_args);

    let output = run_trackify(&temp, &start_args);
    assert!(!output.status.success());
    assert!(
        String::from_utf8_lossy(&output.stderr).contains("already running"),
        "stderr should explain the conflict"
    );
}

#[test]
fn report_flow_with_membership_and_balance() {
    let temp = TempDir::new().unwrap();

    run_ok(
        &temp,
        &["member", "add", "--user", "alice", "--workspace", "acme"],
    );
    run_ok(
        &temp,
        &[
            "balance",
            "set",
            "--user",
            "alice",
            "--workspace",
            "acme",
            "--leave-type",
            "casual",
            "--hours",
            "40",
        ],
    );

    let stdout = run_ok(
        &temp,
        &[
            "report",
            "--workspace",
            "acme",
            "--user",
            "alice",
            "--month",
            "1",
            "--year",
            "2025",
            "--json",
        ],
    );
    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["month"], 1);
    assert_eq!(report["ideal_monthly_hours"], 184.0);

    let stdout = run_ok(
        &temp,
        &["encash", "--user", "alice", "--workspace", "acme"],
    );
    assert!(stdout.contains("Total encashed: 20h 0m"));
}

#[test]
fn report_without_membership_fails() {
    let temp = TempDir::new().unwrap();

    let output = run_trackify(
        &temp,
        &[
            "report",
            "--workspace",
            "acme",
            "--user",
            "ghost",
            "--month",
            "1",
            "--year",
            "2025",
        ],
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("membership"));
}

#[test]
fn ideal_hours_honors_rule_and_holiday() {
    let temp = TempDir::new().unwrap();

    run_ok(
        &temp,
        &[
            "rule",
            "set",
            "--workspace",
            "acme",
            "--hours-per-day",
            "8",
            "--day",
            "monday",
            "--day",
            "tuesday",
            "--day",
            "wednesday",
            "--day",
            "thursday",
            "--day",
            "friday",
        ],
    );
    run_ok(
        &temp,
        &[
            "holiday",
            "add",
            "--workspace",
            "acme",
            "--date",
            "2025-01-01",
            "--title",
            "New Year",
        ],
    );

    let stdout = run_ok(
        &temp,
        &[
            "ideal-hours",
            "--workspace",
            "acme",
            "--user",
            "alice",
            "--from",
            "2025-01-01",
            "--to",
            "2025-01-31",
        ],
    );
    assert!(stdout.contains("176h 0m over 22 working days"));
}

#[test]
fn migrate_runs_cleanly_on_fresh_database() {
    let temp = TempDir::new().unwrap();
    let stdout = run_ok(&temp, &["migrate"]);
    assert_eq!(
        stdout,
        "Migrations complete: 0 rows examined, 0 updated\n"
    );
}
