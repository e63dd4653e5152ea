//! Basic CLI E2E tests.
//!
//! Tests invoke CLI commands via cargo run with HOME pointed at a scratch
//! directory, so config writes never touch the real one.

use std::path::Path;
use std::process::Command;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(home: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new("cargo")
        .args(["run", "-q", "-p", "blitzweek-cli", "--"])
        .args(args)
        .env("HOME", home)
        .env_remove("BLITZWEEK_ENV")
        .env_remove("BLITZWEEK_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_cli_success(home: &Path, args: &[&str]) -> String {
    let (stdout, stderr, code) = run_cli(home, args);
    assert_eq!(code, 0, "CLI command {args:?} failed: {stderr}");
    stdout
}

#[test]
fn test_help_lists_commands() {
    let home = tempfile::tempdir().unwrap();
    let out = run_cli_success(home.path(), &["--help"]);
    for cmd in ["countdown", "stats", "register", "config"] {
        assert!(out.contains(cmd), "missing {cmd} in help");
    }
}

#[test]
fn test_config_get_default() {
    let home = tempfile::tempdir().unwrap();
    let out = run_cli_success(home.path(), &["config", "get", "event.title"]);
    assert_eq!(out.trim(), "ScaleUp Blitz Week");
    assert!(home.path().join(".config/blitzweek/config.toml").exists());
}

#[test]
fn test_config_set_then_get() {
    let home = tempfile::tempdir().unwrap();
    run_cli_success(home.path(), &["config", "set", "stats.refresh_secs", "5"]);
    let out = run_cli_success(home.path(), &["config", "get", "stats.refresh_secs"]);
    assert_eq!(out.trim(), "5");
}

#[test]
fn test_config_set_unknown_key_fails() {
    let home = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(home.path(), &["config", "set", "event.venue", "x"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_config_list_json() {
    let home = tempfile::tempdir().unwrap();
    let out = run_cli_success(home.path(), &["config", "list", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed["event"]["duration_hours"], 48);
}

#[test]
fn test_countdown_status_before_event() {
    let home = tempfile::tempdir().unwrap();
    run_cli_success(
        home.path(),
        &["config", "set", "event.start", "2099-01-25T10:00:00+05:30"],
    );
    let out = run_cli_success(home.path(), &["countdown", "status"]);
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed["phase"], "pre");
    assert_eq!(parsed["synced"], false);
    assert!(parsed["remaining_secs"].as_u64().unwrap() > 0);
}

#[test]
fn test_countdown_status_after_event() {
    let home = tempfile::tempdir().unwrap();
    run_cli_success(
        home.path(),
        &["config", "set", "event.start", "2001-01-25T10:00:00+05:30"],
    );
    let out = run_cli_success(home.path(), &["countdown", "status"]);
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed["phase"], "ended");
    assert_eq!(parsed["remaining_secs"], 0);
}

#[test]
fn test_register_dry_run_normalizes() {
    let home = tempfile::tempdir().unwrap();
    let out = run_cli_success(
        home.path(),
        &[
            "register",
            "submit",
            "--dry-run",
            "--name",
            " Asha  Rao",
            "--ldap-id",
            "ASHA@iitb.ac.in",
            "--roll-number",
            "22b1234",
            "--branch",
            "CSE",
            "--year",
            "3",
            "--track",
            "both",
        ],
    );
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed["payload"]["name"], "Asha Rao");
    assert_eq!(parsed["payload"]["ldapId"], "asha@iitb.ac.in");
    assert_eq!(parsed["payload"]["interestedEvents"], "Both");
}

#[test]
fn test_register_dry_run_rejects_invalid_form() {
    let home = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(
        home.path(),
        &[
            "register",
            "submit",
            "--dry-run",
            "--name",
            "A",
            "--ldap-id",
            "a@gmail.com",
            "--roll-number",
            "x",
            "--branch",
            "CSE",
            "--year",
            "1",
        ],
    );
    assert_eq!(code, 1);
    assert!(stderr.contains("ldap_id"));
}
