//! Integration tests for the pipedash CLI
//!
//! These tests run the actual binary and verify output.

use std::fs;
use std::time::Duration;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get the binary to test
fn pipedash_cmd() -> Command {
    let mut cmd = Command::cargo_bin("pipedash").unwrap();
    cmd.env("PIPEDASH_LOG", "off")
        .env_remove("PIPEDASH_INPUT_MODE")
        .env_remove("PIPEDASH_AUTO_TRAIN");
    cmd
}

#[test]
fn test_help_flag() {
    pipedash_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("pipedash"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_run_help_lists_flags() {
    pipedash_cmd()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--line-input"))
        .stdout(predicate::str::contains("--no-auto-train"))
        .stdout(predicate::str::contains("--fail-rate"));
}

// ============================================================================
// config subcommand
// ============================================================================

#[test]
fn test_config_missing_file_prints_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("absent.toml");

    pipedash_cmd()
        .args(["config", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("fast_ms = 200"))
        .stdout(predicate::str::contains("train.parquet"))
        .stdout(predicate::str::contains("mode = \"raw\""));
}

#[test]
fn test_config_file_values_are_used() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
[refresh]
fast_ms = 150

[display]
max_events = 25
"#,
    )
    .unwrap();

    pipedash_cmd()
        .args(["config", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("fast_ms = 150"))
        .stdout(predicate::str::contains("max_events = 25"))
        .stdout(predicate::str::contains("slow_ms = 1000"));
}

#[test]
fn test_config_env_override() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("absent.toml");

    pipedash_cmd()
        .env("PIPEDASH_INPUT_MODE", "line")
        .env("PIPEDASH_AUTO_TRAIN", "off")
        .args(["config", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("mode = \"line\""))
        .stdout(predicate::str::contains("enabled = false"));
}

#[test]
fn test_malformed_config_fails_with_hint() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    fs::write(&path, "[refresh\nfast_ms = ").unwrap();

    pipedash_cmd()
        .args(["config", "--config"])
        .arg(&path)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("DASH-030"))
        .stderr(predicate::str::contains("Fix:"));
}

#[test]
fn test_invalid_config_values_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    fs::write(&path, "[input]\npoll_ms = 500\n").unwrap();

    pipedash_cmd()
        .args(["config", "--config"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("input.poll_ms"));
}

// ============================================================================
// run subcommand
// ============================================================================

#[test]
fn test_run_rejects_bad_fail_rate() {
    pipedash_cmd()
        .args(["run", "--fail-rate", "1.5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--fail-rate"));
}

#[test]
fn test_run_line_input_quits_on_q() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("absent.toml");

    pipedash_cmd()
        .args(["run", "--line-input", "--config"])
        .arg(&path)
        .write_stdin("h\nq\n")
        .timeout(Duration::from_secs(10))
        .assert()
        .success()
        .stdout(predicate::str::contains("Session ended"));
}

#[test]
fn test_run_without_tty_falls_back_to_line_input() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("absent.toml");

    // Raw mode is requested but stdin is a pipe
    pipedash_cmd()
        .args(["run", "--config"])
        .arg(&path)
        .write_stdin("q\n")
        .timeout(Duration::from_secs(10))
        .assert()
        .success()
        .stdout(predicate::str::contains("Session ended"));
}
