//! Binary-level tests for `medsim`
//!
//! Each test runs the binary in a scratch directory with HOME and XDG paths
//! redirected, so no real config, .env, or log directory is touched. None of
//! them reach the network.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn medsim(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("medsim").unwrap();
    cmd.current_dir(home)
        .env("HOME", home)
        .env("XDG_DATA_HOME", home.join("data"))
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env_remove("GOOGLE_API_KEY")
        .env_remove("MEDITATION_MODEL")
        .env_remove("MEDITATION_ITERATIONS")
        .env_remove("MEDITATION_TEMPERATURE")
        .env_remove("MEDITATION_MAX_OUTPUT_TOKENS")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_config_prints_defaults() {
    let temp = TempDir::new().unwrap();

    medsim(temp.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("gemini-2.0-flash-lite-preview-02-05"))
        .stdout(predicate::str::contains("max-attempts: 5"));
}

#[test]
fn test_config_reads_local_file_and_env() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join(".meditation.yml"), "session:\n  iterations: 3\n").unwrap();

    medsim(temp.path())
        .arg("config")
        .env("MEDITATION_MODEL", "gemini-pro")
        .assert()
        .success()
        .stdout(predicate::str::contains("iterations: 3"))
        .stdout(predicate::str::contains("model: gemini-pro"));
}

#[test]
fn test_run_without_key_reports_and_exits_normally() {
    let temp = TempDir::new().unwrap();

    medsim(temp.path())
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("API key not found"));

    assert!(!temp.path().join("outputs").exists());
}

#[test]
fn test_run_with_placeholder_key_is_rejected() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join(".env"), "GOOGLE_API_KEY=YOUR_API_KEY_HERE\n").unwrap();

    medsim(temp.path())
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("placeholder"));
}

#[test]
fn test_zero_iterations_saves_seed() {
    let temp = TempDir::new().unwrap();

    medsim(temp.path())
        .args(["run", "--iterations", "0", "--seed", "Only the seed.", "--no-pause"])
        .env("GOOGLE_API_KEY", "test-key")
        .assert()
        .success()
        .stdout(predicate::str::contains("Full stream of consciousness saved to"));

    let entries: Vec<_> = fs::read_dir(temp.path().join("outputs"))
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(entries.len(), 1);
    let content = fs::read_to_string(&entries[0]).unwrap();
    assert!(content.starts_with("# Meditation Session Log - "));
    assert!(content.ends_with("\n\nOnly the seed."));
}

#[test]
fn test_empty_seed_reports_error_and_writes_nothing() {
    let temp = TempDir::new().unwrap();

    medsim(temp.path())
        .args(["run", "--iterations", "0", "--seed", ""])
        .env("GOOGLE_API_KEY", "test-key")
        .assert()
        .success()
        .stdout(predicate::str::contains("No stream of consciousness generated"));

    assert!(!temp.path().join("outputs").exists());
}

#[test]
fn test_bad_config_file_reports_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("broken.yml");
    fs::write(&path, "session: [not, a, map").unwrap();

    medsim(temp.path())
        .arg("--config")
        .arg(&path)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("Failed to load configuration"));
}
