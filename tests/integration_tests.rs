//! Integration tests for the shiftpipe CLI

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn shiftpipe(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("shiftpipe").unwrap();
    cmd.current_dir(dir)
        .env("SHIFTPIPE_PIPELINE__SAMPLE_WINDOW_MS", "0")
        .env("SHIFTPIPE_LOG__FLUSH_INTERVAL_MS", "20")
        .env_remove("RUST_LOG");
    cmd
}

/// Test CLI binary exists and responds to --help
#[test]
fn test_cli_help() {
    let dir = TempDir::new().unwrap();
    shiftpipe(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("reassembles the result in order"))
        .stdout(predicate::str::contains("--processes"));
}

/// Test CLI responds to --version
#[test]
fn test_cli_version() {
    let dir = TempDir::new().unwrap();
    shiftpipe(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("shiftpipe"));
}

/// Test invalid mode shows error
#[test]
fn test_invalid_mode() {
    let dir = TempDir::new().unwrap();
    shiftpipe(dir.path())
        .args(["scramble", "in.txt", "out.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

/// Encrypt then decrypt restores the original file
#[test]
fn test_encrypt_decrypt_round_trip() {
    let dir = TempDir::new().unwrap();
    let original = "Attack at Dawn\nMeet me by the old oak tree. Bring 3 lanterns!\n".repeat(50);
    fs::write(dir.path().join("plain.txt"), &original).unwrap();

    shiftpipe(dir.path())
        .args(["encrypt", "plain.txt", "secret.txt", "--shift", "11", "--processes", "4"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Encryption complete"))
        .stdout(predicate::str::contains("Chunks"))
        .stdout(predicate::str::contains("Workers"))
        .stdout(predicate::str::contains("Elapsed"));

    let encrypted = fs::read_to_string(dir.path().join("secret.txt")).unwrap();
    assert_ne!(encrypted, original);
    assert_eq!(encrypted.len(), original.len());

    shiftpipe(dir.path())
        .args(["decrypt", "secret.txt", "restored.txt", "--shift", "11"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Decryption complete"));

    assert_eq!(
        fs::read_to_string(dir.path().join("restored.txt")).unwrap(),
        original
    );

    // Only inputs, outputs and the log remain; scratch is gone
    let mut names: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, ["app.log", "plain.txt", "restored.txt", "secret.txt"]);
}

/// Default shift is 3
#[test]
fn test_default_shift() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("plain.txt"), "Attack at Dawn").unwrap();

    shiftpipe(dir.path())
        .args(["encrypt", "plain.txt", "out.txt", "--quiet"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    assert_eq!(
        fs::read_to_string(dir.path().join("out.txt")).unwrap(),
        "Dwwdfn dw Gdzq"
    );
}

/// Activity is recorded in the log file with the expected line format
#[test]
fn test_log_file_records_run() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("plain.txt"), "hello").unwrap();

    shiftpipe(dir.path())
        .args(["encrypt", "plain.txt", "out.txt"])
        .assert()
        .success();

    let log = fs::read_to_string(dir.path().join("app.log")).unwrap();
    assert!(log.contains("][INFO][CAESAR_CIPHER] Starting encryption: plain.txt -> out.txt"));
    assert!(log.contains("][INFO][CAESAR_CIPHER] File processed successfully: out.txt"));
    assert!(log.lines().all(|line| line.starts_with('[')));
}

/// A failing run exits non-zero, reports the error and logs it before shutdown
#[test]
fn test_missing_input_fails_and_is_logged() {
    let dir = TempDir::new().unwrap();

    shiftpipe(dir.path())
        .args(["decrypt", "missing.txt", "out.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to process missing.txt"));

    assert!(!dir.path().join("out.txt").exists());
    let log = fs::read_to_string(dir.path().join("app.log")).unwrap();
    assert!(log.contains("[ERROR][CAESAR_CIPHER] process_file: Failed to read input missing.txt"));
    assert!(log.contains("[ERROR][CAESAR_CIPHER] main: Failed to process missing.txt"));
}

/// Config file values apply and CLI flags win over them
#[test]
fn test_config_file() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("plain.txt"), "abc").unwrap();
    fs::write(
        dir.path().join("custom.toml"),
        "[pipeline]\ndefault_shift = 1\n\n[log]\nfile = \"logs/run.log\"\norigin = \"TEST\"\n",
    )
    .unwrap();

    shiftpipe(dir.path())
        .args(["encrypt", "plain.txt", "one.txt", "--config", "custom.toml"])
        .assert()
        .success();
    assert_eq!(fs::read_to_string(dir.path().join("one.txt")).unwrap(), "bcd");

    shiftpipe(dir.path())
        .args(["encrypt", "plain.txt", "two.txt", "--config", "custom.toml", "-s", "2"])
        .assert()
        .success();
    assert_eq!(fs::read_to_string(dir.path().join("two.txt")).unwrap(), "cde");

    let log = fs::read_to_string(dir.path().join("logs/run.log")).unwrap();
    assert!(log.contains("[INFO][TEST] "));
}

/// Missing --config file is a hard error
#[test]
fn test_missing_config_file() {
    let dir = TempDir::new().unwrap();
    shiftpipe(dir.path())
        .args(["encrypt", "a.txt", "b.txt", "--config", "absent.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config file not found"));
}

/// A log over its size limit is archived on the next run
#[test]
fn test_log_rotation_across_runs() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("plain.txt"), "rotate me").unwrap();

    for output in ["a.txt", "b.txt"] {
        shiftpipe(dir.path())
            .env("SHIFTPIPE_LOG__MAX_BYTES", "64")
            .args(["encrypt", "plain.txt", output])
            .assert()
            .success();
    }

    let mut archives: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("app_") && name.ends_with(".log"))
        .collect();
    archives.sort();
    assert!(!archives.is_empty());
    for name in &archives {
        // app_YYYYmmdd_HHMMSS.log, optionally with a _N counter
        let stamp = &name["app_".len().."app_".len() + 15];
        assert_eq!(stamp.as_bytes()[8], b'_', "{name}");
        assert!(stamp.chars().filter(|c| *c != '_').all(|c| c.is_ascii_digit()), "{name}");
    }

    // The first run's records moved to an archive; the active file keeps only the second run
    let active = fs::read_to_string(dir.path().join("app.log")).unwrap();
    assert!(!active.contains("-> a.txt"));
    assert!(active.contains("File processed successfully: b.txt"));

    let archived: String = archives
        .iter()
        .map(|name| fs::read_to_string(dir.path().join(name)).unwrap())
        .collect();
    assert_eq!(archived.matches("Starting encryption: plain.txt -> a.txt").count(), 1);
    assert!(archived.contains("File processed successfully: a.txt"));
}
