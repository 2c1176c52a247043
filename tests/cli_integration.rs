//! CLI integration tests
//!
//! Runs the `bookie-session` binary without touching any network: refreshes
//! only use inactive accounts and dedup is purely local.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use std::path::PathBuf;
use tempfile::TempDir;

fn write_json(dir: &TempDir, name: &str, value: &Value) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, serde_json::to_string(value).unwrap()).unwrap();
    path
}

#[test]
fn test_version_flag() {
    let mut cmd = cargo_bin_cmd!("bookie-session");
    cmd.arg("--version");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_help_flag() {
    let mut cmd = cargo_bin_cmd!("bookie-session");
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("refresh"))
        .stdout(predicate::str::contains("dedup"));
}

#[test]
fn test_refresh_help_lists_options() {
    let mut cmd = cargo_bin_cmd!("bookie-session");
    cmd.args(["refresh", "--help"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--accounts"))
        .stdout(predicate::str::contains("--concurrency"))
        .stdout(predicate::str::contains("--bypass-cache"))
        .stdout(predicate::str::contains("--no-persist"));
}

#[test]
fn test_dedup_output() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_json(
        &temp_dir,
        "markets.json",
        &json!([
            { "id": 70472, "sequenceIndex": 1, "payload": "A" },
            { "id": 999, "sequenceIndex": 2, "payload": "B" },
            { "id": 70472, "sequenceIndex": 50, "payload": "Z" }
        ]),
    );

    let mut cmd = cargo_bin_cmd!("bookie-session");
    cmd.arg("dedup").arg("--input").arg(&input).args(["--ids", "70472"]);

    let output = cmd.output().unwrap();
    assert!(output.status.success());

    let json: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        json,
        json!([
            { "id": 70472, "sequenceIndex": 50, "payload": "Z" },
            { "id": 999, "sequenceIndex": 2, "payload": "B" }
        ])
    );
}

#[test]
fn test_dedup_rejects_bad_ids() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_json(&temp_dir, "markets.json", &json!([]));

    let mut cmd = cargo_bin_cmd!("bookie-session");
    cmd.arg("dedup").arg("--input").arg(&input).args(["--ids", "12,abc"]);

    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Invalid market id"));
}

#[test]
fn test_refresh_inactive_accounts_exits_partial() {
    let temp_dir = TempDir::new().unwrap();
    let accounts = write_json(
        &temp_dir,
        "accounts.json",
        &json!([{
            "id": "dormant",
            "platform": "session_cookie",
            "siteUrl": "https://book.example",
            "credentials": { "login": "punter", "password": "pw" },
            "active": false
        }]),
    );

    let mut cmd = cargo_bin_cmd!("bookie-session");
    cmd.arg("refresh").arg("--accounts").arg(&accounts).arg("--no-persist");

    let output = cmd.output().unwrap();
    assert_eq!(output.status.code(), Some(2));

    let json: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json[0]["accountId"], "dormant");
    assert_eq!(json[0]["success"], false);
    assert_eq!(json[0]["error"], "inactive");

    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("1 accounts: 0 succeeded, 1 failed"), "{}", stderr);
}

#[test]
fn test_refresh_empty_batch_succeeds() {
    let temp_dir = TempDir::new().unwrap();
    let accounts = write_json(&temp_dir, "accounts.json", &json!([]));
    let cache_file = temp_dir.path().join("state").join("cache.json");

    let mut cmd = cargo_bin_cmd!("bookie-session");
    cmd.arg("refresh")
        .arg("--accounts")
        .arg(&accounts)
        .arg("--cache-file")
        .arg(&cache_file);

    cmd.assert().success().stdout(predicate::str::contains("[]"));
    assert!(cache_file.exists());
}

#[test]
fn test_refresh_invalid_accounts_file() {
    let temp_dir = TempDir::new().unwrap();
    let accounts = write_json(&temp_dir, "accounts.json", &json!({ "not": "a list" }));

    let mut cmd = cargo_bin_cmd!("bookie-session");
    cmd.arg("refresh").arg("--accounts").arg(&accounts).arg("--no-persist");

    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Invalid accounts file"));
}

#[test]
fn test_invalid_config_is_fatal() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("config.toml");
    std::fs::write(&config, "[refresh]\nconcurrency = 0\n").unwrap();
    let accounts = write_json(&temp_dir, "accounts.json", &json!([]));

    let mut cmd = cargo_bin_cmd!("bookie-session");
    cmd.arg("--config")
        .arg(&config)
        .arg("refresh")
        .arg("--accounts")
        .arg(&accounts)
        .arg("--no-persist");

    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("concurrency"));
}
