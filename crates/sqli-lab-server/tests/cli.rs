// SPDX-License-Identifier: Apache-2.0

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_version() {
    let mut cmd = cargo_bin_cmd!("sqli-lab");
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("sqli-lab"));
}

#[test]
fn test_help_contains_all_commands() {
    let mut cmd = cargo_bin_cmd!("sqli-lab");
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("seed"));
}

#[test]
fn test_serve_help_lists_overrides() {
    let mut cmd = cargo_bin_cmd!("sqli-lab");
    cmd.args(["serve", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--host"))
        .stdout(predicate::str::contains("--port"))
        .stdout(predicate::str::contains("--skip-seed"));
}

#[test]
fn test_no_args_prints_help() {
    let mut cmd = cargo_bin_cmd!("sqli-lab");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_seed_creates_database() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("seeded.db");

    let mut cmd = cargo_bin_cmd!("sqli-lab");
    cmd.current_dir(dir.path())
        .args(["seed", "--database"])
        .arg(&db)
        .assert()
        .success();

    assert!(db.exists());
}

#[test]
fn test_missing_config_file_fails() {
    let dir = tempfile::tempdir().unwrap();

    let mut cmd = cargo_bin_cmd!("sqli-lab");
    cmd.current_dir(dir.path())
        .args(["seed", "--config", "absent.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}
