//! Command line smoke tests

use assert_cmd::Command;
use predicates::prelude::*;

fn rcon_hub() -> Command {
    let mut cmd = Command::cargo_bin("rcon-hub").unwrap();
    // Keep the environment from leaking into the tests
    for var in [
        "RH_CONFIG",
        "RH_BIND",
        "RH_HOST_KEY_FILE",
        "RH_USER",
        "RH_PASSWORD",
        "RH_CONNECTIONS",
        "RH_LOG_LEVEL",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

/// Point at an empty config so no system config file gets picked up
fn empty_config() -> tempfile::NamedTempFile {
    tempfile::NamedTempFile::new().unwrap()
}

#[test]
fn test_help() {
    rcon_hub()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--connection"))
        .stdout(predicate::str::contains("--host-key-file"));
}

#[test]
fn test_version_subcommand() {
    rcon_hub()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("rcon-hub "));
}

#[test]
fn test_no_users_declared() {
    let config = empty_config();
    rcon_hub()
        .arg("--config")
        .arg(config.path())
        .arg("--connection")
        .arg("lobby=pw@127.0.0.1:25575")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No users declared"));
}

#[test]
fn test_no_connections_declared() {
    let config = empty_config();
    rcon_hub()
        .arg("--config")
        .arg(config.path())
        .args(["--password", "secret"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No connections declared"));
}

#[test]
fn test_malformed_connection() {
    let config = empty_config();
    rcon_hub()
        .arg("--config")
        .arg(config.path())
        .args(["--password", "secret", "--connection", "lobby@127.0.0.1:25575"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid connection"));
}
