//! Behavioural smoke tests for the CLI entrypoint.

use assert_cmd::Command;
use predicates::prelude::*;

const CONFIG_ENV_VARS: &[&str] = &[
    "DRAWBRIDGE_PROJECT",
    "DRAWBRIDGE_CLIENT",
    "DRAWBRIDGE_STAGE",
    "DRAWBRIDGE_OWNER",
    "DRAWBRIDGE_AWS_ACCOUNT",
    "DRAWBRIDGE_AWS_REGION",
    "DRAWBRIDGE_DB_INSTANCE_IDENTIFIER",
    "DRAWBRIDGE_IPV4_ALLOWLIST",
    "DRAWBRIDGE_USER_DATA_FILE",
    "DRAWBRIDGE_SSH_PORT",
];

fn drawbridge() -> Command {
    let mut cmd = Command::cargo_bin("drawbridge")
        .unwrap_or_else(|err| panic!("binary should build: {err}"));
    for key in CONFIG_ENV_VARS {
        cmd.env_remove(key);
    }
    cmd
}

#[test]
fn help_lists_the_synth_subcommand() {
    drawbridge()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("synth"));
}

#[test]
fn bare_invocation_shows_usage_and_fails() {
    drawbridge()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn synth_without_configuration_fails_before_any_cloud_call() {
    drawbridge()
        .arg("synth")
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration error"));
}
