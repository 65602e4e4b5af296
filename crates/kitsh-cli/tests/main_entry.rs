//! Integration tests for the `kitsh` binary entry point.
//!
//! Verifies help output and the failure reported when no service target is
//! configured.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::str::contains;

#[test]
fn help_succeeds() {
    let mut command = cargo_bin_cmd!("kitsh");
    command.arg("--help");
    command
        .assert()
        .success()
        .stdout(contains("Operator shell for the kitsune virtualisation service"));
}

#[test]
fn missing_target_exits_with_failure() {
    let mut command = cargo_bin_cmd!("kitsh");
    command.env_remove("KITSUNE_TARGET").args(["image", "list"]);
    command
        .assert()
        .code(1)
        .stderr(contains("no target configured"));
}

#[test]
fn malformed_dynamic_command_is_rejected_before_connecting() {
    let mut command = cargo_bin_cmd!("kitsh");
    command.args(["--target", "127.0.0.1:1", "img."]);
    command.assert().code(1).stderr(contains("invalid syntax"));
}
