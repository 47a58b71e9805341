//! CLI smoke tests.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

fn scenesmith() -> Command {
    cargo_bin_cmd!("scenesmith")
}

#[test]
fn help_lists_the_subcommands() {
    scenesmith()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("generate"));
}

#[test]
fn version_prints() {
    scenesmith().arg("--version").assert().success();
}

#[test]
fn serve_help_shows_the_port_default() {
    scenesmith()
        .args(["serve", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("5555"));
}

#[test]
fn generate_requires_a_prompt() {
    scenesmith().arg("generate").assert().failure();
}

#[test]
fn unknown_subcommand_fails() {
    scenesmith().arg("transmogrify").assert().failure();
}
