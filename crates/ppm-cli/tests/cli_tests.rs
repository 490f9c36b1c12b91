//! End-to-end tests that run the built `ppm` binary against a
//! throwaway prefix directory.

use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;
use tempfile::TempDir;

fn ppm() -> Command {
    Command::new(cargo_bin!("ppm"))
}

#[test]
fn help_lists_every_subcommand() {
    ppm()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("install"))
        .stdout(predicate::str::contains("remove"))
        .stdout(predicate::str::contains("upgrade"))
        .stdout(predicate::str::contains("autoremove"))
        .stdout(predicate::str::contains("rdepends"));
}

#[test]
fn version_prints_something() {
    ppm().arg("--version").assert().success();
}

#[test]
fn fresh_prefix_with_no_repositories_fails_validation() {
    let prefix = TempDir::new().unwrap();
    ppm()
        .args(["--prefix", prefix.path().to_str().unwrap(), "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no repositories configured"));
}

#[test]
fn prefix_local_config_is_picked_up() {
    let prefix = TempDir::new().unwrap();
    std::fs::create_dir_all(prefix.path().join("etc")).unwrap();
    std::fs::write(
        prefix.path().join("etc/mmpack-config.yaml"),
        "repositories:\n  - name: main\n    url: https://repo.invalid/index\n",
    )
    .unwrap();

    // No network reachable in this sandbox, but the config must parse
    // and validate before the engine even attempts to fetch.
    ppm()
        .args(["--prefix", prefix.path().to_str().unwrap(), "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("main").or(predicate::str::contains("fetching")));
}

#[test]
fn nonexistent_prefix_path_is_a_clean_error() {
    ppm()
        .args(["--prefix", "/nonexistent/does-not-exist", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("resolving prefix path"));
}
