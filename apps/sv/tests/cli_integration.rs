#![warn(clippy::pedantic)]

//! Integration tests for the sv CLI.
//!
//! These tests spawn the compiled `sv` binary with `SV_HOME` pointed at a
//! temporary directory and check stdout, stderr and exit codes. None of
//! them touch the network: `SV_BASE_URL` points at a closed local port.
//!
//! ## Test Strategy
//!
//! 1. **Help and version**: CLI metadata display
//! 2. **Informational outcomes**: exit 0 with a notice on stdout
//! 3. **Failures**: exit 1 with the error on stderr
//! 4. **Local switching**: `use` and `where` against a prepared cache
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p sv
//! ```

use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use predicates::prelude::*;
use std::process::Command;

/// Builds an `sv` command isolated in `home`.
fn sv(home: &assert_fs::TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("sv"));
    cmd.env("SV_HOME", home.path())
        .env("SV_BASE_URL", "http://127.0.0.1:9")
        .env("SV_HTTP_TIMEOUT", "1s")
        .env("SV_DOWNLOAD_RETRY", "1")
        .env_remove("RUST_LOG");
    cmd
}

/// Creates `cache/<tag>/bin/go` printing a fixed version line.
#[cfg(unix)]
fn fake_toolchain(home: &assert_fs::TempDir, tag: &str) {
    use std::os::unix::fs::PermissionsExt;

    let go = home.child("cache").child(tag).child("bin").child("go");
    go.write_str(&format!("#!/bin/sh\necho \"go version {tag} test\"\n"))
        .unwrap();
    std::fs::set_permissions(go.path(), std::fs::Permissions::from_mode(0o755)).unwrap();
}

// -- Help and version --

#[test]
fn help_lists_subcommands() {
    let home = assert_fs::TempDir::new().unwrap();
    sv(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("install"))
        .stdout(predicate::str::contains("prune"))
        .stdout(predicate::str::contains("SV_HOME"));
}

#[test]
fn version_flag_prints_package_version() {
    let home = assert_fs::TempDir::new().unwrap();
    sv(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn missing_subcommand_is_a_usage_error() {
    let home = assert_fs::TempDir::new().unwrap();
    sv(&home).assert().failure();
}

// -- Informational outcomes --

#[test]
fn list_with_empty_cache_is_informational() {
    let home = assert_fs::TempDir::new().unwrap();
    sv(&home)
        .arg("ls")
        .assert()
        .success()
        .stdout(predicate::str::contains("no versions installed locally"));
}

#[test]
fn current_without_active_version_is_informational() {
    let home = assert_fs::TempDir::new().unwrap();
    sv(&home)
        .arg("current")
        .assert()
        .success()
        .stdout(predicate::str::contains("no active Go version"));
}

#[test]
fn prune_with_nothing_to_remove_is_informational() {
    let home = assert_fs::TempDir::new().unwrap();
    sv(&home)
        .arg("prune")
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing to prune"));
}

#[test]
fn list_short_alias() {
    let home = assert_fs::TempDir::new().unwrap();
    sv(&home)
        .arg("l")
        .assert()
        .success()
        .stdout(predicate::str::contains("no versions installed locally"));
}

#[test]
fn first_run_creates_layout() {
    let home = assert_fs::TempDir::new().unwrap();
    sv(&home).arg("list").assert().success();

    home.child("bin").assert(predicate::path::is_dir());
    home.child("cache").assert(predicate::path::is_dir());
    home.child("downloads").assert(predicate::path::is_dir());
}

// -- Failures --

#[test]
fn uninstall_missing_version_fails() {
    let home = assert_fs::TempDir::new().unwrap();
    sv(&home)
        .args(["uninstall", "1.21.0"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("version go1.21.0 not found"));
}

#[test]
fn where_missing_version_fails() {
    let home = assert_fs::TempDir::new().unwrap();
    sv(&home)
        .args(["where", "go1.21.0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn use_missing_version_suggests_remote() {
    let home = assert_fs::TempDir::new().unwrap();
    sv(&home)
        .args(["use", "v1.21.0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("sv use go1.21.0 --remote"));
}

#[test]
fn latest_without_network_fails() {
    let home = assert_fs::TempDir::new().unwrap();
    sv(&home)
        .arg("latest")
        .assert()
        .failure()
        .stderr(predicate::str::contains("release catalog error"));
}

#[test]
fn install_rejects_tag_with_latest() {
    let home = assert_fs::TempDir::new().unwrap();
    sv(&home)
        .args(["install", "1.22.0", "--latest"])
        .assert()
        .failure()
        .code(2);
}

// -- Local switching --

#[test]
fn where_prints_cache_path() {
    let home = assert_fs::TempDir::new().unwrap();
    home.child("cache").child("go1.22.0").create_dir_all().unwrap();

    sv(&home)
        .args(["where", "1.22.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("go1.22.0"));
}

#[cfg(unix)]
#[test]
fn use_switches_between_cached_versions() {
    let home = assert_fs::TempDir::new().unwrap();
    fake_toolchain(&home, "go1.21.7");
    fake_toolchain(&home, "go1.22.0");

    sv(&home)
        .args(["use", "1.21.7"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Now using go1.21.7"))
        .stdout(predicate::str::contains("go version go1.21.7 test"));

    sv(&home)
        .args(["use", "go1.22.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Now using go1.22.0"));

    sv(&home)
        .arg("c")
        .assert()
        .success()
        .stdout(predicate::str::diff("go1.22.0\n"));

    sv(&home)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("* go1.22.0"))
        .stdout(predicate::str::contains("  go1.21.7"));
}

#[cfg(unix)]
#[test]
fn use_active_version_is_a_no_op() {
    let home = assert_fs::TempDir::new().unwrap();
    fake_toolchain(&home, "go1.22.0");

    sv(&home).args(["use", "1.22.0"]).assert().success();
    sv(&home)
        .args(["use", "1.22.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already in use"));
}

#[cfg(unix)]
#[test]
fn uninstall_active_version_is_refused() {
    let home = assert_fs::TempDir::new().unwrap();
    fake_toolchain(&home, "go1.22.0");

    sv(&home).args(["use", "1.22.0"]).assert().success();
    sv(&home)
        .args(["ui", "1.22.0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("currently in use"));
    home.child("cache").child("go1.22.0").assert(predicate::path::is_dir());
}

#[cfg(unix)]
#[test]
fn prune_dry_run_keeps_files() {
    let home = assert_fs::TempDir::new().unwrap();
    for tag in ["go1.20.0", "go1.21.0", "go1.22.0"] {
        fake_toolchain(&home, tag);
    }
    sv(&home).args(["use", "1.20.0"]).assert().success();

    // Two newest plus the active one: all three stay by default.
    sv(&home)
        .args(["prune", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing to prune"));

    sv(&home)
        .args(["prune", "-k", "1", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Would remove go1.21.0"))
        .stdout(predicate::str::contains("go1.22.0").not());
    home.child("cache").child("go1.21.0").assert(predicate::path::is_dir());

    sv(&home)
        .args(["prune", "-a"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed go1.22.0"))
        .stdout(predicate::str::contains("Removed go1.21.0"));
    home.child("cache").child("go1.20.0").assert(predicate::path::is_dir());
    home.child("cache").child("go1.22.0").assert(predicate::path::missing());
}
