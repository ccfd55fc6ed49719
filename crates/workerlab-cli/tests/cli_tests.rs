//! CLI integration tests using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn workerlab() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("workerlab").unwrap()
}

#[test]
fn validate_single_exercise() {
    workerlab()
        .arg("validate")
        .arg("--exercise")
        .arg("../../exercises/query-params.toml")
        .assert()
        .success()
        .stdout(predicate::str::contains("Query Parameters (3 tests)"))
        .stdout(predicate::str::contains("All exercises valid"));
}

#[test]
fn validate_directory() {
    workerlab()
        .arg("validate")
        .arg("--exercise")
        .arg("../../exercises")
        .assert()
        .success()
        .stdout(predicate::str::contains("Your First Worker"))
        .stdout(predicate::str::contains("URL Routing (4 tests)"))
        .stdout(predicate::str::contains("Error Handling"));
}

#[test]
fn validate_reports_warnings() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sloppy.toml");
    std::fs::write(
        &path,
        r#"
[exercise]
id = "sloppy"
title = "Sloppy"
solution = "export default {}"

[[tests]]
name = "no criteria"
request = { path = "/" }
"#,
    )
    .unwrap();

    workerlab()
        .arg("validate")
        .arg("--exercise")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("[no criteria] WARNING"))
        .stdout(predicate::str::contains("1 warning(s) found"));
}

#[test]
fn validate_nonexistent_file() {
    workerlab()
        .arg("validate")
        .arg("--exercise")
        .arg("nonexistent.toml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn init_creates_files() {
    let dir = TempDir::new().unwrap();

    workerlab()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created workerlab.toml"))
        .stdout(predicate::str::contains("Created exercises/hello-world.toml"));

    assert!(dir.path().join("workerlab.toml").exists());
    assert!(dir.path().join("exercises/hello-world.toml").exists());

    // The generated exercise must itself validate cleanly.
    workerlab()
        .current_dir(dir.path())
        .arg("validate")
        .arg("--exercise")
        .arg("exercises")
        .assert()
        .success()
        .stdout(predicate::str::contains("All exercises valid"));
}

#[test]
fn init_skips_existing() {
    let dir = TempDir::new().unwrap();

    workerlab()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success();

    workerlab()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn check_missing_exercise_fails() {
    workerlab()
        .arg("check")
        .arg("--exercise")
        .arg("no_such_exercise.toml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read exercise file"));
}

#[test]
fn check_with_missing_runtime_is_a_harness_error() {
    workerlab()
        .env("WORKERLAB_DENO", "/nonexistent/bin/deno")
        .arg("check")
        .arg("--exercise")
        .arg("../../exercises/hello-world.toml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to provision sandbox"));
}

#[test]
fn run_with_empty_module_is_rejected() {
    let dir = TempDir::new().unwrap();
    let code = dir.path().join("empty.js");
    std::fs::write(&code, "   \n").unwrap();

    workerlab()
        .arg("run")
        .arg("--code")
        .arg(&code)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid submission"));
}

#[test]
fn missing_config_file_fails() {
    workerlab()
        .arg("run")
        .arg("--code")
        .arg("whatever.js")
        .arg("--config")
        .arg("/nonexistent/workerlab.toml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("config file not found"));
}

#[test]
fn help_output() {
    workerlab()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("fetch-handler exercises"));
}

#[test]
fn version_output() {
    workerlab()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("workerlab"));
}
