//! CLI integration tests using assert_cmd.
//!
//! These tests run the binary against a temporary store and use `env` as the
//! child command to observe the injected environment.

mod common;

use common::{create_store, db_store, shadow_exec};
use predicates::prelude::*;

#[test]
fn test_cli_help_flag() {
    let mut cmd = assert_cmd::cargo_bin_cmd!("shadow-exec");
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("secrets injected"));
}

#[test]
fn test_exec_requires_separator() {
    let store = db_store();
    shadow_exec(store.path())
        .args(["exec", "app", "env"])
        .assert()
        .failure();
}

#[cfg(unix)]
#[test]
fn test_exec_injects_secrets() {
    let store = db_store();
    shadow_exec(store.path())
        .env("HOME", "/tmp")
        .args(["exec", "app", "--", "env"])
        .assert()
        .success()
        .stdout(predicate::str::contains("DB_USERNAME=root"))
        .stdout(predicate::str::contains("DB_PASSWORD=hunter22"))
        .stdout(predicate::str::contains("HOME=/tmp"));
}

#[cfg(unix)]
#[test]
fn test_exec_warns_on_overwrite() {
    let store = db_store();
    shadow_exec(store.path())
        .env("DB_USERNAME", "bert")
        .args(["exec", "app", "--", "env"])
        .assert()
        .success()
        .stdout(predicate::str::contains("DB_USERNAME=root"))
        .stderr(predicate::str::contains(
            "warning: service app overwriting environment variable DB_USERNAME",
        ));
}

#[cfg(unix)]
#[test]
fn test_exec_no_clobber() {
    let store = db_store();
    shadow_exec(store.path())
        .env("HOME", "/tmp")
        .env("DB_USERNAME", "bert")
        .args(["exec", "--no-clobber", "app", "--", "env"])
        .assert()
        .success()
        .stdout(predicate::str::contains("DB_USERNAME=bert"))
        .stdout(predicate::str::contains("DB_PASSWORD=hunter22"))
        .stderr(predicate::str::contains(
            "warning: Not overwriting existing environment variable DB_USERNAME from service app",
        ));
}

#[cfg(unix)]
#[test]
fn test_exec_strict_fails_on_extra_sentinel() {
    let store = db_store();
    shadow_exec(store.path())
        .env("HOME", "/tmp")
        .env("DB_USERNAME", "chamberme")
        .env("DB_PASSWORD", "chamberme")
        .env("EXTRA", "chamberme")
        .args(["exec", "--strict", "app", "--", "env"])
        .assert()
        .code(125)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("extra unfilled env var EXTRA"));
}

#[cfg(unix)]
#[test]
fn test_exec_strict_pristine() {
    let store = db_store();
    let output = shadow_exec(store.path())
        .env("HOME", "/tmp")
        .env("DB_USERNAME", "chamberme")
        .env("DB_PASSWORD", "chamberme")
        .args(["exec", "--strict", "--pristine", "app", "--", "env"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let mut lines: Vec<String> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect();
    lines.sort();
    assert_eq!(lines, vec!["DB_PASSWORD=hunter22", "DB_USERNAME=root"]);
}

#[cfg(unix)]
#[test]
fn test_exec_custom_strict_value() {
    let store = db_store();
    shadow_exec(store.path())
        .env("DB_USERNAME", "REPLACE_ME")
        .env("DB_PASSWORD", "chamberme")
        .args(["exec", "--strict", "--strict-value", "REPLACE_ME", "app", "--", "env"])
        .assert()
        .success()
        .stdout(predicate::str::contains("DB_USERNAME=root"))
        .stdout(predicate::str::contains("DB_PASSWORD=chamberme"));
}

#[cfg(unix)]
#[test]
fn test_exec_later_service_wins() {
    let store = create_store(&[("base.env", "TOKEN=one\n"), ("override.env", "TOKEN=two\n")]);
    shadow_exec(store.path())
        .args(["exec", "base", "override", "--", "env"])
        .assert()
        .success()
        .stdout(predicate::str::contains("TOKEN=two"))
        .stderr(predicate::str::contains(
            "warning: service override overwriting environment variable TOKEN",
        ));
}

#[cfg(unix)]
#[test]
fn test_exec_no_paths_keeps_keys() {
    let store = create_store(&[("app.yaml", "db_username: root\n")]);
    shadow_exec(store.path())
        .env("SHADOW_EXEC_NO_PATHS", "1")
        .args(["exec", "app", "--", "env"])
        .assert()
        .success()
        .stdout(predicate::str::contains("db_username=root"));
}

#[cfg(unix)]
#[test]
fn test_exec_propagates_child_exit_code() {
    let store = db_store();
    shadow_exec(store.path())
        .args(["exec", "app", "--", "sh", "-c", "exit 42"])
        .assert()
        .code(42);
}

#[test]
fn test_exec_invalid_service() {
    let store = db_store();
    shadow_exec(store.path())
        .args(["exec", "../etc", "--", "env"])
        .assert()
        .code(125)
        .stderr(predicate::str::contains("invalid service '../etc'"));
}

#[test]
fn test_exec_missing_service() {
    let store = db_store();
    shadow_exec(store.path())
        .args(["exec", "nope", "--", "env"])
        .assert()
        .code(125)
        .stderr(predicate::str::contains("no secrets found for service 'nope'"));
}

#[test]
fn test_exec_command_not_found() {
    let store = db_store();
    shadow_exec(store.path())
        .args(["exec", "app", "--", "definitely-not-a-real-command-xyz"])
        .assert()
        .code(127)
        .stderr(predicate::str::contains("command not found"));
}

#[test]
fn test_exec_normalization_collision() {
    let store = create_store(&[("app.yaml", "db:\n  password: a\ndb-password: b\n")]);
    shadow_exec(store.path())
        .args(["exec", "app", "--", "env"])
        .assert()
        .code(125)
        .stderr(predicate::str::contains("both map to variable DB_PASSWORD"));
}

#[test]
fn test_doctor_reports_store() {
    let store = db_store();
    shadow_exec(store.path())
        .arg("doctor")
        .assert()
        .success()
        .stdout(predicate::str::contains("Shadow Exec Doctor"))
        .stdout(predicate::str::contains("All checks passed"));
}

#[test]
fn test_doctor_missing_store() {
    let store = db_store();
    shadow_exec(store.path())
        .args(["doctor", "--store", "/nonexistent/shadow-exec-store"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Store directory not found"));
}

#[test]
fn test_config_file_sets_strict_value() {
    let store = db_store();
    std::fs::write(
        store.path().join("shadow-exec.yaml"),
        "strict_value: FILL_ME\n",
    )
    .unwrap();

    shadow_exec(store.path())
        .env("EXTRA", "FILL_ME")
        .args(["exec", "--strict", "app", "--", "env"])
        .assert()
        .code(125)
        .stderr(predicate::str::contains("extra unfilled env var EXTRA"));
}
