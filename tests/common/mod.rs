//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Create a store directory holding the given service documents.
///
/// Each entry is `(relative file name, content)`, e.g. `("app.yaml", "k: v")`.
pub fn create_store(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, content) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }
    dir
}

/// Store with a single `app` service holding database credentials.
pub fn db_store() -> TempDir {
    create_store(&[("app.yaml", "db_username: root\ndb_password: hunter22\n")])
}

/// The `shadow-exec` binary with a cleared environment pointing at `store`.
///
/// `PATH` is kept so that the child command can be resolved.
pub fn shadow_exec(store: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo_bin_cmd!("shadow-exec");
    cmd.env_clear()
        .env("PATH", std::env::var("PATH").unwrap_or_default())
        .env("SHADOW_EXEC_STORE", store)
        .current_dir(store);
    cmd
}
