//! Test utilities for Cir
//!
//! Temporary directories, fixture files and session builders shared by the
//! unit tests.

use crate::session::{WorkingFile, YamlSessionStore};
use std::path::PathBuf;
use tempfile::TempDir;

/// Create a temporary directory for testing
///
/// The directory is removed when the returned `TempDir` is dropped.
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temporary directory")
}

/// Create a test file with the given content
///
/// # Panics
///
/// Panics if the file cannot be written
pub fn create_test_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create parent directory");
    }
    std::fs::write(&path, content).expect("Failed to write test file");
    path
}

/// Session store backed by `session.yaml` inside `dir`
pub fn session_store(dir: &TempDir) -> YamlSessionStore {
    YamlSessionStore::new(dir.path().join("session.yaml"))
}

/// Tracked file with the given checksum and loaded content
pub fn tracked_file(path: &str, checksum: Option<&str>, content: Option<&str>) -> WorkingFile {
    WorkingFile {
        path: PathBuf::from(path),
        last_submitted_checksum: checksum.map(str::to_string),
        content: content.map(str::to_string),
    }
}

/// Assert that an error message contains the expected text
///
/// # Panics
///
/// Panics if `error` does not contain `expected`
pub fn assert_error_contains(error: &anyhow::Error, expected: &str) {
    let message = format!("{:#}", error);
    assert!(
        message.contains(expected),
        "Expected error to contain '{}', got: {}",
        expected,
        message
    );
}
