use std::path::PathBuf;

use tempfile::{Builder, TempDir};

const TEST_PREFIX: &str = "cardimg-tests-";

pub fn dir() -> (TempDir, PathBuf) {
    let dir = Builder::new().prefix(TEST_PREFIX).tempdir().unwrap();
    let path = dir.path().canonicalize().unwrap();
    (dir, path)
}
