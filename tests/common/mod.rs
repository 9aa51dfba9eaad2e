//! Common test utilities for rust-schemadiff tests

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use rust_schemadiff::diff::{diff, DiffOptions, MetadataDiff};
use rust_schemadiff::walk_through::{walk_through, WalkThroughOptions, WalkThroughReport};
use rust_schemadiff::{parse_to_metadata, DatabaseSnapshot};
use tempfile::TempDir;

/// Test context with temporary directory for isolated test execution
pub struct TestContext {
    /// Kept to prevent temp directory cleanup until TestContext is dropped
    _temp_dir: TempDir,
    pub dir: PathBuf,
}

impl TestContext {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let dir = temp_dir.path().to_path_buf();
        Self {
            _temp_dir: temp_dir,
            dir,
        }
    }

    /// Create a new test context holding a copy of a fixture directory
    pub fn with_fixture(fixture_name: &str) -> Self {
        let ctx = Self::new();
        for entry in fs::read_dir(fixture_path(fixture_name)).expect("Failed to read fixture") {
            let entry = entry.expect("Failed to read fixture entry");
            fs::copy(entry.path(), ctx.dir.join(entry.file_name())).expect("Failed to copy fixture");
        }
        ctx
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, content).expect("Failed to write test file");
        path
    }

    pub fn read(&self, name: &str) -> String {
        fs::read_to_string(self.path(name)).expect("Failed to read test file")
    }
}

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn read_fixture(dir: &str, file: &str) -> String {
    let path: &Path = &fixture_path(dir).join(file);
    fs::read_to_string(path).unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e))
}

/// Extract a snapshot, panicking with the parse error on failure
pub fn snapshot(sql: &str) -> DatabaseSnapshot {
    parse_to_metadata(sql).unwrap_or_else(|e| panic!("Failed to extract metadata: {}", e))
}

pub fn diff_of(before: &DatabaseSnapshot, after: &DatabaseSnapshot) -> MetadataDiff {
    diff(before, after, &DiffOptions::default()).expect("Diff failed")
}

/// Walk `script` through `snapshot` with default options
pub fn walk(snapshot: &mut DatabaseSnapshot, script: &str) -> WalkThroughReport {
    let statements = rust_schemadiff::parser::parse_sql(script).expect("Failed to parse script");
    walk_through(snapshot, &statements, &WalkThroughOptions::default())
}
