#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};
use weather_reconcile::frame::Table;

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Builds a table from raw text cells, as if read from CSV.
pub fn raw_table(name: &str, headers: &[&str], rows: &[&[&str]]) -> Table {
    let headers = headers.iter().map(|h| h.to_string()).collect::<Vec<_>>();
    let rows = rows
        .iter()
        .map(|row| row.iter().map(|c| c.to_string()).collect())
        .collect::<Vec<Vec<String>>>();
    Table::from_rows(name, &headers, &rows)
}

pub fn numbers(table: &Table, column: &str) -> Vec<Option<f64>> {
    table
        .column(column)
        .unwrap_or_else(|| panic!("column '{column}' missing"))
        .numbers()
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    /// Copies a `tests/data` fixture into the workspace under the same name.
    pub fn copy_fixture(&self, name: &str) -> PathBuf {
        let target = self.temp_dir.path().join(name);
        std::fs::copy(fixture_path(name), &target).expect("copy fixture");
        target
    }
}
