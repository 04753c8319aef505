//! Test utilities for the CSV backend
//!
//! RAII-based cleanup guarantees the test file is removed even if a test
//! panics: the temporary directory lives exactly as long as the environment.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use super::connection::CsvConnection;
use super::record_repository::CsvRecordRepository;
use crate::storage::clock::ManualClock;

/// RAII test environment that automatically cleans up on drop
pub struct TestEnvironment {
    /// The temporary directory - kept alive to prevent auto-cleanup until drop
    _temp_dir: TempDir,
    pub connection: CsvConnection,
    pub repository: CsvRecordRepository,
    /// Clock used by `repository`, starting at 2025-01-21 19:30:00
    pub clock: Arc<ManualClock>,
}

impl TestEnvironment {
    /// Create a new test environment with a fresh `records.csv`
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let connection = CsvConnection::new(temp_dir.path().join("records.csv"))?;
        let clock = Arc::new(ManualClock::default());
        let repository = CsvRecordRepository::with_clock(connection.clone(), clock.clone());

        Ok(TestEnvironment {
            _temp_dir: temp_dir,
            connection,
            repository,
            clock,
        })
    }

    pub fn file_path(&self) -> &Path {
        self.connection.file_path()
    }

    /// A path inside the environment's directory, for import/export files
    pub fn sibling(&self, name: &str) -> PathBuf {
        self._temp_dir.path().join(name)
    }
}
