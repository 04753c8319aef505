use anyhow::{Context, Result};
use log::{debug, info};
use shared::{Table, RESERVED_COLUMNS};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use super::codec;
use crate::storage::StorageError;

/// CsvConnection owns the path of the backing file and makes sure it exists
#[derive(Debug, Clone)]
pub struct CsvConnection {
    file_path: PathBuf,
}

impl CsvConnection {
    /// Create a new CSV connection, creating the file (and its directory)
    /// with just the reserved header if it does not exist yet
    pub fn new<P: AsRef<Path>>(file_path: P) -> Result<Self> {
        let connection = Self {
            file_path: file_path.as_ref().to_path_buf(),
        };
        connection.ensure_file_exists()?;
        Ok(connection)
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Ensure the CSV file exists with a header line
    pub fn ensure_file_exists(&self) -> Result<()> {
        if self.file_path.exists() {
            return Ok(());
        }

        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
                info!("Created data directory: {}", parent.display());
            }
        }

        let header = format!("{}\n", RESERVED_COLUMNS.join(","));
        fs::write(&self.file_path, header).map_err(|e| StorageError::io(&self.file_path, e))?;
        info!("Created CSV database at {}", self.file_path.display());
        Ok(())
    }

    /// Load the whole table; `id` and `timestamp` are always present in the result
    pub fn load_table(&self) -> Result<Table> {
        self.ensure_file_exists()?;

        let file = File::open(&self.file_path).map_err(|e| StorageError::io(&self.file_path, e))?;
        let mut table = codec::read_table(BufReader::new(file))
            .with_context(|| format!("Failed to parse {}", self.file_path.display()))?;
        table.ensure_reserved_columns();

        debug!("Loaded {} records from {}", table.len(), self.file_path.display());
        Ok(table)
    }

    /// Rewrite the whole file with `table`
    pub fn save_table(&self, table: &Table) -> Result<()> {
        // Write to a sibling temp file, then move it over the real one
        let temp_path = self.temp_path();

        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .map_err(|e| StorageError::io(&temp_path, e))?;
            codec::write_table(BufWriter::new(file), table)
                .with_context(|| format!("Failed to write {}", temp_path.display()))?;
        }

        fs::rename(&temp_path, &self.file_path).map_err(|e| StorageError::io(&self.file_path, e))?;

        debug!("Saved {} records to {}", table.len(), self.file_path.display());
        Ok(())
    }

    /// `<file name>.tmp` next to the backing file
    fn temp_path(&self) -> PathBuf {
        let mut temp = self.file_path.clone().into_os_string();
        temp.push(".tmp");
        PathBuf::from(temp)
    }
}
