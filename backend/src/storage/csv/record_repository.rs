use anyhow::Result;
use log::info;
use shared::{Fields, ImportMode, Outcome, RecordId, Table, Value, RESERVED_COLUMNS};
use std::sync::Arc;

use super::connection::CsvConnection;
use crate::storage::clock::{Clock, SystemClock};
use crate::storage::records;
use crate::storage::traits::{column_not_found, failure, record_not_found, RecordStorage};

/// CSV-based record repository.
///
/// Every operation loads the entire file, applies the change in memory and
/// rewrites the file.
#[derive(Clone)]
pub struct CsvRecordRepository {
    connection: CsvConnection,
    clock: Arc<dyn Clock>,
}

impl CsvRecordRepository {
    /// Create a new CSV record repository stamping records with the system clock
    pub fn new(connection: CsvConnection) -> Self {
        Self::with_clock(connection, Arc::new(SystemClock))
    }

    pub fn with_clock(connection: CsvConnection, clock: Arc<dyn Clock>) -> Self {
        Self { connection, clock }
    }

    fn try_add(&self, fields: &Fields) -> Result<RecordId> {
        let mut table = self.connection.load_table()?;
        let id = records::add_record(&mut table, fields, &self.clock.timestamp());
        self.connection.save_table(&table)?;
        info!("Added record {} to {}", id, self.connection.file_path().display());
        Ok(id)
    }

    fn try_update(&self, id: RecordId, fields: &Fields) -> Result<bool> {
        let mut table = self.connection.load_table()?;
        if !records::update_record(&mut table, id, fields, &self.clock.timestamp()) {
            return Ok(false);
        }
        self.connection.save_table(&table)?;
        info!("Updated record {} in {}", id, self.connection.file_path().display());
        Ok(true)
    }

    fn try_delete(&self, id: RecordId) -> Result<bool> {
        let mut table = self.connection.load_table()?;
        if !records::delete_record(&mut table, id) {
            return Ok(false);
        }
        self.connection.save_table(&table)?;
        info!("Deleted record {} from {}", id, self.connection.file_path().display());
        Ok(true)
    }

    fn try_bulk_import(&self, rows: &Table, mode: ImportMode) -> Result<()> {
        let mut table = match mode {
            ImportMode::Append => self.connection.load_table()?,
            ImportMode::Replace => Table::new(),
        };
        let assigned = records::import_rows(&mut table, rows, mode, &self.clock.timestamp());
        self.connection.save_table(&table)?;
        info!(
            "Imported {} records ({}) into {}, ids {:?}",
            rows.len(),
            mode,
            self.connection.file_path().display(),
            assigned
        );
        Ok(())
    }
}

impl RecordStorage for CsvRecordRepository {
    fn read_all(&self) -> Outcome<Table> {
        match self.connection.load_table() {
            Ok(table) => Outcome::ok(table),
            Err(e) => failure("reading CSV", Table::new(), &e),
        }
    }

    fn add(&self, fields: &Fields) -> Outcome<Option<RecordId>> {
        match self.try_add(fields) {
            Ok(id) => Outcome::ok(Some(id)),
            Err(e) => failure("adding record", None, &e),
        }
    }

    fn update(&self, id: RecordId, fields: &Fields) -> Outcome<bool> {
        match self.try_update(id, fields) {
            Ok(true) => Outcome::ok(true),
            Ok(false) => record_not_found(id),
            Err(e) => failure("updating record", false, &e),
        }
    }

    fn delete(&self, id: RecordId) -> Outcome<bool> {
        match self.try_delete(id) {
            Ok(true) => Outcome::ok(true),
            Ok(false) => record_not_found(id),
            Err(e) => failure("deleting record", false, &e),
        }
    }

    fn search(&self, column: &str, value: &Value) -> Outcome<Table> {
        match self.connection.load_table() {
            Ok(table) => match table.filter_eq(column, value) {
                Some(found) => Outcome::ok(found),
                None => column_not_found(column),
            },
            Err(e) => failure("searching", Table::new(), &e),
        }
    }

    fn list_columns(&self) -> Outcome<Vec<String>> {
        match self.connection.load_table() {
            Ok(table) => Outcome::ok(table.columns().to_vec()),
            Err(e) => failure(
                "getting columns",
                RESERVED_COLUMNS.iter().map(|c| c.to_string()).collect(),
                &e,
            ),
        }
    }

    fn bulk_import(&self, rows: &Table, mode: ImportMode) -> Outcome<bool> {
        match self.try_bulk_import(rows, mode) {
            Ok(()) => Outcome::ok(true),
            Err(e) => failure("importing data", false, &e),
        }
    }

    fn location(&self) -> String {
        self.connection.file_path().display().to_string()
    }
}
