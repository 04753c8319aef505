use anyhow::{Context, Result};
use log::{info, warn};
use shared::{
    unique_header, Fields, ImportMode, Outcome, Record, RecordId, Table, Value, ID_COLUMN, RESERVED_COLUMNS,
};
use std::sync::{Arc, Mutex};

use super::connection::{SheetsConnection, Worksheet};
use crate::storage::clock::{Clock, SystemClock};
use crate::storage::records;
use crate::storage::traits::{column_not_found, failure, record_not_found, RecordStorage};

/// Worksheet contents as loaded: the table plus the header row exactly as it
/// is on the sheet, which may lack the reserved columns the table has.
struct Loaded {
    table: Table,
    sheet_header: Vec<String>,
}

/// Google Sheets record repository.
///
/// Reads fetch the whole worksheet. Writes push only what changed where the
/// layout allows it: a header rewrite for new columns, an appended row for
/// new records, a single row update or row deletion otherwise.
pub struct SheetsRecordRepository {
    connection: SheetsConnection,
    clock: Arc<dyn Clock>,
    /// Last header seen, served by `list_columns` when the sheet is unreachable
    schema: Mutex<Vec<String>>,
}

fn reserved_columns() -> Vec<String> {
    RESERVED_COLUMNS.iter().map(|c| c.to_string()).collect()
}

fn row_values(record: &Record) -> Vec<Value> {
    record.values().cloned().collect()
}

/// Sheet row of the first record whose id cell is literally `id`
fn find_row(table: &Table, id: RecordId) -> Option<usize> {
    let literal = id.to_string();
    table
        .records()
        .iter()
        .position(|record| record.get(ID_COLUMN).is_some_and(|cell| cell.to_cell() == literal))
}

/// Records start on row 2
fn sheet_row(index: usize) -> usize {
    index + 2
}

impl SheetsRecordRepository {
    pub fn new(connection: SheetsConnection) -> Self {
        Self::with_clock(connection, Arc::new(SystemClock))
    }

    pub fn with_clock(connection: SheetsConnection, clock: Arc<dyn Clock>) -> Self {
        Self {
            connection,
            clock,
            schema: Mutex::new(reserved_columns()),
        }
    }

    fn worksheet(&self) -> &Worksheet {
        self.connection.worksheet()
    }

    fn remember_schema(&self, columns: &[String]) {
        let mut schema = self.schema.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *schema = columns.to_vec();
    }

    fn cached_schema(&self) -> Vec<String> {
        self.schema
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn load(&self) -> Result<Loaded> {
        let mut rows = self
            .worksheet()
            .get_all_values()
            .context("Failed to read worksheet")?
            .into_iter();

        let sheet_header = rows.next().unwrap_or_default();
        let cells = rows
            .map(|row| row.iter().map(|cell| Value::from_cell(cell)).collect())
            .collect();
        let mut table = Table::from_rows(&sheet_header, cells);
        table.ensure_reserved_columns();
        self.remember_schema(table.columns());

        Ok(Loaded { table, sheet_header })
    }

    /// Bring the sheet's header in line with `table`.
    ///
    /// Returns true when the whole worksheet had to be rewritten because the
    /// sheet's columns are not a prefix of the table's (a header without the
    /// reserved columns, or with repeated names); the caller then has nothing
    /// left to write.
    fn sync_schema(&self, sheet_header: &[String], table: &Table) -> Result<bool> {
        let columns = table.columns();
        if !columns.starts_with(sheet_header) {
            warn!(
                "Worksheet header {:?} does not match columns {:?}, rewriting the sheet",
                sheet_header, columns
            );
            self.rewrite(table)?;
            return Ok(true);
        }
        if columns.len() > sheet_header.len() {
            self.worksheet()
                .write_header(columns)
                .context("Failed to update header row")?;
            self.remember_schema(columns);
        }
        Ok(false)
    }

    fn rewrite(&self, table: &Table) -> Result<()> {
        let worksheet = self.worksheet();
        worksheet.clear().context("Failed to clear worksheet")?;
        worksheet
            .write_header(table.columns())
            .context("Failed to write header row")?;
        let rows: Vec<Vec<Value>> = table.records().iter().map(row_values).collect();
        worksheet.append_rows(&rows).context("Failed to write records")?;
        self.remember_schema(table.columns());
        Ok(())
    }

    fn try_add(&self, fields: &Fields) -> Result<RecordId> {
        let Loaded { mut table, sheet_header } = self.load()?;
        let id = records::add_record(&mut table, fields, &self.clock.timestamp());

        if !self.sync_schema(&sheet_header, &table)? {
            let added = table.get(id).map(row_values).unwrap_or_default();
            self.worksheet()
                .append_rows(&[added])
                .context("Failed to append record")?;
        }
        info!("Added record {} to worksheet '{}'", id, self.worksheet().title());
        Ok(id)
    }

    fn try_update(&self, id: RecordId, fields: &Fields) -> Result<bool> {
        let Loaded { mut table, sheet_header } = self.load()?;
        let Some(index) = find_row(&table, id) else {
            return Ok(false);
        };
        records::update_at(&mut table, index, fields, &self.clock.timestamp());

        if !self.sync_schema(&sheet_header, &table)? {
            let row = row_values(&table.records()[index]);
            self.worksheet()
                .update_row(sheet_row(index), &row)
                .with_context(|| format!("Failed to write row {}", sheet_row(index)))?;
        }
        info!("Updated record {} in worksheet '{}'", id, self.worksheet().title());
        Ok(true)
    }

    fn try_delete(&self, id: RecordId) -> Result<bool> {
        let Loaded { table, .. } = self.load()?;
        let Some(index) = find_row(&table, id) else {
            return Ok(false);
        };
        self.worksheet()
            .delete_row(sheet_row(index))
            .with_context(|| format!("Failed to delete row {}", sheet_row(index)))?;
        info!("Deleted record {} from worksheet '{}'", id, self.worksheet().title());
        Ok(true)
    }

    fn try_bulk_import(&self, rows: &Table, mode: ImportMode) -> Result<()> {
        let timestamp = self.clock.timestamp();
        let assigned = match mode {
            ImportMode::Append => {
                let Loaded { mut table, sheet_header } = self.load()?;
                let existing = table.len();
                let assigned = records::import_rows(&mut table, rows, mode, &timestamp);
                if !self.sync_schema(&sheet_header, &table)? {
                    let new_rows: Vec<Vec<Value>> =
                        table.records()[existing..].iter().map(row_values).collect();
                    self.worksheet()
                        .append_rows(&new_rows)
                        .context("Failed to append imported records")?;
                }
                assigned
            }
            ImportMode::Replace => {
                let mut table = Table::new();
                let assigned = records::import_rows(&mut table, rows, mode, &timestamp);
                self.rewrite(&table)?;
                assigned
            }
        };
        info!(
            "Imported {} records ({}) into worksheet '{}', ids {:?}",
            rows.len(),
            mode,
            self.worksheet().title(),
            assigned
        );
        Ok(())
    }

    fn try_list_columns(&self) -> Result<Vec<String>> {
        let header = self.worksheet().header().context("Failed to read header row")?;
        let mut table = Table::with_columns(unique_header(&header));
        table.ensure_reserved_columns();
        self.remember_schema(table.columns());
        Ok(table.columns().to_vec())
    }
}

impl RecordStorage for SheetsRecordRepository {
    fn read_all(&self) -> Outcome<Table> {
        match self.load() {
            Ok(loaded) => Outcome::ok(loaded.table),
            Err(e) => failure("reading from Google Sheets", Table::new(), &e),
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
        match self.load() {
            Ok(loaded) => match loaded.table.filter_eq(column, value) {
                Some(found) => Outcome::ok(found),
                None => column_not_found(column),
            },
            Err(e) => failure("searching", Table::new(), &e),
        }
    }

    fn list_columns(&self) -> Outcome<Vec<String>> {
        match self.try_list_columns() {
            Ok(columns) => Outcome::ok(columns),
            Err(e) => failure("getting columns", self.cached_schema(), &e),
        }
    }

    fn bulk_import(&self, rows: &Table, mode: ImportMode) -> Outcome<bool> {
        match self.try_bulk_import(rows, mode) {
            Ok(()) => Outcome::ok(true),
            Err(e) => failure("importing data", false, &e),
        }
    }

    fn location(&self) -> String {
        self.connection.url()
    }
}
