//! # Storage Traits
//!
//! The record storage contract that the CSV and Google Sheets backends
//! implement identically.

use log::{error, warn};
use shared::{Fields, ImportMode, Outcome, RecordId, Table, Value};

/// Trait defining the interface for record storage operations
///
/// All operations are synchronous and block until the file or network
/// round-trip completes. None of them return an error: "not found", "empty"
/// and "unknown column" come back as `false` / empty values, and environmental
/// failures are logged and reported through [`Outcome::diagnostic`].
pub trait RecordStorage: Send + Sync {
    /// All records in table order.
    /// An empty table still reports at least the `id` and `timestamp` columns.
    fn read_all(&self) -> Outcome<Table>;

    /// Store a new record, assigning the next id and the current timestamp.
    /// Keys not yet in the schema become new columns.
    /// Returns the assigned id, or `None` if the record could not be stored.
    fn add(&self, fields: &Fields) -> Outcome<Option<RecordId>>;

    /// Overwrite the given keys of an existing record and refresh its timestamp.
    /// The `id` is never changed. Returns false if the id does not exist.
    fn update(&self, id: RecordId, fields: &Fields) -> Outcome<bool>;

    /// Delete a single record. Remaining ids are left untouched.
    /// Returns false if the id does not exist.
    fn delete(&self, id: RecordId) -> Outcome<bool>;

    /// Records whose `column` equals `value` exactly
    fn search(&self, column: &str, value: &Value) -> Outcome<Table>;

    /// Current ordered column set, reserved columns included
    fn list_columns(&self) -> Outcome<Vec<String>>;

    /// Import many rows at once, either after the existing records or in
    /// place of them. All imported rows share one timestamp.
    fn bulk_import(&self, rows: &Table, mode: ImportMode) -> Outcome<bool>;

    /// Human-readable location of the table (file path or spreadsheet URL)
    fn location(&self) -> String;
}

/// Log an environmental failure and turn it into an outcome carrying `fallback`
pub(crate) fn failure<T>(action: &str, fallback: T, err: &anyhow::Error) -> Outcome<T> {
    let diagnostic = format!("Error {}: {:#}", action, err);
    error!("{}", diagnostic);
    Outcome::with_diagnostic(fallback, diagnostic)
}

/// Expected "nothing there" result, logged at warn level
pub(crate) fn not_found<T>(fallback: T, diagnostic: String) -> Outcome<T> {
    warn!("{}", diagnostic);
    Outcome::with_diagnostic(fallback, diagnostic)
}

pub(crate) fn record_not_found(id: RecordId) -> Outcome<bool> {
    not_found(false, format!("Record with ID {} not found", id))
}

pub(crate) fn column_not_found(column: &str) -> Outcome<Table> {
    not_found(Table::new(), format!("Column {} not found", column))
}
