//! # Sheets API Trait
//!
//! The spreadsheet operations the remote backend needs, kept behind a trait so
//! that the record logic does not depend on HTTP. [`HttpSheetsApi`] talks to
//! Google; tests use an in-memory implementation.
//!
//! [`HttpSheetsApi`]: super::client::HttpSheetsApi

use shared::Value;

use super::a1::A1Range;
use crate::storage::StorageError;

/// Grid metadata of one worksheet (tab)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorksheetProperties {
    pub sheet_id: i64,
    pub title: String,
    pub row_count: usize,
    pub column_count: usize,
}

pub trait SheetsApi: Send + Sync {
    /// Id of the spreadsheet with this exact name, if one is visible
    fn find_spreadsheet(&self, name: &str) -> Result<Option<String>, StorageError>;

    /// Create a spreadsheet and return its id
    fn create_spreadsheet(&self, name: &str) -> Result<String, StorageError>;

    fn worksheets(&self, spreadsheet_id: &str) -> Result<Vec<WorksheetProperties>, StorageError>;

    fn add_worksheet(
        &self,
        spreadsheet_id: &str,
        title: &str,
        rows: usize,
        columns: usize,
    ) -> Result<WorksheetProperties, StorageError>;

    /// Grow the grid by `count` columns on the right
    fn append_columns(&self, spreadsheet_id: &str, sheet_id: i64, count: usize) -> Result<(), StorageError>;

    /// Cell values as displayed, row by row. Trailing empty cells and rows are
    /// omitted, as the Sheets API does.
    fn get_values(&self, spreadsheet_id: &str, range: &A1Range) -> Result<Vec<Vec<String>>, StorageError>;

    /// Overwrite cells starting at the range's anchor
    fn update_values(&self, spreadsheet_id: &str, range: &A1Range, rows: &[Vec<Value>]) -> Result<(), StorageError>;

    /// Insert rows after the last row holding data
    fn append_values(&self, spreadsheet_id: &str, range: &A1Range, rows: &[Vec<Value>]) -> Result<(), StorageError>;

    fn clear_values(&self, spreadsheet_id: &str, range: &A1Range) -> Result<(), StorageError>;

    /// Delete grid rows `start_index..end_index` (0-based, end exclusive)
    fn delete_rows(
        &self,
        spreadsheet_id: &str,
        sheet_id: i64,
        start_index: usize,
        end_index: usize,
    ) -> Result<(), StorageError>;
}
