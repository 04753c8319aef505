//! In-memory [`SheetsApi`] used by the sheet backend tests.
//!
//! Mirrors the behaviour of the real API that the backend depends on: grid
//! limits on updates, appends that insert rows after the last data row,
//! trailing blanks trimmed from reads, new spreadsheets starting with a
//! `Sheet1` tab.

use shared::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use super::a1::A1Range;
use super::api::{SheetsApi, WorksheetProperties};
use crate::storage::StorageError;

struct Sheet {
    properties: WorksheetProperties,
    cells: Vec<Vec<String>>,
}

struct Spreadsheet {
    id: String,
    name: String,
    sheets: Vec<Sheet>,
}

#[derive(Default)]
struct State {
    spreadsheets: Vec<Spreadsheet>,
    next_sheet_id: i64,
}

#[derive(Default)]
pub struct MemorySheetsApi {
    state: Mutex<State>,
    offline: AtomicBool,
    calls: AtomicUsize,
}

impl MemorySheetsApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail as if the network were down
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of API calls made so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn spreadsheet_count(&self) -> usize {
        self.state.lock().unwrap().spreadsheets.len()
    }

    /// Trimmed cell contents of a worksheet, for assertions
    pub fn rows(&self, spreadsheet_name: &str, title: &str) -> Vec<Vec<String>> {
        let state = self.state.lock().unwrap();
        state
            .spreadsheets
            .iter()
            .find(|s| s.name == spreadsheet_name)
            .and_then(|s| s.sheets.iter().find(|sheet| sheet.properties.title == title))
            .map(|sheet| trimmed(&sheet.cells))
            .unwrap_or_default()
    }

    pub fn properties(&self, spreadsheet_name: &str, title: &str) -> Option<WorksheetProperties> {
        let state = self.state.lock().unwrap();
        state
            .spreadsheets
            .iter()
            .find(|s| s.name == spreadsheet_name)
            .and_then(|s| s.sheets.iter().find(|sheet| sheet.properties.title == title))
            .map(|sheet| sheet.properties.clone())
    }

    /// Write raw cells directly, bypassing the API (row 1 is the header)
    pub fn seed(&self, spreadsheet_name: &str, title: &str, rows: &[&[&str]]) {
        let mut state = self.state.lock().unwrap();
        let sheet = state
            .spreadsheets
            .iter_mut()
            .find(|s| s.name == spreadsheet_name)
            .and_then(|s| s.sheets.iter_mut().find(|sheet| sheet.properties.title == title))
            .expect("seeded worksheet should exist");
        for row in sheet.cells.iter_mut() {
            row.clear();
        }
        for (index, row) in rows.iter().enumerate() {
            sheet.cells[index] = row.iter().map(|cell| cell.to_string()).collect();
        }
    }

    fn check(&self) -> Result<(), StorageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(StorageError::Http {
                status: 503,
                message: "The service is currently unavailable.".to_string(),
            });
        }
        Ok(())
    }
}

fn not_found(what: &str) -> StorageError {
    StorageError::Http {
        status: 404,
        message: format!("{} not found", what),
    }
}

fn grid_limit(range: &A1Range) -> StorageError {
    StorageError::Http {
        status: 400,
        message: format!("Range ({}) exceeds grid limits", range),
    }
}

fn trimmed(cells: &[Vec<String>]) -> Vec<Vec<String>> {
    let mut rows: Vec<Vec<String>> = cells
        .iter()
        .map(|row| {
            let len = row.iter().rposition(|cell| !cell.is_empty()).map_or(0, |i| i + 1);
            row[..len].to_vec()
        })
        .collect();
    while rows.last().is_some_and(|row| row.is_empty()) {
        rows.pop();
    }
    rows
}

fn new_sheet(sheet_id: i64, title: &str, rows: usize, columns: usize) -> Sheet {
    Sheet {
        properties: WorksheetProperties {
            sheet_id,
            title: title.to_string(),
            row_count: rows,
            column_count: columns,
        },
        cells: vec![Vec::new(); rows],
    }
}

fn write_cell(row: &mut Vec<String>, column: usize, value: String) {
    if row.len() < column {
        row.resize(column, String::new());
    }
    row[column - 1] = value;
}

impl State {
    fn spreadsheet_mut(&mut self, spreadsheet_id: &str) -> Result<&mut Spreadsheet, StorageError> {
        self.spreadsheets
            .iter_mut()
            .find(|s| s.id == spreadsheet_id)
            .ok_or_else(|| not_found("Spreadsheet"))
    }

    fn sheet_by_title(&mut self, spreadsheet_id: &str, title: &str) -> Result<&mut Sheet, StorageError> {
        self.spreadsheet_mut(spreadsheet_id)?
            .sheets
            .iter_mut()
            .find(|sheet| sheet.properties.title == title)
            .ok_or_else(|| not_found("Worksheet"))
    }

    fn sheet_by_id(&mut self, spreadsheet_id: &str, sheet_id: i64) -> Result<&mut Sheet, StorageError> {
        self.spreadsheet_mut(spreadsheet_id)?
            .sheets
            .iter_mut()
            .find(|sheet| sheet.properties.sheet_id == sheet_id)
            .ok_or_else(|| not_found("Worksheet"))
    }
}

impl SheetsApi for MemorySheetsApi {
    fn find_spreadsheet(&self, name: &str) -> Result<Option<String>, StorageError> {
        self.check()?;
        let state = self.state.lock().unwrap();
        Ok(state.spreadsheets.iter().find(|s| s.name == name).map(|s| s.id.clone()))
    }

    fn create_spreadsheet(&self, name: &str) -> Result<String, StorageError> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        let id = format!("spreadsheet-{}", state.spreadsheets.len() + 1);
        let sheet_id = state.next_sheet_id;
        state.next_sheet_id += 1;
        state.spreadsheets.push(Spreadsheet {
            id: id.clone(),
            name: name.to_string(),
            sheets: vec![new_sheet(sheet_id, "Sheet1", 1000, 26)],
        });
        Ok(id)
    }

    fn worksheets(&self, spreadsheet_id: &str) -> Result<Vec<WorksheetProperties>, StorageError> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        let spreadsheet = state.spreadsheet_mut(spreadsheet_id)?;
        Ok(spreadsheet.sheets.iter().map(|s| s.properties.clone()).collect())
    }

    fn add_worksheet(
        &self,
        spreadsheet_id: &str,
        title: &str,
        rows: usize,
        columns: usize,
    ) -> Result<WorksheetProperties, StorageError> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        let sheet_id = state.next_sheet_id;
        state.next_sheet_id += 1;
        let spreadsheet = state.spreadsheet_mut(spreadsheet_id)?;
        if spreadsheet.sheets.iter().any(|s| s.properties.title == title) {
            return Err(StorageError::Http {
                status: 400,
                message: format!("A sheet with the name \"{}\" already exists", title),
            });
        }
        let sheet = new_sheet(sheet_id, title, rows, columns);
        let properties = sheet.properties.clone();
        spreadsheet.sheets.push(sheet);
        Ok(properties)
    }

    fn append_columns(&self, spreadsheet_id: &str, sheet_id: i64, count: usize) -> Result<(), StorageError> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        state.sheet_by_id(spreadsheet_id, sheet_id)?.properties.column_count += count;
        Ok(())
    }

    fn get_values(&self, spreadsheet_id: &str, range: &A1Range) -> Result<Vec<Vec<String>>, StorageError> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        let sheet = state.sheet_by_title(spreadsheet_id, &range.sheet)?;
        let (first_row, first_column) = range.start.unwrap_or((1, 1));
        let (last_row, last_column) = range
            .end
            .unwrap_or((sheet.properties.row_count, sheet.properties.column_count));

        let window: Vec<Vec<String>> = sheet
            .cells
            .iter()
            .skip(first_row - 1)
            .take(last_row + 1 - first_row)
            .map(|row| {
                row.iter()
                    .skip(first_column - 1)
                    .take(last_column + 1 - first_column)
                    .cloned()
                    .collect()
            })
            .collect();
        Ok(trimmed(&window))
    }

    fn update_values(&self, spreadsheet_id: &str, range: &A1Range, rows: &[Vec<Value>]) -> Result<(), StorageError> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        let sheet = state.sheet_by_title(spreadsheet_id, &range.sheet)?;
        let (first_row, first_column) = range.start.unwrap_or((1, 1));
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);

        if first_row + rows.len() - 1 > sheet.properties.row_count
            || first_column + width - 1 > sheet.properties.column_count
        {
            return Err(grid_limit(range));
        }

        for (offset, values) in rows.iter().enumerate() {
            let row = &mut sheet.cells[first_row - 1 + offset];
            for (column_offset, value) in values.iter().enumerate() {
                write_cell(row, first_column + column_offset, value.to_cell());
            }
        }
        Ok(())
    }

    fn append_values(&self, spreadsheet_id: &str, range: &A1Range, rows: &[Vec<Value>]) -> Result<(), StorageError> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        let sheet = state.sheet_by_title(spreadsheet_id, &range.sheet)?;
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        if width > sheet.properties.column_count {
            return Err(grid_limit(range));
        }

        let insert_at = trimmed(&sheet.cells).len();
        for (offset, values) in rows.iter().enumerate() {
            let row = values.iter().map(Value::to_cell).collect();
            sheet.cells.insert(insert_at + offset, row);
        }
        sheet.properties.row_count += rows.len();
        Ok(())
    }

    fn clear_values(&self, spreadsheet_id: &str, range: &A1Range) -> Result<(), StorageError> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        let sheet = state.sheet_by_title(spreadsheet_id, &range.sheet)?;
        for row in sheet.cells.iter_mut() {
            row.clear();
        }
        Ok(())
    }

    fn delete_rows(
        &self,
        spreadsheet_id: &str,
        sheet_id: i64,
        start_index: usize,
        end_index: usize,
    ) -> Result<(), StorageError> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        let sheet = state.sheet_by_id(spreadsheet_id, sheet_id)?;
        if end_index > sheet.cells.len() || start_index >= end_index {
            return Err(StorageError::Http {
                status: 400,
                message: "Invalid row range".to_string(),
            });
        }
        sheet.cells.drain(start_index..end_index);
        sheet.properties.row_count -= end_index - start_index;
        Ok(())
    }
}
