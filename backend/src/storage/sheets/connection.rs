use anyhow::{Context, Result};
use log::{debug, info};
use shared::{Value, RESERVED_COLUMNS};
use std::sync::{Arc, Mutex, MutexGuard};

use super::a1::A1Range;
use super::api::{SheetsApi, WorksheetProperties};
use crate::storage::StorageError;

/// Grid size of a worksheet created by [`SheetsConnection::connect`]
pub const NEW_WORKSHEET_ROWS: usize = 1000;
pub const NEW_WORKSHEET_COLUMNS: usize = 26;

/// Browser URL of a spreadsheet
pub fn spreadsheet_url(spreadsheet_id: &str) -> String {
    format!("https://docs.google.com/spreadsheets/d/{}", spreadsheet_id)
}

/// One worksheet of an opened spreadsheet.
///
/// Keeps a copy of the grid's column count so that writes wider than the
/// grid can add columns first; the API rejects updates outside the grid.
pub struct Worksheet {
    api: Arc<dyn SheetsApi>,
    spreadsheet_id: String,
    properties: Mutex<WorksheetProperties>,
}

impl Worksheet {
    pub fn new(api: Arc<dyn SheetsApi>, spreadsheet_id: String, properties: WorksheetProperties) -> Self {
        Self {
            api,
            spreadsheet_id,
            properties: Mutex::new(properties),
        }
    }

    fn props(&self) -> MutexGuard<'_, WorksheetProperties> {
        self.properties.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn title(&self) -> String {
        self.props().title.clone()
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    pub fn column_count(&self) -> usize {
        self.props().column_count
    }

    /// Every non-empty row, header included
    pub fn get_all_values(&self) -> Result<Vec<Vec<String>>, StorageError> {
        self.api.get_values(&self.spreadsheet_id, &A1Range::sheet(&self.title()))
    }

    /// Row 1, without trailing blank cells
    pub fn header(&self) -> Result<Vec<String>, StorageError> {
        let range = A1Range::row(&self.title(), 1, self.column_count());
        let mut rows = self.api.get_values(&self.spreadsheet_id, &range)?;
        Ok(if rows.is_empty() { Vec::new() } else { rows.swap_remove(0) })
    }

    /// Grow the grid so it has at least `columns` columns
    pub fn ensure_columns(&self, columns: usize) -> Result<(), StorageError> {
        let mut props = self.props();
        if columns <= props.column_count {
            return Ok(());
        }
        let missing = columns - props.column_count;
        self.api.append_columns(&self.spreadsheet_id, props.sheet_id, missing)?;
        props.column_count = columns;
        debug!("Worksheet '{}' widened to {} columns", props.title, columns);
        Ok(())
    }

    pub fn write_header(&self, columns: &[String]) -> Result<(), StorageError> {
        self.ensure_columns(columns.len())?;
        let header: Vec<Value> = columns.iter().map(|c| Value::from(c.as_str())).collect();
        self.api
            .update_values(&self.spreadsheet_id, &A1Range::cell(&self.title(), 1, 1), &[header])
    }

    /// Insert rows after the last row holding data
    pub fn append_rows(&self, rows: &[Vec<Value>]) -> Result<(), StorageError> {
        if rows.is_empty() {
            return Ok(());
        }
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        self.ensure_columns(width)?;
        self.api
            .append_values(&self.spreadsheet_id, &A1Range::cell(&self.title(), 1, 1), rows)
    }

    /// Overwrite row `row` (1-based, header is row 1) from column A
    pub fn update_row(&self, row: usize, values: &[Value]) -> Result<(), StorageError> {
        self.ensure_columns(values.len())?;
        let range = A1Range::row(&self.title(), row, values.len());
        self.api.update_values(&self.spreadsheet_id, &range, &[values.to_vec()])
    }

    /// Remove grid row `row` (1-based); rows below move up
    pub fn delete_row(&self, row: usize) -> Result<(), StorageError> {
        let sheet_id = self.props().sheet_id;
        self.api.delete_rows(&self.spreadsheet_id, sheet_id, row - 1, row)
    }

    /// Empty every cell, keeping the grid
    pub fn clear(&self) -> Result<(), StorageError> {
        self.api.clear_values(&self.spreadsheet_id, &A1Range::sheet(&self.title()))
    }
}

/// An opened spreadsheet and the worksheet holding the table
pub struct SheetsConnection {
    worksheet: Worksheet,
}

impl SheetsConnection {
    /// Open `spreadsheet_name` (creating it when no spreadsheet of that name
    /// is visible) and its `worksheet_name` tab (creating it with a reserved
    /// header row when missing).
    pub fn connect(api: Arc<dyn SheetsApi>, spreadsheet_name: &str, worksheet_name: &str) -> Result<Self> {
        let spreadsheet_id = match api
            .find_spreadsheet(spreadsheet_name)
            .with_context(|| format!("Failed to look up spreadsheet '{}'", spreadsheet_name))?
        {
            Some(id) => {
                info!("Opened spreadsheet '{}' ({})", spreadsheet_name, id);
                id
            }
            None => {
                let id = api
                    .create_spreadsheet(spreadsheet_name)
                    .with_context(|| format!("Failed to create spreadsheet '{}'", spreadsheet_name))?;
                info!("Created spreadsheet '{}' ({})", spreadsheet_name, id);
                id
            }
        };

        let existing = api
            .worksheets(&spreadsheet_id)
            .context("Failed to list worksheets")?
            .into_iter()
            .find(|properties| properties.title == worksheet_name);

        let (properties, created) = match existing {
            Some(properties) => (properties, false),
            None => {
                let properties = api
                    .add_worksheet(&spreadsheet_id, worksheet_name, NEW_WORKSHEET_ROWS, NEW_WORKSHEET_COLUMNS)
                    .with_context(|| format!("Failed to create worksheet '{}'", worksheet_name))?;
                info!("Created worksheet '{}'", worksheet_name);
                (properties, true)
            }
        };

        let worksheet = Worksheet::new(api, spreadsheet_id, properties);
        if created || worksheet.header().context("Failed to read header row")?.is_empty() {
            let reserved: Vec<String> = RESERVED_COLUMNS.iter().map(|c| c.to_string()).collect();
            worksheet
                .write_header(&reserved)
                .context("Failed to write header row")?;
        }

        Ok(Self { worksheet })
    }

    pub fn worksheet(&self) -> &Worksheet {
        &self.worksheet
    }

    pub fn url(&self) -> String {
        spreadsheet_url(self.worksheet.spreadsheet_id())
    }
}
