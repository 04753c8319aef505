//! Conversion between CSV text and [`Table`].
//!
//! Used for the backing file itself and for files handed to bulk import and
//! export.

use anyhow::Result;
use csv::{ReaderBuilder, Writer};
use shared::{Table, Value};
use std::io::{Read, Write};

use crate::storage::StorageError;

/// Parse CSV with a header line into a table.
///
/// Rows may be shorter or longer than the header and header names may repeat;
/// [`Table::from_rows`] keeps every cell. Empty input gives a table with no
/// columns. A leading UTF-8 byte order mark is ignored.
pub fn read_table<R: Read>(reader: R) -> Result<Table> {
    let mut csv_reader = ReaderBuilder::new().flexible(true).from_reader(reader);

    let header: Vec<String> = csv_reader
        .headers()
        .map_err(StorageError::Csv)?
        .iter()
        .enumerate()
        .map(|(index, name)| {
            if index == 0 {
                name.trim_start_matches('\u{feff}').to_string()
            } else {
                name.to_string()
            }
        })
        .collect();

    let mut rows = Vec::new();
    for result in csv_reader.records() {
        let record = result.map_err(StorageError::Csv)?;
        rows.push(record.iter().map(Value::from_cell).collect());
    }

    Ok(Table::from_rows(&header, rows))
}

/// Write the header line followed by one line per record
pub fn write_table<W: Write>(writer: W, table: &Table) -> Result<()> {
    let mut csv_writer = Writer::from_writer(writer);
    csv_writer
        .write_record(table.columns())
        .map_err(StorageError::Csv)?;
    for row in table.to_cells() {
        csv_writer.write_record(&row).map_err(StorageError::Csv)?;
    }
    csv_writer
        .flush()
        .map_err(|e| StorageError::Csv(e.into()))?;
    Ok(())
}
