//! Backend-independent record rules.
//!
//! Both backends load a [`Table`], apply one of these functions and then
//! persist the difference in their own way. Keeping the rules here is what
//! makes the two backends assign the same ids, timestamps and columns.

use shared::{is_reserved_column, Fields, ImportMode, RecordId, Table, ID_COLUMN, TIMESTAMP_COLUMN};
use std::ops::Range;

/// Append a new record with the next id and the given timestamp.
///
/// Client-supplied `id`/`timestamp` keys are ignored.
pub fn add_record(table: &mut Table, fields: &Fields, timestamp: &str) -> RecordId {
    let id = table.next_id();
    table.push(stamped(id, timestamp, fields));
    id
}

/// Update the record with `id`. Returns false when no record has that id.
pub fn update_record(table: &mut Table, id: RecordId, fields: &Fields, timestamp: &str) -> bool {
    match table.position(id) {
        Some(index) => update_at(table, index, fields, timestamp),
        None => false,
    }
}

/// Update the record at `index`: overwrite the mentioned keys, leave the rest,
/// refresh the timestamp. Unknown keys become new columns.
pub fn update_at(table: &mut Table, index: usize, fields: &Fields, timestamp: &str) -> bool {
    if index >= table.len() {
        return false;
    }
    for (key, value) in fields.iter() {
        if !is_reserved_column(key) {
            table.set(index, key, value.clone());
        }
    }
    table.set(index, TIMESTAMP_COLUMN, timestamp.into())
}

pub fn delete_record(table: &mut Table, id: RecordId) -> bool {
    table.remove(id).is_some()
}

/// Import `rows` into `table` and return the ids that were assigned.
///
/// Append continues the id sequence and merges new columns into the schema.
/// Replace starts from an empty table whose schema is the reserved columns
/// followed by the import's columns.
pub fn import_rows(table: &mut Table, rows: &Table, mode: ImportMode, timestamp: &str) -> Range<RecordId> {
    if mode == ImportMode::Replace {
        *table = Table::new();
    }
    table.merge_columns(data_columns(rows));

    let first = table.next_id();
    for (offset, record) in rows.records().iter().enumerate() {
        table.push(stamped(first + offset as RecordId, timestamp, record.fields()));
    }
    first..first + rows.len() as RecordId
}

fn data_columns(rows: &Table) -> impl Iterator<Item = &str> {
    rows.columns()
        .iter()
        .map(String::as_str)
        .filter(|column| !is_reserved_column(column))
}

fn stamped(id: RecordId, timestamp: &str, fields: &Fields) -> Fields {
    let mut row = Fields::new()
        .with(ID_COLUMN, id)
        .with(TIMESTAMP_COLUMN, timestamp);
    for (key, value) in fields.iter() {
        if !is_reserved_column(key) {
            row.insert(key, value.clone());
        }
    }
    row
}
