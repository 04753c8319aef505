use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Column holding the backend-assigned record identifier
pub const ID_COLUMN: &str = "id";
/// Column holding the creation/last-update time of a record
pub const TIMESTAMP_COLUMN: &str = "timestamp";
/// Columns every table carries, in their conventional order
pub const RESERVED_COLUMNS: [&str; 2] = [ID_COLUMN, TIMESTAMP_COLUMN];
/// chrono format string for the `timestamp` column ("2025-01-21 19:30:00")
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Identifier assigned by a storage backend when a record is created
pub type RecordId = u64;

/// Returns true for `id` and `timestamp`
pub fn is_reserved_column(name: &str) -> bool {
    RESERVED_COLUMNS.contains(&name)
}

/// A single cell value.
///
/// Values are persisted as strings. Reading a stored cell back yields
/// [`Value::Empty`] for an empty cell and [`Value::Text`] for anything else,
/// so stored data round-trips without type guessing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
    #[default]
    Empty,
}

impl Value {
    /// Interpret a raw stored cell
    pub fn from_cell(cell: &str) -> Self {
        if cell.is_empty() {
            Value::Empty
        } else {
            Value::Text(cell.to_string())
        }
    }

    /// Render the value the way it is written to a file or worksheet cell
    pub fn to_cell(&self) -> String {
        match self {
            Value::Empty => String::new(),
            Value::Text(text) => text.clone(),
            Value::Number(number) => format_number(*number),
        }
    }

    /// Parse the value as a record id.
    ///
    /// Accepts plain digits as well as `7.0`, which spreadsheet tools tend
    /// to produce when they treat the id column as floating point. Signs,
    /// exponents and real fractions are not ids.
    pub fn as_id(&self) -> Option<RecordId> {
        match self {
            Value::Empty => None,
            Value::Number(number) => float_to_id(*number),
            Value::Text(text) => {
                let text = text.trim();
                let digits = match text.split_once('.') {
                    Some((whole, zeros)) if !zeros.is_empty() && zeros.bytes().all(|b| b == b'0') => whole,
                    Some(_) => return None,
                    None => text,
                };
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                digits.parse::<RecordId>().ok().filter(|id| *id > 0)
            }
        }
    }

    /// Equality as stored: both sides are compared by their rendered cell text
    pub fn cell_eq(&self, other: &Value) -> bool {
        self.to_cell() == other.to_cell()
    }
}

fn float_to_id(number: f64) -> Option<RecordId> {
    if number.is_finite() && number >= 1.0 && number.fract() == 0.0 {
        Some(number as RecordId)
    } else {
        None
    }
}

fn format_number(number: f64) -> String {
    if number.is_finite() && number.fract() == 0.0 && number.abs() < 1e15 {
        format!("{}", number as i64)
    } else {
        number.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_cell())
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Text(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Text(text)
    }
}

impl From<f64> for Value {
    fn from(number: f64) -> Self {
        Value::Number(number)
    }
}

impl From<i64> for Value {
    fn from(number: i64) -> Self {
        Value::Number(number as f64)
    }
}

impl From<u64> for Value {
    fn from(number: u64) -> Self {
        Value::Number(number as f64)
    }
}

/// Insertion-ordered mapping from column name to value.
///
/// Used both for caller-supplied input (`add`, `update`) and as the storage
/// of a [`Record`]. Inserting an existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields {
    entries: Vec<(String, Value)>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value, returning the previous one
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let index = self.entries.iter().position(|(existing, _)| existing == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Fields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = Fields::new();
        for (key, value) in iter {
            fields.insert(key, value);
        }
        fields
    }
}

impl IntoIterator for Fields {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Serialize for Fields {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Fields {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FieldsVisitor;

        impl<'de> Visitor<'de> for FieldsVisitor {
            type Value = Fields;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of column names to scalar values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Fields, A::Error> {
                let mut fields = Fields::new();
                while let Some((key, value)) = access.next_entry::<String, Value>()? {
                    fields.insert(key, value);
                }
                Ok(fields)
            }
        }

        deserializer.deserialize_map(FieldsVisitor)
    }
}

/// One row of a [`Table`]; holds a value for every column of the table, in
/// table column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: Fields,
}

impl Record {
    pub fn id(&self) -> Option<RecordId> {
        self.fields.get(ID_COLUMN).and_then(Value::as_id)
    }

    pub fn timestamp(&self) -> Option<&str> {
        match self.fields.get(TIMESTAMP_COLUMN) {
            Some(Value::Text(text)) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Cell values in table column order
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.values()
    }
}

/// Ordered records sharing one growing column set.
///
/// Every record is kept aligned with `columns`: adding a column gives all
/// existing records an empty value for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    records: Vec<Record>,
}

impl Default for Table {
    fn default() -> Self {
        Self::new()
    }
}

impl Table {
    /// Empty table with just the reserved columns
    pub fn new() -> Self {
        Self::with_columns(RESERVED_COLUMNS)
    }

    /// Empty table with the given columns; duplicates keep their first position
    pub fn with_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut table = Table {
            columns: Vec::new(),
            records: Vec::new(),
        };
        for column in columns {
            table.add_column(column.as_ref());
        }
        table
    }

    /// Build a table from a header and raw rows, keeping every cell.
    ///
    /// Short rows are padded with empty values. The header goes through
    /// [`unique_header`], widened first when some row has more cells than
    /// the header has names.
    pub fn from_rows(header: &[String], rows: Vec<Vec<Value>>) -> Self {
        let width = rows.iter().map(Vec::len).fold(header.len(), usize::max);
        let mut names = header.to_vec();
        names.resize(width, String::new());
        let columns = unique_header(&names);

        let mut table = Table::with_columns(&columns);
        for row in rows {
            table.push(columns.iter().cloned().zip(row).collect());
        }
        table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|column| column == name)
    }

    /// Append a column at the end of the schema. Returns false if it already exists.
    pub fn add_column(&mut self, name: &str) -> bool {
        if self.has_column(name) {
            return false;
        }
        self.columns.push(name.to_string());
        for record in &mut self.records {
            record.fields.insert(name, Value::Empty);
        }
        true
    }

    /// Add every unknown name as a column, returning the names that were added
    pub fn merge_columns<'a, I>(&mut self, names: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        names
            .into_iter()
            .filter(|name| self.add_column(name))
            .map(str::to_string)
            .collect()
    }

    /// Make sure `id` is the first column and `timestamp` follows it when
    /// either is missing from the schema.
    pub fn ensure_reserved_columns(&mut self) {
        let mut changed = false;
        if !self.has_column(ID_COLUMN) {
            self.columns.insert(0, ID_COLUMN.to_string());
            changed = true;
        }
        if !self.has_column(TIMESTAMP_COLUMN) {
            let after_id = self
                .columns
                .iter()
                .position(|column| column == ID_COLUMN)
                .map_or(0, |index| index + 1);
            self.columns.insert(after_id, TIMESTAMP_COLUMN.to_string());
            changed = true;
        }
        if changed {
            self.realign();
        }
    }

    /// Append a record, growing the schema with any keys it introduces
    pub fn push(&mut self, fields: Fields) {
        self.merge_columns(fields.keys().collect::<Vec<_>>());
        let mut fields = fields;
        let aligned = self
            .columns
            .iter()
            .map(|column| (column.clone(), fields.remove(column).unwrap_or_default()))
            .collect();
        self.records.push(Record { fields: aligned });
    }

    /// Set one cell of the record at `index`, adding the column if needed.
    /// Returns false when `index` is out of range.
    pub fn set(&mut self, index: usize, column: &str, value: Value) -> bool {
        if index >= self.records.len() {
            return false;
        }
        self.add_column(column);
        self.records[index].fields.insert(column, value);
        true
    }

    pub fn position(&self, id: RecordId) -> Option<usize> {
        self.records.iter().position(|record| record.id() == Some(id))
    }

    pub fn get(&self, id: RecordId) -> Option<&Record> {
        self.position(id).map(|index| &self.records[index])
    }

    pub fn remove(&mut self, id: RecordId) -> Option<Record> {
        let index = self.position(id)?;
        Some(self.records.remove(index))
    }

    pub fn max_id(&self) -> Option<RecordId> {
        self.records.iter().filter_map(Record::id).max()
    }

    /// The id the next created record receives
    pub fn next_id(&self) -> RecordId {
        self.max_id().map_or(1, |max| max + 1)
    }

    /// Records whose `column` equals `value`, or `None` for an unknown column
    pub fn filter_eq(&self, column: &str, value: &Value) -> Option<Table> {
        if !self.has_column(column) {
            return None;
        }
        let records = self
            .records
            .iter()
            .filter(|record| record.get(column).is_some_and(|cell| cell.cell_eq(value)))
            .cloned()
            .collect();
        Some(Table {
            columns: self.columns.clone(),
            records,
        })
    }

    /// Cells of every record rendered for persistence, in column order
    pub fn to_cells(&self) -> Vec<Vec<String>> {
        self.records
            .iter()
            .map(|record| record.values().map(Value::to_cell).collect())
            .collect()
    }

    fn realign(&mut self) {
        for record in &mut self.records {
            let mut old = std::mem::take(&mut record.fields);
            record.fields = self
                .columns
                .iter()
                .map(|column| (column.clone(), old.remove(column).unwrap_or_default()))
                .collect();
        }
    }
}

/// Column names for a raw header row.
///
/// A blank name becomes `Unnamed: <index>` and a repeated name gets the
/// first free `.1`, `.2`, ... suffix, so no column is lost to a clash.
pub fn unique_header(names: &[String]) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(names.len());
    for (index, name) in names.iter().enumerate() {
        let base = if name.is_empty() {
            format!("Unnamed: {}", index)
        } else {
            name.clone()
        };
        let mut candidate = base.clone();
        let mut suffix = 1;
        while unique.contains(&candidate) {
            candidate = format!("{}.{}", base, suffix);
            suffix += 1;
        }
        unique.push(candidate);
    }
    unique
}

/// How a bulk import treats data already in the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Keep existing records and continue the id sequence
    #[default]
    Append,
    /// Discard existing records and restart ids at 1
    Replace,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown import mode '{0}', expected 'append' or 'replace'")]
pub struct ParseImportModeError(String);

impl FromStr for ImportMode {
    type Err = ParseImportModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "append" => Ok(ImportMode::Append),
            "replace" => Ok(ImportMode::Replace),
            other => Err(ParseImportModeError(other.to_string())),
        }
    }
}

impl fmt::Display for ImportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportMode::Append => write!(f, "append"),
            ImportMode::Replace => write!(f, "replace"),
        }
    }
}

/// Result of a storage operation.
///
/// `value` is always usable (an empty table, `false`, `None`); `diagnostic`
/// explains why an operation produced nothing or failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome<T> {
    pub value: T,
    pub diagnostic: Option<String>,
}

impl<T> Outcome<T> {
    pub fn ok(value: T) -> Self {
        Self {
            value,
            diagnostic: None,
        }
    }

    pub fn with_diagnostic(value: T, diagnostic: impl Into<String>) -> Self {
        Self {
            value,
            diagnostic: Some(diagnostic.into()),
        }
    }

    pub fn has_diagnostic(&self) -> bool {
        self.diagnostic.is_some()
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        Outcome {
            value: f(self.value),
            diagnostic: self.diagnostic,
        }
    }
}
