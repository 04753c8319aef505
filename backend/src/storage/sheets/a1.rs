//! A1 notation for worksheet ranges (`'data'!A2:D2`).

use std::fmt;

/// A range on one worksheet, with 1-based row and column numbers.
///
/// `start == None` means the whole sheet; `end == None` means the range is
/// anchored at `start` and extends as far as the written data requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct A1Range {
    pub sheet: String,
    pub start: Option<(usize, usize)>,
    pub end: Option<(usize, usize)>,
}

impl A1Range {
    /// The whole worksheet
    pub fn sheet(title: &str) -> Self {
        Self {
            sheet: title.to_string(),
            start: None,
            end: None,
        }
    }

    /// Anchored at a single cell
    pub fn cell(title: &str, row: usize, column: usize) -> Self {
        Self {
            sheet: title.to_string(),
            start: Some((row, column)),
            end: None,
        }
    }

    /// One full row from column A through `columns`
    pub fn row(title: &str, row: usize, columns: usize) -> Self {
        Self {
            sheet: title.to_string(),
            start: Some((row, 1)),
            end: Some((row, columns.max(1))),
        }
    }
}

impl fmt::Display for A1Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.sheet.replace('\'', "''"))?;
        if let Some((row, column)) = self.start {
            write!(f, "!{}{}", column_letters(column), row)?;
            if let Some((end_row, end_column)) = self.end {
                write!(f, ":{}{}", column_letters(end_column), end_row)?;
            }
        }
        Ok(())
    }
}

/// 1 → `A`, 26 → `Z`, 27 → `AA`
pub fn column_letters(column: usize) -> String {
    let mut remaining = column.max(1);
    let mut letters = Vec::new();
    while remaining > 0 {
        let index = (remaining - 1) % 26;
        letters.push(b'A' + index as u8);
        remaining = (remaining - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}
