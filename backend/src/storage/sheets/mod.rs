//! # Google Sheets Storage Module
//!
//! Remote implementation of [`RecordStorage`](crate::storage::RecordStorage)
//! where one worksheet holds the table:
//!
//! ```text
//!      A    B                    C      D
//! 1    id   timestamp            name   age
//! 2    1    2025-01-21 19:30:00  Emma
//! 3    2    2025-01-21 19:35:12  Liam   9
//! ```
//!
//! Row 1 is the schema. Records are appended after the last data row,
//! updated as one row range and removed by deleting their grid row.
//!
//! The HTTP transport sits behind [`SheetsApi`] so the repository logic can be
//! exercised against an in-memory spreadsheet.

pub mod a1;
pub mod api;
pub mod auth;
pub mod client;
pub mod connection;
pub mod record_repository;

#[cfg(test)]
pub mod memory;

pub use api::{SheetsApi, WorksheetProperties};
pub use auth::{ServiceAccountKey, ServiceAccountTokenSource, StaticToken, TokenSource};
pub use client::{build_client, HttpSheetsApi};
pub use connection::{spreadsheet_url, SheetsConnection, Worksheet};
pub use record_repository::SheetsRecordRepository;
