//! # Storage Module
//!
//! Handles all data persistence for record-store.
//!
//! The [`RecordStorage`] trait is the single contract callers use. Two
//! implementations satisfy it:
//!
//! - **CSV** ([`csv::CsvRecordRepository`]): the whole table lives in one
//!   delimited file which is loaded, changed and rewritten on every operation.
//! - **Google Sheets** ([`sheets::SheetsRecordRepository`]): one worksheet is
//!   one table, row 1 is the header, and changes are pushed as header rewrites,
//!   appended rows and row range updates.
//!
//! The rules both backends share (id assignment, timestamps, schema growth,
//! import modes) live in [`records`] so that the two cannot drift apart.
//!
//! ## Limitations
//!
//! Neither backend coordinates concurrent writers. Every write is a
//! read-modify-write of the whole table; two processes writing the same file
//! or worksheet can lose each other's changes.

pub mod clock;
pub mod csv;
pub mod error;
pub mod records;
pub mod sheets;
pub mod traits;


pub use clock::{Clock, SystemClock};
pub use error::StorageError;
pub use traits::RecordStorage;
