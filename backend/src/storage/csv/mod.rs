//! # CSV Storage Module
//!
//! File-backed implementation of [`RecordStorage`](crate::storage::RecordStorage).
//!
//! ## File Format
//!
//! The first line is the header; `id` and `timestamp` are always present and
//! any other column appears once some record has used it:
//!
//! ```csv
//! id,timestamp,name,age
//! 1,2025-01-21 19:30:00,Emma,
//! 2,2025-01-21 19:35:12,Liam,9
//! ```
//!
//! Each write loads the full file and rewrites it through a temp file, so
//! cost grows with the table size and concurrent writers overwrite each other.

pub mod codec;
pub mod connection;
pub mod record_repository;

#[cfg(test)]
pub mod test_utils;

pub use connection::CsvConnection;
pub use record_repository::CsvRecordRepository;
