//! # record-store
//!
//! Record storage with two interchangeable backends: a local CSV file and a
//! Google Sheets worksheet. Both implement [`storage::RecordStorage`], so a
//! caller picks a backend once (see [`config::open_storage`]) and then works
//! against the same create/read/update/delete/search/import contract.
//!
//! ```text
//! caller (CLI, forms)
//!     ↓
//! config::open_storage  (backend selection, credential lookup, CSV fallback)
//!     ↓
//! storage::RecordStorage
//!     ├── storage::csv     (whole-file rewrite per operation)
//!     └── storage::sheets  (header row + cell range updates over HTTP)
//! ```

pub mod config;
pub mod storage;

pub use shared::{Fields, ImportMode, Outcome, Record, RecordId, Table, Value};
pub use storage::RecordStorage;
