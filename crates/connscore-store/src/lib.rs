//! File-based persistence for Connections difficulty records.
//!
//! This crate owns every artifact the scraper produces: the authoritative
//! history table, the daily-only table, the rolling window, the latest
//! snapshot, and the JSON mirrors consumed by the publishing site.
//!
//! # Features
//!
//! - Idempotent upsert keyed by date (no duplicate dates, last write wins)
//! - Derived views rebuilt from the history table on every write
//! - Atomic file replacement for every artifact
//! - Corrupt rows skipped with a warning instead of failing the load
//! - In-place migration of legacy tables
//!
//! # Example
//!
//! ```no_run
//! use connscore_store::Store;
//! use connscore_types::{Record, parse_date};
//!
//! let store = Store::open("data")?;
//! let record = Record::new(parse_date("2024-01-01")?, 3.0, 5)?;
//! store.upsert(record)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
mod history;
mod migrate;
mod mirror;
mod store;
mod table;

pub use error::{Error, Result};
pub use history::{HistoryStore, ROLLING_WINDOW_DAYS, UpsertOutcome};
pub use migrate::{MigrationReport, migrate_table};
pub use mirror::{JsonMirror, MIRROR_SOURCE, MirrorMetadata};
pub use store::{DataLayout, ExportSummary, Store};
pub use table::{COLUMNS, CsvTable, LoadWarning, LoadedRecords, RecordTable, UnparsedRow};

/// Default data directory, relative to the working directory.
pub fn default_data_dir() -> std::path::PathBuf {
    std::path::PathBuf::from("data")
}
