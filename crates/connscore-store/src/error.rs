//! Error types for connscore-store.

use std::path::PathBuf;

use connscore_types::RecordError;

/// Result type for connscore-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in connscore-store.
///
/// A single malformed row is never an error: loads report it as a
/// [`LoadWarning`](crate::LoadWarning) and carry on.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failed to create the data directory.
    #[error("Failed to create data directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write an artifact.
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// CSV encoding or decoding error outside of a single row.
    #[error("CSV error in {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },

    /// A table lacks a column required to process it.
    #[error("{path} has no `{column}` column")]
    MissingColumn { path: PathBuf, column: &'static str },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A record failed validation.
    #[error(transparent)]
    Record(#[from] RecordError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
