//! Error types for record construction in connscore-types.

use thiserror::Error;

/// Errors that can occur when building a [`Record`](crate::Record).
///
/// Both variants are input validation failures: retrying the same input
/// cannot succeed.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum RecordError {
    /// The text does not name a real calendar date.
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// The rating is not a finite number within `0..=max_score`.
    #[error("Invalid rating: {value} (expected 0..={max_score})")]
    InvalidRating {
        /// The rejected value.
        value: f64,
        /// The scale the rating was given on.
        max_score: u8,
    },
}

/// Result type alias using connscore-types' RecordError type.
pub type RecordResult<T> = std::result::Result<T, RecordError>;
