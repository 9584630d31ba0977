//! Error types for connscore-core.
//!
//! # Error Classification
//!
//! | Error | Retryable | Notes |
//! |-------|-----------|-------|
//! | [`Error::Network`] | yes | Connect, timeout or body read failure |
//! | [`Error::Http`] | yes | Non-2xx status, often rate limiting |
//! | [`Error::Extraction`] | yes | Page may not be published yet |
//! | [`Error::Record`] | no | The page carried an out-of-range value |
//! | [`Error::Store`] | no | Fatal to the run |
//! | [`Error::Io`] | no | |
//! | [`Error::InvalidConfig`] | no | Fix configuration and restart |

use time::Date;

use connscore_types::{RecordError, format_date};

/// Errors that can occur while collecting a rating.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The request could not be completed.
    #[error("Request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Http { url: String, status: u16 },

    /// The page did not contain a recognizable rating.
    #[error("No difficulty rating found for {}: {reason}", format_date(*date))]
    Extraction { date: Date, reason: String },

    /// The extracted value failed validation.
    #[error(transparent)]
    Record(#[from] RecordError),

    /// Persisting the record failed.
    #[error("Store error: {0}")]
    Store(#[from] connscore_store::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Whether trying the same date again later can succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Network { .. } | Error::Http { .. } | Error::Extraction { .. } => true,
            Error::Record(_) | Error::Store(_) | Error::Io(_) | Error::InvalidConfig(_) => false,
        }
    }
}

/// Result type alias using connscore-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn test_retryable_classification() {
        let http = Error::Http {
            url: "https://example.com".into(),
            status: 429,
        };
        assert!(http.is_retryable());

        let extraction = Error::Extraction {
            date: date!(2024 - 01 - 01),
            reason: "no match".into(),
        };
        assert!(extraction.is_retryable());

        let invalid = Error::Record(RecordError::InvalidRating {
            value: 7.0,
            max_score: 5,
        });
        assert!(!invalid.is_retryable());
        assert!(!Error::InvalidConfig("x".into()).is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = Error::Extraction {
            date: date!(2024 - 01 - 01),
            reason: "no match".into(),
        };
        assert_eq!(
            err.to_string(),
            "No difficulty rating found for 2024-01-01: no match"
        );

        let err = Error::Http {
            url: "https://example.com/x".into(),
            status: 403,
        };
        assert_eq!(err.to_string(), "https://example.com/x returned HTTP 403");
    }
}
