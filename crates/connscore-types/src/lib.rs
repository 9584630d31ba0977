//! Record model for Connections difficulty ratings.
//!
//! This crate holds the canonical shape of one day's observation and the
//! calendar derivations that go with it. It is shared by the store
//! (`connscore-store`) and the collection pipeline (`connscore-core`).
//!
//! # Example
//!
//! ```
//! use connscore_types::{Record, parse_date};
//!
//! let date = parse_date("2023-05-01").unwrap();
//! let record = Record::new(date, 2.0, 5).unwrap();
//! assert_eq!(record.day_of_week(), "Monday");
//! assert_eq!(record.month(), "May");
//! ```

pub mod error;
pub mod record;

pub use error::{RecordError, RecordResult};
pub use record::{
    DEFAULT_MAX_SCORE, Record, RecordRow, format_date, parse_date, puzzle_number_for,
};
