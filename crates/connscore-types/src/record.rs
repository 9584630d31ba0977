//! The daily difficulty record and its serialized row form.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use time::macros::{date, format_description};
use time::{Date, Month};

use crate::error::{RecordError, RecordResult};

/// Scale used by the companion page ("X out of 5").
pub const DEFAULT_MAX_SCORE: u8 = 5;

/// Puzzle #638 was published for 2025-03-09; numbering advances one per day.
const REFERENCE_DATE: Date = date!(2025 - 03 - 09);
const REFERENCE_PUZZLE: i64 = 638;

/// One date's difficulty observation.
///
/// Records are only built through [`Record::new`], so every value held by a
/// `Record` has a finite rating within its scale. The calendar fields are
/// derived from `date` on demand and never stored separately.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Record {
    date: Date,
    rating: f64,
    max_score: u8,
}

impl Record {
    /// Build a validated record.
    ///
    /// Fails with [`RecordError::InvalidRating`] unless `rating` is finite and
    /// within `0..=max_score`, and `max_score` is at least 1.
    pub fn new(date: Date, rating: f64, max_score: u8) -> RecordResult<Self> {
        if max_score == 0 || !rating.is_finite() || rating < 0.0 || rating > f64::from(max_score)
        {
            return Err(RecordError::InvalidRating {
                value: rating,
                max_score,
            });
        }

        Ok(Self {
            date,
            rating,
            max_score,
        })
    }

    /// The puzzle date; the identity key of a record.
    #[must_use]
    pub fn date(&self) -> Date {
        self.date
    }

    #[must_use]
    pub fn rating(&self) -> f64 {
        self.rating
    }

    #[must_use]
    pub fn max_score(&self) -> u8 {
        self.max_score
    }

    /// English weekday name, e.g. `"Monday"`.
    #[must_use]
    pub fn day_of_week(&self) -> String {
        self.date.weekday().to_string()
    }

    /// English month name, e.g. `"May"`.
    #[must_use]
    pub fn month(&self) -> String {
        self.date.month().to_string()
    }

    #[must_use]
    pub fn puzzle_number(&self) -> i64 {
        puzzle_number_for(self.date)
    }

    /// Flatten into the row shape written to tables and JSON mirrors.
    #[must_use]
    pub fn to_row(&self) -> RecordRow {
        RecordRow {
            date: format_date(self.date),
            day_of_week: self.day_of_week(),
            month: self.month(),
            puzzle_number: Some(self.puzzle_number()),
            rating: self.rating,
            max_score: self.max_score,
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (puzzle #{}): {}/{}",
            format_date(self.date),
            self.puzzle_number(),
            self.rating,
            self.max_score
        )
    }
}

/// Serialized form of a [`Record`], shared by the CSV tables and JSON mirrors.
///
/// Legacy tables used `difficulty_score` and `day` as column names and may
/// lack the derived columns entirely; both are accepted on read.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RecordRow {
    pub date: String,
    #[cfg_attr(feature = "serde", serde(default, alias = "day"))]
    pub day_of_week: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub month: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub puzzle_number: Option<i64>,
    #[cfg_attr(feature = "serde", serde(alias = "difficulty_score"))]
    pub rating: f64,
    #[cfg_attr(feature = "serde", serde(default = "default_max_score"))]
    pub max_score: u8,
}

#[cfg(feature = "serde")]
fn default_max_score() -> u8 {
    DEFAULT_MAX_SCORE
}

impl RecordRow {
    /// Rebuild the record this row describes.
    ///
    /// Only `date`, `rating` and `max_score` are read; derived columns are
    /// recomputed, so stale or missing values in them are harmless.
    pub fn to_record(&self) -> RecordResult<Record> {
        let date = parse_date(&self.date)?;
        Record::new(date, self.rating, self.max_score)
    }
}

/// Puzzle number published for `date`.
#[must_use]
pub fn puzzle_number_for(date: Date) -> i64 {
    REFERENCE_PUZZLE + (date - REFERENCE_DATE).whole_days()
}

/// Format a date the way every artifact stores it (`YYYY-MM-DD`).
#[must_use]
pub fn format_date(date: Date) -> String {
    // The ISO description cannot fail for years 0..=9999.
    date.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| date.to_string())
}

/// Parse a calendar date.
///
/// Accepts ISO `YYYY-MM-DD` (zero padding optional, so `2024-9-1` works) and
/// the legacy US forms `M/D/YYYY` and `MM/DD/YYYY` found in older tables.
pub fn parse_date(text: &str) -> RecordResult<Date> {
    let text = text.trim();
    let invalid = || RecordError::InvalidDate(text.to_string());

    let (year, month, day) = if text.contains('/') {
        let [m, d, y] = split_fields(text, '/').ok_or_else(invalid)?;
        (y, m, d)
    } else {
        let [y, m, d] = split_fields(text, '-').ok_or_else(invalid)?;
        (y, m, d)
    };

    if year.len() != 4 || !is_short_number(month) || !is_short_number(day) {
        return Err(invalid());
    }
    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month: u8 = month.parse().map_err(|_| invalid())?;
    let day: u8 = day.parse().map_err(|_| invalid())?;
    let month = Month::try_from(month).map_err(|_| invalid())?;
    Date::from_calendar_date(year, month, day).map_err(|_| invalid())
}

/// Exactly three all-digit fields separated by `sep`.
fn split_fields(text: &str, sep: char) -> Option<[&str; 3]> {
    let mut parts = text.split(sep);
    let fields = [parts.next()?, parts.next()?, parts.next()?];
    let digits = |f: &&str| !f.is_empty() && f.bytes().all(|b| b.is_ascii_digit());
    if parts.next().is_some() || !fields.iter().all(digits) {
        return None;
    }
    Some(fields)
}

fn is_short_number(field: &str) -> bool {
    (1..=2).contains(&field.len())
}
