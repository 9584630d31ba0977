//! In-memory history with date-keyed merge semantics.
//!
//! [`HistoryStore`] knows nothing about files; the [`Store`](crate::Store)
//! loads one from a table, merges into it, and writes it back.

use std::collections::BTreeMap;

use time::Date;
use tracing::warn;

use connscore_types::{Record, format_date};

/// Number of records kept in the rolling window.
pub const ROLLING_WINDOW_DAYS: usize = 4;

/// Result of merging one record into a [`HistoryStore`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UpsertOutcome {
    /// No record existed for the date.
    Inserted,
    /// A different record for the date was replaced.
    Replaced { previous: Record },
    /// An identical record was already present.
    Unchanged,
}

/// Date-ordered collection of records with unique dates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryStore {
    records: BTreeMap<Date, Record>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a history from records in file order.
    ///
    /// When a date appears more than once the later row wins, matching what
    /// a sequence of upserts would have produced.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = Record>,
    {
        let mut history = Self::new();
        for record in records {
            if let UpsertOutcome::Replaced { previous } = history.upsert(record) {
                warn!(
                    "Duplicate row for {} (kept {}, dropped rating {})",
                    format_date(record.date()),
                    record.rating(),
                    previous.rating()
                );
            }
        }
        history
    }

    /// Insert the record, or replace the one already stored for its date.
    pub fn upsert(&mut self, record: Record) -> UpsertOutcome {
        match self.records.insert(record.date(), record) {
            None => UpsertOutcome::Inserted,
            Some(previous) if previous == record => UpsertOutcome::Unchanged,
            Some(previous) => UpsertOutcome::Replaced { previous },
        }
    }

    pub fn get(&self, date: Date) -> Option<&Record> {
        self.records.get(&date)
    }

    pub fn contains(&self, date: Date) -> bool {
        self.records.contains_key(&date)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in ascending date order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Record> {
        self.records.values()
    }

    pub fn to_vec(&self) -> Vec<Record> {
        self.records.values().copied().collect()
    }

    /// The most recent record by date.
    pub fn latest(&self) -> Option<Record> {
        self.records.values().next_back().copied()
    }

    /// The `size` most recent records, oldest first.
    pub fn rolling_window(&self, size: usize) -> Vec<Record> {
        let mut window: Vec<Record> = self.records.values().rev().take(size).copied().collect();
        window.reverse();
        window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use time::macros::date;

    fn record(d: Date, rating: f64) -> Record {
        Record::new(d, rating, 5).unwrap()
    }

    #[test]
    fn test_upsert_insert_replace_unchanged() {
        let mut history = HistoryStore::new();
        let d = date!(2024 - 01 - 01);

        assert_eq!(history.upsert(record(d, 3.0)), UpsertOutcome::Inserted);
        assert_eq!(history.upsert(record(d, 3.0)), UpsertOutcome::Unchanged);
        assert_eq!(
            history.upsert(record(d, 5.0)),
            UpsertOutcome::Replaced {
                previous: record(d, 3.0)
            }
        );
        assert_eq!(history.len(), 1);
        assert_eq!(history.get(d).unwrap().rating(), 5.0);
    }

    #[test]
    fn test_out_of_order_inserts_stay_sorted() {
        let mut history = HistoryStore::new();
        history.upsert(record(date!(2024 - 01 - 03), 1.0));
        history.upsert(record(date!(2024 - 01 - 01), 2.0));
        history.upsert(record(date!(2024 - 01 - 02), 3.0));

        let dates: Vec<Date> = history.iter().map(Record::date).collect();
        assert_eq!(
            dates,
            vec![date!(2024 - 01 - 01), date!(2024 - 01 - 02), date!(2024 - 01 - 03)]
        );
        assert_eq!(history.latest().unwrap().date(), date!(2024 - 01 - 03));
    }

    #[test]
    fn test_rolling_window_takes_most_recent_ascending() {
        let start = date!(2024 - 01 - 01);
        let history = HistoryStore::from_records(
            (0..10).map(|i| record(start + time::Duration::days(i), 2.0)),
        );

        let window = history.rolling_window(ROLLING_WINDOW_DAYS);
        let dates: Vec<Date> = window.iter().map(Record::date).collect();
        assert_eq!(
            dates,
            vec![
                date!(2024 - 01 - 07),
                date!(2024 - 01 - 08),
                date!(2024 - 01 - 09),
                date!(2024 - 01 - 10),
            ]
        );
    }

    #[test]
    fn test_rolling_window_shorter_history() {
        let history = HistoryStore::from_records([record(date!(2024 - 01 - 01), 2.0)]);
        assert_eq!(history.rolling_window(4).len(), 1);
        assert!(HistoryStore::new().rolling_window(4).is_empty());
        assert!(HistoryStore::new().latest().is_none());
    }

    #[test]
    fn test_from_records_last_duplicate_wins() {
        let d = date!(2024 - 02 - 29);
        let history = HistoryStore::from_records([record(d, 1.0), record(d, 4.0)]);
        assert_eq!(history.len(), 1);
        assert_eq!(history.get(d).unwrap().rating(), 4.0);
    }

    proptest! {
        #[test]
        fn prop_upserts_keep_dates_unique_and_sorted(
            ops in proptest::collection::vec((0i64..30, 0u8..=5), 0..100)
        ) {
            let start = date!(2024 - 01 - 01);
            let mut history = HistoryStore::new();
            for (offset, rating) in &ops {
                history.upsert(record(start + time::Duration::days(*offset), f64::from(*rating)));
            }

            let dates: Vec<Date> = history.iter().map(Record::date).collect();
            let mut expected = dates.clone();
            expected.sort();
            expected.dedup();
            prop_assert_eq!(dates, expected);
        }
    }
}
