//! Main store implementation.

use std::path::{Path, PathBuf};

use time::Date;
use tracing::{debug, info, warn};

use connscore_types::Record;

use crate::error::{Error, Result};
use crate::history::{HistoryStore, ROLLING_WINDOW_DAYS, UpsertOutcome};
use crate::migrate::{MigrationReport, migrate_table};
use crate::mirror::JsonMirror;
use crate::table::{CsvTable, LoadedRecords, RecordTable, UnparsedRow};

const HISTORY_CSV: &str = "connections_difficulty_history.csv";
const HISTORY_JSON: &str = "connections_difficulty_history.json";
const DAILY_CSV: &str = "connections_difficulty_daily.csv";
const WINDOW_CSV: &str = "connections_difficulty_four_day.csv";
const WINDOW_JSON: &str = "connections_difficulty_four_day.json";
const LATEST_JSON: &str = "connections_difficulty_data_latest.json";

/// File locations inside a data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    dir: PathBuf,
}

impl DataLayout {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full history table (authoritative).
    pub fn history_csv(&self) -> PathBuf {
        self.dir.join(HISTORY_CSV)
    }

    pub fn history_json(&self) -> PathBuf {
        self.dir.join(HISTORY_JSON)
    }

    /// Records collected by daily runs only.
    pub fn daily_csv(&self) -> PathBuf {
        self.dir.join(DAILY_CSV)
    }

    pub fn window_csv(&self) -> PathBuf {
        self.dir.join(WINDOW_CSV)
    }

    pub fn window_json(&self) -> PathBuf {
        self.dir.join(WINDOW_JSON)
    }

    pub fn latest_json(&self) -> PathBuf {
        self.dir.join(LATEST_JSON)
    }
}

/// Counts written by one rebuild of the JSON mirrors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportSummary {
    pub history: usize,
    pub window: usize,
    pub latest: Option<Record>,
}

/// File-backed store for difficulty records.
///
/// The history table is authoritative; every other artifact is derived from
/// it and rewritten on each change, so a run interrupted between writes is
/// repaired by the next successful one.
///
/// Runs are assumed to be sequential. Two processes writing the same data
/// directory at once can lose updates.
pub struct Store {
    layout: DataLayout,
    history: CsvTable,
    daily: CsvTable,
    window_size: usize,
}

impl Store {
    /// Open (and create if needed) the data directory at `dir`.
    pub fn open<P: Into<PathBuf>>(dir: P) -> Result<Self> {
        let layout = DataLayout::new(dir);
        if !layout.dir().exists() {
            std::fs::create_dir_all(layout.dir()).map_err(|e| Error::CreateDirectory {
                path: layout.dir().to_path_buf(),
                source: e,
            })?;
        }
        info!("Using data directory {}", layout.dir().display());

        Ok(Self {
            history: CsvTable::new(layout.history_csv()),
            daily: CsvTable::new(layout.daily_csv()),
            layout,
            window_size: ROLLING_WINDOW_DAYS,
        })
    }

    /// Override the rolling window length.
    #[must_use]
    pub fn with_window_size(mut self, size: usize) -> Self {
        self.window_size = size;
        self
    }

    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    /// Load the history table, skipping (and logging) corrupt rows.
    pub fn load_history(&self) -> Result<HistoryStore> {
        load(&self.history)
    }

    /// Load the daily-only table.
    pub fn load_daily(&self) -> Result<HistoryStore> {
        load(&self.daily)
    }

    pub fn contains(&self, date: Date) -> Result<bool> {
        Ok(self.load_history()?.contains(date))
    }

    /// The most recent record in the history table.
    pub fn latest(&self) -> Result<Option<Record>> {
        Ok(self.load_history()?.latest())
    }

    /// The current rolling window, oldest first.
    pub fn rolling_window(&self) -> Result<Vec<Record>> {
        Ok(self.load_history()?.rolling_window(self.window_size))
    }

    /// Merge `record` into the history table and rebuild every mirror.
    ///
    /// An existing record for the same date is replaced (last write wins).
    /// Rows that fail to parse stay in the table untouched.
    pub fn upsert(&self, record: Record) -> Result<UpsertOutcome> {
        let (mut history, unparsed) = load_preserving(&self.history)?;
        let outcome = history.upsert(record);
        self.history.save_preserving(&history.to_vec(), &unparsed)?;
        log_outcome(self.history.path(), &record, outcome);

        self.write_mirrors(&history)?;
        Ok(outcome)
    }

    /// Merge a record collected by a daily run.
    ///
    /// The record goes to the daily-only table first, then through
    /// [`Store::upsert`]. The returned outcome is the history table's.
    pub fn upsert_daily(&self, record: Record) -> Result<UpsertOutcome> {
        let (mut daily, unparsed) = load_preserving(&self.daily)?;
        let outcome = daily.upsert(record);
        self.daily.save_preserving(&daily.to_vec(), &unparsed)?;
        log_outcome(self.daily.path(), &record, outcome);

        self.upsert(record)
    }

    /// Rebuild every JSON mirror from the history table without fetching.
    pub fn generate_json(&self) -> Result<ExportSummary> {
        info!("Generating JSON files from {}", self.layout.history_csv().display());
        let history = self.load_history()?;
        self.write_mirrors(&history)
    }

    /// Fill derived columns in legacy tables, then rebuild the mirrors.
    pub fn migrate(&self) -> Result<Vec<MigrationReport>> {
        let mut reports = Vec::new();
        for path in [self.layout.history_csv(), self.layout.daily_csv()] {
            if let Some(report) = migrate_table(&path)? {
                reports.push(report);
            }
        }
        self.generate_json()?;
        Ok(reports)
    }

    fn write_mirrors(&self, history: &HistoryStore) -> Result<ExportSummary> {
        let records = history.to_vec();
        JsonMirror::from_records(&records).write(&self.layout.history_json())?;

        let window = history.rolling_window(self.window_size);
        CsvTable::new(self.layout.window_csv()).save(&window)?;
        JsonMirror::from_records(&window).write(&self.layout.window_json())?;

        let latest = history.latest();
        if let Some(latest) = latest {
            JsonMirror::from_records(&[latest]).write(&self.layout.latest_json())?;
        } else {
            debug!("History is empty, leaving latest snapshot untouched");
        }

        info!(
            "Wrote JSON mirrors ({} history, {} window)",
            records.len(),
            window.len()
        );
        Ok(ExportSummary {
            history: records.len(),
            window: window.len(),
            latest,
        })
    }
}

fn load(table: &CsvTable) -> Result<HistoryStore> {
    load_preserving(table).map(|(history, _)| history)
}

fn load_preserving(table: &CsvTable) -> Result<(HistoryStore, Vec<UnparsedRow>)> {
    let LoadedRecords {
        records,
        warnings,
        unparsed,
    } = table.load()?;
    for warning in &warnings {
        warn!("{}", warning);
    }
    if !unparsed.is_empty() {
        warn!(
            "Keeping {} unreadable rows in {}; run migrate or fix them by hand",
            unparsed.len(),
            table.path().display()
        );
    }
    Ok((HistoryStore::from_records(records), unparsed))
}

fn log_outcome(path: &Path, record: &Record, outcome: UpsertOutcome) {
    match outcome {
        UpsertOutcome::Inserted => info!("Saved {} to {}", record, path.display()),
        UpsertOutcome::Replaced { previous } => info!(
            "Replaced {} in {} (was {}/{})",
            record,
            path.display(),
            previous.rating(),
            previous.max_score()
        ),
        UpsertOutcome::Unchanged => {
            info!("{} already present in {}", record, path.display());
        }
    }
}
