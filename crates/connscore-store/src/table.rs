//! Tabular backing store for records.
//!
//! [`RecordTable`] is the seam between merge logic and file format. The only
//! implementation today is [`CsvTable`].

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use time::Date;
use tracing::debug;

use connscore_types::{Record, RecordRow, parse_date};

use crate::error::{Error, Result};

/// Column order of every table written by this crate.
pub const COLUMNS: [&str; 6] = [
    "date",
    "day_of_week",
    "month",
    "puzzle_number",
    "rating",
    "max_score",
];

/// Older column names still accepted on read, keyed by current name.
const COLUMN_ALIASES: [(&str, &str); 2] = [("day_of_week", "day"), ("rating", "difficulty_score")];

/// A row that could not be turned into a record (store corruption).
///
/// Loads skip such rows instead of failing.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadWarning {
    /// File the row came from.
    pub path: PathBuf,
    /// 1-based line number, when known.
    pub line: Option<u64>,
    /// Why the row was rejected.
    pub reason: String,
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(
                f,
                "skipping corrupt row at {}:{}: {}",
                self.path.display(),
                line,
                self.reason
            ),
            None => write!(
                f,
                "skipping corrupt row in {}: {}",
                self.path.display(),
                self.reason
            ),
        }
    }
}

/// Cells of a skipped row, rearranged into [`COLUMNS`] order.
///
/// Saving writes these back as-is so a rewrite never loses data that
/// `migrate` or a manual fix could still recover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnparsedRow {
    cells: Vec<String>,
}

impl UnparsedRow {
    pub fn cells(&self) -> &[String] {
        &self.cells
    }

    /// The row's date, if that cell at least is readable.
    pub fn date(&self) -> Option<Date> {
        self.cells.first().and_then(|d| parse_date(d).ok())
    }
}

/// Records read from a table plus the rows that were skipped.
#[derive(Debug, Clone, Default)]
pub struct LoadedRecords {
    /// Valid records in file order.
    pub records: Vec<Record>,
    /// Skipped rows.
    pub warnings: Vec<LoadWarning>,
    /// Raw contents of the skipped rows, in file order.
    pub unparsed: Vec<UnparsedRow>,
}

/// Persistent table of records.
pub trait RecordTable {
    /// Read every valid record; a missing table is empty.
    fn load(&self) -> Result<LoadedRecords>;

    /// Replace the table's contents with `records`, then `unparsed`.
    ///
    /// An unparsed row whose date matches one of `records` has been
    /// superseded and is dropped.
    fn save_preserving(&self, records: &[Record], unparsed: &[UnparsedRow]) -> Result<()>;

    /// Replace the table's contents with `records`, in the given order.
    fn save(&self, records: &[Record]) -> Result<()> {
        self.save_preserving(records, &[])
    }
}

/// CSV file with a header row of [`COLUMNS`].
#[derive(Debug, Clone)]
pub struct CsvTable {
    path: PathBuf,
}

impl CsvTable {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn csv_error(&self, source: csv::Error) -> Error {
        Error::Csv {
            path: self.path.clone(),
            source,
        }
    }
}

impl RecordTable for CsvTable {
    fn load(&self) -> Result<LoadedRecords> {
        if !self.path.exists() {
            debug!("{} does not exist yet", self.path.display());
            return Ok(LoadedRecords::default());
        }

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| self.csv_error(e))?;
        let headers = reader.byte_headers().map_err(|e| self.csv_error(e))?.clone();
        let layout = column_positions(&headers);

        let mut loaded = LoadedRecords::default();
        for result in reader.byte_records() {
            let raw = result.map_err(|e| self.csv_error(e))?;
            let parsed = raw
                .deserialize::<RecordRow>(Some(&headers))
                .map_err(|e| e.to_string())
                .and_then(|row| row.to_record().map_err(|e| e.to_string()));

            match parsed {
                Ok(record) => loaded.records.push(record),
                Err(reason) => {
                    loaded.warnings.push(LoadWarning {
                        path: self.path.clone(),
                        line: raw.position().map(csv::Position::line),
                        reason,
                    });
                    loaded.unparsed.push(UnparsedRow {
                        cells: layout
                            .iter()
                            .map(|idx| {
                                let cell = idx.and_then(|i| raw.get(i)).unwrap_or_default();
                                String::from_utf8_lossy(cell).into_owned()
                            })
                            .collect(),
                    });
                }
            }
        }

        debug!(
            "Loaded {} records from {} ({} skipped)",
            loaded.records.len(),
            self.path.display(),
            loaded.warnings.len()
        );
        Ok(loaded)
    }

    fn save_preserving(&self, records: &[Record], unparsed: &[UnparsedRow]) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        writer
            .write_record(COLUMNS)
            .map_err(|e| self.csv_error(e))?;
        for record in records {
            writer
                .serialize(record.to_row())
                .map_err(|e| self.csv_error(e))?;
        }
        for row in unparsed {
            let superseded = row
                .date()
                .is_some_and(|d| records.iter().any(|r| r.date() == d));
            if superseded {
                debug!("Dropping unparsed row for {} in {}", row.cells[0], self.path.display());
                continue;
            }
            writer
                .write_record(&row.cells)
                .map_err(|e| self.csv_error(e))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| Error::Io(e.into_error()))?;

        write_atomic(&self.path, &bytes)
    }
}

/// Index of each [`COLUMNS`] entry in `headers`, by current or legacy name.
fn column_positions(headers: &csv::ByteRecord) -> Vec<Option<usize>> {
    COLUMNS
        .iter()
        .map(|&name| {
            let alias = COLUMN_ALIASES
                .iter()
                .find(|(current, _)| *current == name)
                .map(|(_, old)| *old);
            headers
                .iter()
                .position(|h| h == name.as_bytes() || alias.is_some_and(|a| h == a.as_bytes()))
        })
        .collect()
}

/// Write `contents` to a sibling temp file, then rename it over `path`.
///
/// Readers never observe a half-written artifact.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, contents).map_err(|source| Error::Write {
        path: tmp.clone(),
        source,
    })?;
    fs::rename(&tmp, path).map_err(|source| Error::Write {
        path: path.to_path_buf(),
        source,
    })
}
