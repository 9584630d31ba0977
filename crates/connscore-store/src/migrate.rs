//! In-place upgrade of legacy tables.
//!
//! Older tables carry only `date` plus the score columns, sometimes with US
//! style dates. Migration works on raw CSV cells so that every column it does
//! not own, known or not, survives byte for byte.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use connscore_types::{format_date, parse_date};

use crate::error::{Error, Result};
use crate::table::write_atomic;

/// Legacy header renamed to `day_of_week` during migration.
const LEGACY_DAY_COLUMN: &str = "day";

/// What [`migrate_table`] changed in one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub path: PathBuf,
    /// Data rows in the file.
    pub rows: usize,
    /// Columns that did not exist before.
    pub added_columns: Vec<String>,
    /// Rows whose date text was rewritten to `YYYY-MM-DD`.
    pub normalized_dates: usize,
    /// Rows left untouched because their date could not be parsed.
    pub unparseable: usize,
}

/// Fill `day_of_week` and `month` for every row of the CSV at `path`.
///
/// Returns `Ok(None)` when the file does not exist.
pub fn migrate_table(path: &Path) -> Result<Option<MigrationReport>> {
    if !path.exists() {
        info!("{} does not exist, no migration needed", path.display());
        return Ok(None);
    }

    let csv_err = |source| Error::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(csv_err)?;
    let mut headers: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(str::to_string)
        .collect();

    let mut report = MigrationReport {
        path: path.to_path_buf(),
        ..Default::default()
    };

    let date_idx = column(&headers, "date").ok_or_else(|| Error::MissingColumn {
        path: path.to_path_buf(),
        column: "date",
    })?;

    if column(&headers, "day_of_week").is_none() {
        if let Some(idx) = column(&headers, LEGACY_DAY_COLUMN) {
            headers[idx] = "day_of_week".to_string();
        }
    }
    let day_idx = ensure_column(&mut headers, "day_of_week", &mut report);
    let month_idx = ensure_column(&mut headers, "month", &mut report);

    let mut rows: Vec<Vec<String>> = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = result.map_err(csv_err)?;
        let mut cells: Vec<String> = record.iter().map(str::to_string).collect();
        cells.resize(headers.len().max(cells.len()), String::new());
        report.rows += 1;

        match parse_date(&cells[date_idx]) {
            Ok(date) => {
                let iso = format_date(date);
                if cells[date_idx] != iso {
                    cells[date_idx] = iso;
                    report.normalized_dates += 1;
                }
                cells[day_idx] = date.weekday().to_string();
                cells[month_idx] = date.month().to_string();
            }
            Err(e) => {
                // Row index + 2: one for the header, one for 1-based lines.
                warn!("{}:{}: {}, row kept unchanged", path.display(), i + 2, e);
                report.unparseable += 1;
            }
        }
        rows.push(cells);
    }

    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());
    writer.write_record(&headers).map_err(csv_err)?;
    for row in &rows {
        writer.write_record(row).map_err(csv_err)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| Error::Io(e.into_error()))?;
    write_atomic(path, &bytes)?;

    info!(
        "Migrated {} ({} rows, added {:?}, {} dates normalized, {} unparseable)",
        path.display(),
        report.rows,
        report.added_columns,
        report.normalized_dates,
        report.unparseable
    );
    Ok(Some(report))
}

fn ensure_column(headers: &mut Vec<String>, name: &str, report: &mut MigrationReport) -> usize {
    column(headers, name).unwrap_or_else(|| {
        headers.push(name.to_string());
        report.added_columns.push(name.to_string());
        headers.len() - 1
    })
}

fn column(headers: &[String], name: &str) -> Option<usize> {
    headers.iter().position(|h| h == name)
}
