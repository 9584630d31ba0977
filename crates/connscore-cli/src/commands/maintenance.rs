//! Maintenance commands that work on stored data only.

use anyhow::{Context, Result};

use super::open_store;
use crate::config::Config;

/// Rebuild every JSON file from the history table.
pub fn cmd_generate_json(config: &Config, quiet: bool) -> Result<()> {
    let store = open_store(config)?;
    let summary = store
        .generate_json()
        .context("Failed to generate JSON files")?;

    if !quiet {
        println!(
            "Wrote {} history records and a {}-record window to {}",
            summary.history,
            summary.window,
            store.layout().dir().display()
        );
        if let Some(latest) = summary.latest {
            println!("Latest: {}", latest);
        }
    }
    Ok(())
}

/// Upgrade legacy tables in place, then rebuild JSON.
pub fn cmd_migrate(config: &Config, quiet: bool) -> Result<()> {
    let store = open_store(config)?;
    let reports = store.migrate().context("Migration failed")?;

    if quiet {
        return Ok(());
    }
    if reports.is_empty() {
        println!("No tables to migrate in {}", store.layout().dir().display());
    }
    for report in &reports {
        let added = if report.added_columns.is_empty() {
            "none".to_string()
        } else {
            report.added_columns.join(", ")
        };
        println!(
            "{}: {} rows, added columns: {}, {} dates normalized, {} unparseable",
            report.path.display(),
            report.rows,
            added,
            report.normalized_dates,
            report.unparseable
        );
    }
    Ok(())
}
