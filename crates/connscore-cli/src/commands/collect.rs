//! Collection commands: daily, single date, historical range.

use anyhow::{Context, Result};
use time::Date;
use tracing::info;

use connscore_core::{BatchPlan, DEFAULT_START_DATE, RetryState};
use connscore_types::format_date;

use super::{build_collector, today};
use crate::cli::HistoricalArgs;
use crate::config::Config;

/// Collect today's rating into the daily and history tables.
pub async fn cmd_daily(config: &Config, quiet: bool) -> Result<()> {
    let collector = build_collector(config)?;
    let date = today();
    let state = collector
        .collect_daily(date, &config.retry_policy())
        .await
        .with_context(|| format!("Failed to store rating for {}", format_date(date)))?;
    report(date, &state, quiet);
    Ok(())
}

/// Collect one date into the history table.
pub async fn cmd_date(config: &Config, date: Date, quiet: bool) -> Result<()> {
    let collector = build_collector(config)?;
    let state = collector
        .collect_date(date, &config.retry_policy())
        .await
        .with_context(|| format!("Failed to store rating for {}", format_date(date)))?;
    report(date, &state, quiet);
    Ok(())
}

/// Backfill a date range.
pub async fn cmd_historical(config: &Config, args: &HistoricalArgs, quiet: bool) -> Result<()> {
    let start = args.start_date.unwrap_or(DEFAULT_START_DATE);
    let end = args.end_date.unwrap_or_else(today);
    let plan = BatchPlan::new(start, end)?
        .with_pacing(config.pacing()?)
        .skip_existing(config.historical.skip_existing);
    info!(
        "Historical collection from {} to {} ({} days)",
        format_date(start),
        format_date(end),
        plan.day_count()
    );

    let collector = build_collector(config)?;
    let summary = collector
        .collect_range(&plan, &mut rand::rng())
        .await
        .context("Historical collection aborted")?;

    if !quiet {
        println!(
            "Requested {}, collected {}, skipped {} already stored, failed {}",
            summary.requested,
            summary.collected,
            summary.skipped,
            summary.failed.len()
        );
        if !summary.failed.is_empty() {
            let failed: Vec<String> = summary.failed.iter().map(|d| format_date(*d)).collect();
            println!("Failed dates: {}", failed.join(", "));
        }
    }
    Ok(())
}

fn report(date: Date, state: &RetryState, quiet: bool) {
    if quiet {
        return;
    }
    match state {
        RetryState::Success(record) => println!("Collected {}", record),
        RetryState::Exhausted {
            attempts,
            last_error,
        } => println!(
            "No rating collected for {} after {} attempt(s): {}",
            format_date(date),
            attempts,
            last_error
        ),
        RetryState::Attempting(_) => {}
    }
}
