//! Command implementations.

mod collect;
mod maintenance;

pub use collect::{cmd_daily, cmd_date, cmd_historical};
pub use maintenance::{cmd_generate_json, cmd_migrate};

use anyhow::{Context, Result};
use connscore_core::{Collector, HttpFetcher, TokioSleeper};
use connscore_store::Store;
use time::{Date, OffsetDateTime};

use crate::config::Config;

/// Open the store in the configured data directory.
fn open_store(config: &Config) -> Result<Store> {
    let dir = config.data_dir();
    Store::open(&dir).with_context(|| format!("Failed to open data directory {}", dir.display()))
}

/// Build the production collector from `config`.
fn build_collector(config: &Config) -> Result<Collector<HttpFetcher, TokioSleeper>> {
    let fetcher =
        HttpFetcher::new(config.fetch_config()).context("Failed to set up HTTP client")?;
    let mut collector = Collector::new(fetcher, TokioSleeper, open_store(config)?);
    if config.save_html_on_failure {
        collector = collector.with_debug_html(config.data_dir());
    }
    Ok(collector)
}

/// Today's date in the local timezone, or UTC when the offset is unknown.
fn today() -> Date {
    OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .date()
}
