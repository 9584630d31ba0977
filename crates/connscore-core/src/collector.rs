//! Collection pipeline: fetch, extract, persist.
//!
//! A [`Collector`] ties a [`PageSource`] and a [`Sleeper`] to a
//! [`Store`]. Fetch and extraction failures are logged and reported through
//! the returned state or summary; store failures abort the run.

use std::path::PathBuf;

use rand::Rng;
use time::Date;
use tracing::{info, warn};

use connscore_store::{HistoryStore, Store};
use connscore_types::{Record, format_date};

use crate::batch::{BatchPlan, BatchSummary, Pacer};
use crate::error::{Error, Result};
use crate::extract::{extract, save_debug_html};
use crate::fetch::PageSource;
use crate::retry::{RetryPolicy, RetryState, run_with_retry};
use crate::sleep::Sleeper;

/// Collects ratings from `S` into a store, pausing through `Z`.
pub struct Collector<S, Z> {
    source: S,
    sleeper: Z,
    store: Store,
    debug_dir: Option<PathBuf>,
}

impl<S: PageSource, Z: Sleeper> Collector<S, Z> {
    pub fn new(source: S, sleeper: Z, store: Store) -> Self {
        Self {
            source,
            sleeper,
            store,
            debug_dir: None,
        }
    }

    /// Save pages that fail extraction as `debug_<date>.html` in `dir`.
    #[must_use]
    pub fn with_debug_html(mut self, dir: impl Into<PathBuf>) -> Self {
        self.debug_dir = Some(dir.into());
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn sleeper(&self) -> &Z {
        &self.sleeper
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Collect `date` as a daily run.
    ///
    /// On success the record goes to the daily table and the history table.
    pub async fn collect_daily(&self, date: Date, policy: &RetryPolicy) -> Result<RetryState> {
        info!("Collecting daily rating for {}", format_date(date));
        let state = self.collect_with_retry(date, policy).await;
        if let RetryState::Success(record) = &state {
            self.store.upsert_daily(*record)?;
        }
        Ok(state)
    }

    /// Collect a single `date` into the history table only.
    pub async fn collect_date(&self, date: Date, policy: &RetryPolicy) -> Result<RetryState> {
        info!("Collecting rating for {}", format_date(date));
        let state = self.collect_with_retry(date, policy).await;
        if let RetryState::Success(record) = &state {
            self.store.upsert(*record)?;
        }
        Ok(state)
    }

    /// Backfill every date in `plan`, one attempt per date.
    ///
    /// Each success is written before the next request, so an interrupted
    /// run keeps everything collected so far.
    pub async fn collect_range<R: Rng + ?Sized>(
        &self,
        plan: &BatchPlan,
        rng: &mut R,
    ) -> Result<BatchSummary> {
        let existing = if plan.skip_existing {
            self.store.load_history()?
        } else {
            HistoryStore::new()
        };
        let pending: Vec<Date> = plan.dates().filter(|d| !existing.contains(*d)).collect();

        let mut summary = BatchSummary {
            skipped: plan.day_count() - pending.len(),
            ..Default::default()
        };
        info!(
            "Collecting {} to {}: {} dates to request, {} already stored",
            format_date(plan.start),
            format_date(plan.end),
            pending.len(),
            summary.skipped
        );

        let mut pacer = Pacer::new(&plan.pacing);
        for (i, &date) in pending.iter().enumerate() {
            if let Some(pause) = pacer.before_request() {
                warn!(
                    "{} consecutive failures, pausing for {:?}",
                    plan.pacing.max_consecutive_failures, pause
                );
                self.sleeper.sleep(pause).await;
            }

            summary.requested += 1;
            match self.fetch_and_extract(date).await {
                Ok(record) => {
                    self.store.upsert(record)?;
                    summary.collected += 1;
                    pacer.record(true);
                }
                Err(e) => {
                    warn!("Skipping {}: {}", format_date(date), e);
                    summary.failed.push(date);
                    pacer.record(false);
                }
            }

            if i + 1 < pending.len() {
                for pause in pacer.after_request(rng) {
                    self.sleeper.sleep(pause).await;
                }
            }
        }

        info!(
            "Historical run finished: {} requested, {} collected, {} skipped, {} failed",
            summary.requested,
            summary.collected,
            summary.skipped,
            summary.failed.len()
        );
        Ok(summary)
    }

    async fn collect_with_retry(&self, date: Date, policy: &RetryPolicy) -> RetryState {
        run_with_retry(policy, &self.sleeper, date, || self.fetch_and_extract(date)).await
    }

    /// One fetch and extraction, with no retry.
    pub async fn fetch_and_extract(&self, date: Date) -> Result<Record> {
        let raw = self.source.fetch(date).await?;
        match extract(&raw, date) {
            Ok(record) => Ok(record),
            Err(e) => {
                if matches!(e, Error::Extraction { .. } | Error::Record(_)) {
                    self.save_debug(date, &raw);
                }
                Err(e)
            }
        }
    }

    fn save_debug(&self, date: Date, raw: &str) {
        let Some(dir) = &self.debug_dir else {
            return;
        };
        if let Err(e) = save_debug_html(dir, date, raw) {
            warn!("Failed to save page for {}: {}", format_date(date), e);
        }
    }
}
