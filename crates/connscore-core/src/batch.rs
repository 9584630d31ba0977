//! Pacing and bookkeeping for historical backfill.
//!
//! Bulk collection is the run most likely to trip rate limiting, so requests
//! are spaced by a jittered delay, grouped into batches separated by a
//! cooldown, and paused for longer after a streak of failures.

use std::time::Duration;

use rand::Rng;
use time::Date;
use time::macros::date;

use crate::error::{Error, Result};

/// Date of the first Connections puzzle.
pub const DEFAULT_START_DATE: Date = date!(2023 - 06 - 12);

/// Lower bound of the jitter added to the base delay, in seconds.
pub const JITTER_MIN_SECS: f64 = -0.5;
/// Upper bound (exclusive) of the jitter, in seconds.
pub const JITTER_MAX_SECS: f64 = 1.5;
/// Shortest delay a jittered pause can shrink to.
pub const MIN_JITTERED_DELAY: Duration = Duration::from_secs(1);

/// Spacing between requests.
#[derive(Debug, Clone, PartialEq)]
pub struct Pacing {
    /// Base pause between two requests.
    pub delay: Duration,
    /// Perturb `delay` by a random offset.
    pub jitter: bool,
    /// Requests per batch, at least 1.
    pub batch_size: u32,
    /// Extra pause after each full batch.
    pub cooldown: Duration,
    /// Failure streak that triggers `failure_pause`.
    pub max_consecutive_failures: u32,
    pub failure_pause: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(2),
            jitter: true,
            batch_size: 10,
            cooldown: Duration::from_secs(60),
            max_consecutive_failures: 5,
            failure_pause: Duration::from_secs(30 * 60),
        }
    }
}

impl Pacing {
    /// Pause between two consecutive requests.
    ///
    /// With jitter on, the result is `delay + U(-0.5, 1.5)` seconds, never
    /// below one second.
    pub fn inter_request_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if !self.jitter {
            return self.delay;
        }
        let offset = rng.random_range(JITTER_MIN_SECS..JITTER_MAX_SECS);
        let secs = (self.delay.as_secs_f64() + offset).max(MIN_JITTERED_DELAY.as_secs_f64());
        Duration::try_from_secs_f64(secs).unwrap_or(self.delay)
    }
}

/// Tracks request counts and failure streaks during a run.
#[derive(Debug)]
pub struct Pacer<'a> {
    pacing: &'a Pacing,
    requests: u32,
    consecutive_failures: u32,
}

impl<'a> Pacer<'a> {
    pub fn new(pacing: &'a Pacing) -> Self {
        Self {
            pacing,
            requests: 0,
            consecutive_failures: 0,
        }
    }

    /// Pause owed before the next request because of a failure streak.
    ///
    /// Taking the pause resets the streak.
    pub fn before_request(&mut self) -> Option<Duration> {
        let limit = self.pacing.max_consecutive_failures;
        if limit > 0 && self.consecutive_failures >= limit {
            self.consecutive_failures = 0;
            Some(self.pacing.failure_pause)
        } else {
            None
        }
    }

    /// Count a finished request.
    pub fn record(&mut self, succeeded: bool) {
        self.requests += 1;
        if succeeded {
            self.consecutive_failures = 0;
        } else {
            self.consecutive_failures += 1;
        }
    }

    /// Pauses to take before the next request, in order.
    ///
    /// Only called when another request follows.
    pub fn after_request<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Vec<Duration> {
        let mut pauses = Vec::with_capacity(2);
        let batch_size = self.pacing.batch_size.max(1);
        if self.requests > 0 && self.requests % batch_size == 0 {
            pauses.push(self.pacing.cooldown);
        }
        pauses.push(self.pacing.inter_request_delay(rng));
        pauses
    }

    pub fn requests(&self) -> u32 {
        self.requests
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}

/// A historical backfill request.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchPlan {
    pub start: Date,
    pub end: Date,
    pub pacing: Pacing,
    /// Skip dates already in the history table without a request.
    pub skip_existing: bool,
}

impl BatchPlan {
    /// Plan `start..=end` with default pacing.
    ///
    /// Fails with [`Error::InvalidConfig`] when `start` is after `end`.
    pub fn new(start: Date, end: Date) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidConfig(format!(
                "start date {} is after end date {}",
                start, end
            )));
        }
        Ok(Self {
            start,
            end,
            pacing: Pacing::default(),
            skip_existing: true,
        })
    }

    #[must_use]
    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    #[must_use]
    pub fn skip_existing(mut self, skip: bool) -> Self {
        self.skip_existing = skip;
        self
    }

    /// Every date in the plan, ascending.
    pub fn dates(&self) -> impl Iterator<Item = Date> + '_ {
        std::iter::successors(Some(self.start), |d| d.next_day()).take_while(|d| *d <= self.end)
    }

    /// Number of dates in the plan.
    pub fn day_count(&self) -> usize {
        ((self.end - self.start).whole_days() + 1) as usize
    }
}

/// Outcome of a historical run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Requests made.
    pub requested: usize,
    /// Records stored.
    pub collected: usize,
    /// Dates skipped because they were already stored.
    pub skipped: usize,
    /// Dates requested without success, ascending.
    pub failed: Vec<Date>,
}
