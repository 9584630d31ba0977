//! Retry controller for single-date collection.
//!
//! Retrying is an explicit state machine. [`RetryState::advance`] is pure;
//! [`run_with_retry`] drives it, pausing through a [`Sleeper`] between
//! attempts.
//!
//! ```text
//! Attempting(n) --ok--------------------------------> Success
//! Attempting(n) --retryable error, n < attempts-----> Attempting(n + 1)
//! Attempting(n) --error, n == attempts or fatal-----> Exhausted
//! ```

use std::future::Future;
use std::time::Duration;

use time::Date;
use tracing::{error, info, warn};

use connscore_types::{Record, format_date};

use crate::error::{Error, Result};
use crate::sleep::Sleeper;

/// Default pause between attempts (two hours).
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2 * 60 * 60);

/// How many times to try a date and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, at least 1.
    pub attempts: u32,
    /// Pause after each failed attempt except the last.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 1,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Create a policy; `attempts` is clamped to at least 1.
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }
}

/// Where a retried collection stands.
#[derive(Debug)]
pub enum RetryState {
    /// Attempt `n` (1-based) is about to run.
    Attempting(u32),
    /// A record was extracted.
    Success(Record),
    /// No more attempts will be made.
    Exhausted { attempts: u32, last_error: Error },
}

impl RetryState {
    /// The state before the first attempt.
    pub fn start() -> Self {
        RetryState::Attempting(1)
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RetryState::Attempting(_))
    }

    /// Apply the outcome of the current attempt.
    ///
    /// Terminal states are returned unchanged.
    #[must_use]
    pub fn advance(self, policy: &RetryPolicy, outcome: Result<Record>) -> Self {
        let RetryState::Attempting(n) = self else {
            return self;
        };
        match outcome {
            Ok(record) => RetryState::Success(record),
            Err(e) if e.is_retryable() && n < policy.attempts => RetryState::Attempting(n + 1),
            Err(last_error) => RetryState::Exhausted {
                attempts: n,
                last_error,
            },
        }
    }

    /// The record, when collection succeeded.
    pub fn record(&self) -> Option<&Record> {
        match self {
            RetryState::Success(record) => Some(record),
            _ => None,
        }
    }
}

/// Run `attempt` until it succeeds or `policy` is used up.
///
/// Always returns a terminal state. Exhaustion is logged, not raised.
pub async fn run_with_retry<F, Fut>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    date: Date,
    mut attempt: F,
) -> RetryState
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Record>>,
{
    let day = format_date(date);
    let mut state = RetryState::start();

    while let RetryState::Attempting(n) = state {
        info!("Attempt {}/{} for {}", n, policy.attempts, day);
        let outcome = attempt().await;
        if let Err(e) = &outcome {
            warn!("Attempt {}/{} for {} failed: {}", n, policy.attempts, day, e);
        }

        state = state.advance(policy, outcome);
        match &state {
            RetryState::Attempting(_) => {
                info!("Retrying {} in {:?}", day, policy.delay);
                sleeper.sleep(policy.delay).await;
            }
            RetryState::Success(record) => info!("Collected {}", record),
            RetryState::Exhausted {
                attempts,
                last_error,
            } => error!(
                "Giving up on {} after {} attempt(s): {}",
                day, attempts, last_error
            ),
        }
    }

    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use connscore_types::RecordError;
    use time::macros::date;

    const DAY: Date = date!(2024 - 01 - 01);

    fn http_error() -> Error {
        Error::Http {
            url: "https://example.com".into(),
            status: 503,
        }
    }

    fn record() -> Record {
        Record::new(DAY, 3.0, 5).unwrap()
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts, 1);
        assert_eq!(policy.delay, Duration::from_secs(7200));
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).attempts, 1);
    }

    #[test]
    fn test_success_is_terminal() {
        let policy = RetryPolicy::new(3, Duration::ZERO);
        let state = RetryState::start().advance(&policy, Ok(record()));
        assert!(state.is_terminal());
        assert_eq!(state.record(), Some(&record()));
    }

    #[test]
    fn test_retryable_failure_advances() {
        let policy = RetryPolicy::new(3, Duration::ZERO);
        let state = RetryState::start().advance(&policy, Err(http_error()));
        assert!(matches!(state, RetryState::Attempting(2)));
    }

    #[test]
    fn test_last_attempt_exhausts() {
        let policy = RetryPolicy::new(2, Duration::ZERO);
        let state = RetryState::Attempting(2).advance(&policy, Err(http_error()));
        assert!(matches!(
            state,
            RetryState::Exhausted {
                attempts: 2,
                last_error: Error::Http { status: 503, .. }
            }
        ));
    }

    #[test]
    fn test_validation_failure_exhausts_immediately() {
        let policy = RetryPolicy::new(5, Duration::ZERO);
        let invalid = Error::Record(RecordError::InvalidRating {
            value: 9.0,
            max_score: 5,
        });
        let state = RetryState::start().advance(&policy, Err(invalid));
        assert!(matches!(state, RetryState::Exhausted { attempts: 1, .. }));
    }

    #[test]
    fn test_terminal_state_ignores_outcome() {
        let policy = RetryPolicy::default();
        let state = RetryState::Success(record()).advance(&policy, Err(http_error()));
        assert!(matches!(state, RetryState::Success(_)));
    }
}
