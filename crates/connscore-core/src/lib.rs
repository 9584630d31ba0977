//! Collection of Connections difficulty ratings.
//!
//! This crate fetches the companion page for a puzzle date, extracts the
//! published difficulty rating, and merges it into a
//! [`Store`](connscore_store::Store).
//!
//! # Features
//!
//! - Companion page retrieval over HTTP(S), optionally through a proxy
//! - Rating extraction tolerant of markup and wording changes
//! - Daily collection with a long-delay retry controller
//! - Historical backfill with jittered pacing, batch cooldowns and
//!   failure-streak pauses
//! - Test doubles for the network and the clock ([`MockSource`],
//!   [`RecordingSleeper`])
//!
//! # Example
//!
//! ```no_run
//! use connscore_core::{Collector, FetchConfig, HttpFetcher, RetryPolicy, TokioSleeper};
//! use connscore_store::Store;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = HttpFetcher::new(FetchConfig::default().with_env_proxy())?;
//! let collector = Collector::new(fetcher, TokioSleeper, Store::open("data")?);
//!
//! let today = time::OffsetDateTime::now_utc().date();
//! let state = collector.collect_daily(today, &RetryPolicy::default()).await?;
//! println!("{:?}", state.record());
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod collector;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod mock;
pub mod retry;
pub mod sleep;

pub use batch::{BatchPlan, BatchSummary, DEFAULT_START_DATE, Pacer, Pacing};
pub use collector::Collector;
pub use config::{
    DEFAULT_BASE_URL, DEFAULT_TIMEOUT, FetchConfig, PROXY_PASSWORD_ENV, redact_proxy,
    resolve_proxy,
};
pub use error::{Error, Result};
pub use extract::{extract, find_rating, save_debug_html};
pub use fetch::{HttpFetcher, PageSource, USER_AGENTS, companion_url, pick_user_agent};
pub use mock::{MockResponse, MockSource, RecordingSleeper, companion_page};
pub use retry::{DEFAULT_RETRY_DELAY, RetryPolicy, RetryState, run_with_retry};
pub use sleep::{Sleeper, TokioSleeper};

// Re-export the record model for convenience.
pub use connscore_types::{Record, RecordError};
