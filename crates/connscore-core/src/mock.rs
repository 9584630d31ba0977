//! Test doubles for the network and the clock.
//!
//! [`MockSource`] implements [`PageSource`] with scripted per-date responses
//! and [`RecordingSleeper`] implements [`Sleeper`] by recording every pause
//! instead of waiting.
//!
//! # Example
//!
//! ```
//! use connscore_core::{MockSource, PageSource, companion_page};
//! use time::macros::date;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let source = MockSource::new()
//!     .with_page(date!(2024 - 01 - 01), companion_page(3.0, 5))
//!     .with_status(date!(2024 - 01 - 02), 404);
//!
//! assert!(source.fetch(date!(2024 - 01 - 01)).await.is_ok());
//! assert!(source.fetch(date!(2024 - 01 - 02)).await.is_err());
//! # }
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use time::Date;
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::fetch::{PageSource, companion_url};
use crate::sleep::Sleeper;

/// A companion page carrying `rating` in the usual wording.
pub fn companion_page(rating: f64, max_score: u8) -> String {
    format!(
        "<html><body><article>\
         <p>Welcome to the Connections Companion.</p>\
         <p><strong>Today&#x27;s difficulty is {} out of {}</strong></p>\
         </article></body></html>",
        rating, max_score
    )
}

/// One scripted response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockResponse {
    /// Serve this body with status 200.
    Page(String),
    /// Fail with this HTTP status.
    Status(u16),
}

/// A [`PageSource`] that serves scripted responses.
///
/// Responses queued for a date are served in order; the last one repeats.
/// Dates with nothing queued answer 404.
pub struct MockSource {
    responses: Mutex<HashMap<Date, VecDeque<MockResponse>>>,
    requests: Mutex<Vec<Date>>,
    request_count: AtomicU32,
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSource {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            request_count: AtomicU32::new(0),
        }
    }

    /// Queue `response` for `date`.
    #[must_use]
    pub fn with_response(mut self, date: Date, response: MockResponse) -> Self {
        self.responses
            .get_mut()
            .entry(date)
            .or_default()
            .push_back(response);
        self
    }

    #[must_use]
    pub fn with_page(self, date: Date, body: impl Into<String>) -> Self {
        self.with_response(date, MockResponse::Page(body.into()))
    }

    #[must_use]
    pub fn with_status(self, date: Date, status: u16) -> Self {
        self.with_response(date, MockResponse::Status(status))
    }

    /// Queue a response after construction.
    pub async fn push_response(&self, date: Date, response: MockResponse) {
        self.responses
            .lock()
            .await
            .entry(date)
            .or_default()
            .push_back(response);
    }

    /// Dates requested so far, in request order.
    pub async fn requests(&self) -> Vec<Date> {
        self.requests.lock().await.clone()
    }

    pub fn request_count(&self) -> u32 {
        self.request_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl PageSource for MockSource {
    async fn fetch(&self, date: Date) -> Result<String> {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        self.requests.lock().await.push(date);

        let response = {
            let mut responses = self.responses.lock().await;
            match responses.get_mut(&date) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        let url = companion_url("https://mock.invalid", date);
        match response {
            Some(MockResponse::Page(body)) => Ok(body),
            Some(MockResponse::Status(status)) => Err(Error::Http { url, status }),
            None => Err(Error::Http { url, status: 404 }),
        }
    }
}

/// A [`Sleeper`] that records pauses and returns immediately.
#[derive(Default)]
pub struct RecordingSleeper {
    pauses: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every pause requested so far, in order.
    pub async fn pauses(&self) -> Vec<Duration> {
        self.pauses.lock().await.clone()
    }

    /// Sum of every pause requested so far.
    pub async fn total(&self) -> Duration {
        self.pauses.lock().await.iter().sum()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.pauses.lock().await.push(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    const DAY: Date = date!(2024 - 01 - 01);

    #[tokio::test]
    async fn test_queued_responses_in_order_last_repeats() {
        let source = MockSource::new()
            .with_status(DAY, 503)
            .with_page(DAY, "ok");

        assert!(matches!(
            source.fetch(DAY).await,
            Err(Error::Http { status: 503, .. })
        ));
        assert_eq!(source.fetch(DAY).await.unwrap(), "ok");
        assert_eq!(source.fetch(DAY).await.unwrap(), "ok");
        assert_eq!(source.request_count(), 3);
    }

    #[tokio::test]
    async fn test_unscripted_date_is_not_found() {
        let source = MockSource::new();
        assert!(matches!(
            source.fetch(DAY).await,
            Err(Error::Http { status: 404, .. })
        ));
        assert_eq!(source.requests().await, vec![DAY]);
    }

    #[tokio::test]
    async fn test_push_response_after_construction() {
        let source = MockSource::new();
        source.push_response(DAY, MockResponse::Page("late".into())).await;
        assert_eq!(source.fetch(DAY).await.unwrap(), "late");
    }

    #[tokio::test]
    async fn test_recording_sleeper() {
        let sleeper = RecordingSleeper::new();
        sleeper.sleep(Duration::from_secs(2)).await;
        sleeper.sleep(Duration::from_secs(3)).await;
        assert_eq!(
            sleeper.pauses().await,
            vec![Duration::from_secs(2), Duration::from_secs(3)]
        );
        assert_eq!(sleeper.total().await, Duration::from_secs(5));
    }
}
