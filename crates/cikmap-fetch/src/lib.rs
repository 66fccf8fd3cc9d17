//! cikmap Fetch Layer
//!
//! Rate-governed access to the filing archive.
//!
//! # Architecture
//!
//! Every outbound request passes through a [`RateGovernor`] exactly once per
//! physical attempt; retries pay for their own permits. The governor is an
//! explicit value handed to each call, so independent instances can coexist
//! (one per test, one per run).
//!
//! # Fetchers
//!
//! - `HttpFetcher`: `reqwest` client with identity headers and retry/backoff
//! - `MockFetcher`: deterministic test double with scripted bodies, failures
//!   and latency
//!
//! # Examples
//!
//! ```
//! use cikmap_domain::{FilingDescriptor, FormKind};
//! use cikmap_fetch::{Fetcher, MockFetcher, RateGovernor};
//!
//! # async fn example() {
//! let fetcher = MockFetcher::new("CUSIP 68389X105");
//! let governor = RateGovernor::new(10.0).unwrap();
//! let descriptor = FilingDescriptor::new(
//!     "1341439",
//!     "ORACLE CORP",
//!     FormKind::Schedule13G,
//!     chrono::NaiveDate::from_ymd_opt(2024, 2, 14).unwrap(),
//!     "https://www.sec.gov/Archives/edgar/data/1341439/0001341439-24-000001.txt",
//! );
//!
//! let outcome = fetcher.fetch(&descriptor, &governor).await;
//! assert_eq!(outcome.body(), Some("CUSIP 68389X105"));
//! # }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod governor;
pub mod http;

use async_trait::async_trait;
use cikmap_domain::{FetchFailure, FetchOutcome, FilingDescriptor};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

pub use config::FetchConfig;
pub use error::FetchError;
pub use governor::{GovernorError, RateGovernor};
pub use http::HttpFetcher;

/// Fetch transport consumed by the pipeline
///
/// Implementations acquire one governor permit per physical attempt and
/// always return an outcome; failures are values, never panics.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch the text of one filing
    async fn fetch(&self, descriptor: &FilingDescriptor, governor: &RateGovernor) -> FetchOutcome;
}

#[async_trait]
impl<F: Fetcher + ?Sized> Fetcher for Arc<F> {
    async fn fetch(&self, descriptor: &FilingDescriptor, governor: &RateGovernor) -> FetchOutcome {
        (**self).fetch(descriptor, governor).await
    }
}

#[derive(Debug, Clone)]
enum Scripted {
    Body(String),
    Failure(FetchFailure),
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mock fetcher for deterministic testing
///
/// Returns scripted bodies or failures keyed by `item_key` without touching
/// the network. Each call still acquires one governor permit.
///
/// # Examples
///
/// ```
/// use cikmap_domain::FetchFailure;
/// use cikmap_fetch::MockFetcher;
/// use std::time::Duration;
///
/// let fetcher = MockFetcher::new("default body")
///     .with_latency(Duration::from_millis(5));
/// fetcher.add_response("0000000001-24-000001", "CUSIP 68389X105");
/// fetcher.add_failure(
///     "0000000001-24-000002",
///     FetchFailure::permanent("HTTP 404", 1, Some(404)),
/// );
/// assert_eq!(fetcher.call_count(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct MockFetcher {
    default_body: String,
    latency: Duration,
    responses: Arc<Mutex<HashMap<String, Scripted>>>,
    delays: Arc<Mutex<HashMap<String, Duration>>>,
    fetched: Arc<Mutex<Vec<String>>>,
}

impl MockFetcher {
    /// Create a mock returning `body` for every unscripted item
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            default_body: body.into(),
            latency: Duration::ZERO,
            responses: Arc::new(Mutex::new(HashMap::new())),
            delays: Arc::new(Mutex::new(HashMap::new())),
            fetched: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Delay every fetch by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Script the body returned for one item
    pub fn add_response(&self, item_key: impl Into<String>, body: impl Into<String>) {
        lock(&self.responses).insert(item_key.into(), Scripted::Body(body.into()));
    }

    /// Script a failure for one item
    pub fn add_failure(&self, item_key: impl Into<String>, failure: FetchFailure) {
        lock(&self.responses).insert(item_key.into(), Scripted::Failure(failure));
    }

    /// Override the latency of one item
    pub fn add_delay(&self, item_key: impl Into<String>, delay: Duration) {
        lock(&self.delays).insert(item_key.into(), delay);
    }

    /// Number of fetches performed
    pub fn call_count(&self) -> usize {
        lock(&self.fetched).len()
    }

    /// Item keys fetched, in call order
    pub fn fetched_keys(&self) -> Vec<String> {
        lock(&self.fetched).clone()
    }

    /// Forget recorded calls
    pub fn reset_call_count(&self) {
        lock(&self.fetched).clear();
    }
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new("Default mock filing")
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, descriptor: &FilingDescriptor, governor: &RateGovernor) -> FetchOutcome {
        governor.acquire(1).await;
        lock(&self.fetched).push(descriptor.item_key.clone());

        let delay = lock(&self.delays)
            .get(&descriptor.item_key)
            .copied()
            .unwrap_or(self.latency);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let scripted = lock(&self.responses).get(&descriptor.item_key).cloned();
        match scripted {
            Some(Scripted::Body(body)) => FetchOutcome::success(descriptor.clone(), body),
            Some(Scripted::Failure(failure)) => FetchOutcome::failure(descriptor.clone(), failure),
            None => FetchOutcome::success(descriptor.clone(), self.default_body.clone()),
        }
    }
}
