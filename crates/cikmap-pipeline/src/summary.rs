//! Run summary derived from outcomes

use cikmap_domain::{ExtractionMethod, FetchErrorKind, ItemOutcome, OutcomeStatus};
use std::time::Duration;

/// Counts collected while outcomes are recorded
///
/// Everything here is derived from outcomes; nothing is counted from errors
/// bubbling out of the pipeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// Outcomes recorded
    pub total: usize,

    /// Items found near a marker
    pub window: usize,

    /// Items found by the whole-document fallback
    pub fallback: usize,

    /// Items parsed without finding an identifier
    pub no_match: usize,

    /// Fetches rejected permanently
    pub fetch_permanent: usize,

    /// Fetches that ran out of retries
    pub fetch_exhausted: usize,

    /// Documents that could not be parsed
    pub parse_failed: usize,

    /// Items stopped by cancellation
    pub cancelled: usize,

    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

impl RunSummary {
    /// Create an empty summary
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one terminal outcome
    pub fn record(&mut self, outcome: &ItemOutcome) {
        self.total += 1;
        match &outcome.status {
            OutcomeStatus::Parsed(extraction) => match extraction.method {
                ExtractionMethod::Window => self.window += 1,
                ExtractionMethod::Fallback => self.fallback += 1,
                ExtractionMethod::NoMatch => self.no_match += 1,
            },
            OutcomeStatus::FetchFailed(failure) => match failure.kind {
                FetchErrorKind::Permanent => self.fetch_permanent += 1,
                FetchErrorKind::Exhausted => self.fetch_exhausted += 1,
                FetchErrorKind::Cancelled => self.cancelled += 1,
            },
            OutcomeStatus::ParseFailed(_) => self.parse_failed += 1,
            OutcomeStatus::Cancelled => self.cancelled += 1,
        }
    }

    /// Items fetched and parsed
    pub fn total_parsed(&self) -> usize {
        self.window + self.fallback + self.no_match
    }

    /// Items with an identifier
    pub fn total_found(&self) -> usize {
        self.window + self.fallback
    }

    /// Items that failed to fetch
    pub fn total_fetch_failed(&self) -> usize {
        self.fetch_permanent + self.fetch_exhausted
    }

    /// Items that ended in any failure (cancellation excluded)
    pub fn total_failed(&self) -> usize {
        self.total_fetch_failed() + self.parse_failed
    }

    /// Share of parsed items with an identifier, in [0, 1]
    pub fn found_rate(&self) -> f64 {
        let parsed = self.total_parsed();
        if parsed == 0 {
            0.0
        } else {
            self.total_found() as f64 / parsed as f64
        }
    }

    /// Reset all counters
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Generate a summary report
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "Run Summary".to_string(),
            "===========".to_string(),
            format!("Filings processed: {}", self.total),
            format!("Elapsed: {:.1}s", self.elapsed.as_secs_f64()),
            String::new(),
            format!("Parsed: {}", self.total_parsed()),
            format!("  window: {}", self.window),
            format!("  fallback: {}", self.fallback),
            format!("  none: {}", self.no_match),
            format!("  found rate: {:.1}%", self.found_rate() * 100.0),
        ];

        if self.total_failed() > 0 {
            lines.push(String::new());
            lines.push(format!("Failed: {}", self.total_failed()));
            lines.push(format!("  fetch (permanent): {}", self.fetch_permanent));
            lines.push(format!("  fetch (exhausted): {}", self.fetch_exhausted));
            lines.push(format!("  parse: {}", self.parse_failed));
        }

        if self.cancelled > 0 {
            lines.push(String::new());
            lines.push(format!("Cancelled: {}", self.cancelled));
        }

        lines.join("\n")
    }
}
