//! Fetch module - what a single fetch of one descriptor produced

use crate::filing::FilingDescriptor;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a fetch did not yield a body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchErrorKind {
    /// Not worth retrying (404, 403, malformed locator, ...)
    Permanent,

    /// Every allowed attempt hit a transient failure
    Exhausted,

    /// Cancellation arrived before a body was produced
    Cancelled,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FetchErrorKind::Permanent => "permanent",
            FetchErrorKind::Exhausted => "exhausted",
            FetchErrorKind::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

/// Failure details carried inside a `FetchOutcome`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchFailure {
    /// Failure classification
    pub kind: FetchErrorKind,

    /// Number of physical attempts made
    pub attempts: u32,

    /// Last HTTP status seen, if any
    pub status: Option<u16>,

    /// Human-readable description
    pub message: String,
}

impl FetchFailure {
    /// Build a permanent failure
    pub fn permanent(message: impl Into<String>, attempts: u32, status: Option<u16>) -> Self {
        Self {
            kind: FetchErrorKind::Permanent,
            attempts,
            status,
            message: message.into(),
        }
    }

    /// Build a failure for a retry budget that ran out
    pub fn exhausted(message: impl Into<String>, attempts: u32, status: Option<u16>) -> Self {
        Self {
            kind: FetchErrorKind::Exhausted,
            attempts,
            status,
            message: message.into(),
        }
    }

    /// Build a failure for a fetch interrupted by cancellation
    pub fn cancelled(attempts: u32) -> Self {
        Self {
            kind: FetchErrorKind::Cancelled,
            attempts,
            status: None,
            message: "cancelled".to_string(),
        }
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(
                f,
                "{} after {} attempt(s) (HTTP {}): {}",
                self.kind, self.attempts, status, self.message
            ),
            None => write!(
                f,
                "{} after {} attempt(s): {}",
                self.kind, self.attempts, self.message
            ),
        }
    }
}

impl std::error::Error for FetchFailure {}

/// Result of fetching exactly one descriptor
///
/// Failures are values, not panics; they travel down the pipeline alongside
/// successful bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    /// The descriptor that was fetched
    pub descriptor: FilingDescriptor,

    /// Body text on success
    pub result: Result<String, FetchFailure>,
}

impl FetchOutcome {
    /// Successful fetch
    pub fn success(descriptor: FilingDescriptor, body: impl Into<String>) -> Self {
        Self {
            descriptor,
            result: Ok(body.into()),
        }
    }

    /// Failed fetch
    pub fn failure(descriptor: FilingDescriptor, failure: FetchFailure) -> Self {
        Self {
            descriptor,
            result: Err(failure),
        }
    }

    /// Body text, if the fetch succeeded
    pub fn body(&self) -> Option<&str> {
        self.result.as_deref().ok()
    }

    /// Failure details, if the fetch failed
    pub fn error(&self) -> Option<&FetchFailure> {
        self.result.as_ref().err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filing::FormKind;
    use chrono::NaiveDate;

    fn descriptor() -> FilingDescriptor {
        FilingDescriptor::new(
            "42",
            "TEST CO",
            FormKind::Schedule13D,
            NaiveDate::from_ymd_opt(2020, 1, 2).unwrap(),
            "https://example.test/0000000042-20-000001.txt",
        )
    }

    #[test]
    fn test_success_accessors() {
        let outcome = FetchOutcome::success(descriptor(), "body text");
        assert_eq!(outcome.body(), Some("body text"));
        assert!(outcome.error().is_none());
    }

    #[test]
    fn test_failure_accessors() {
        let outcome = FetchOutcome::failure(
            descriptor(),
            FetchFailure::permanent("not found", 1, Some(404)),
        );
        assert!(outcome.body().is_none());
        let err = outcome.error().unwrap();
        assert_eq!(err.kind, FetchErrorKind::Permanent);
        assert_eq!(err.status, Some(404));
    }

    #[test]
    fn test_failure_display() {
        let failure = FetchFailure::exhausted("service unavailable", 5, Some(503));
        assert_eq!(
            failure.to_string(),
            "exhausted after 5 attempt(s) (HTTP 503): service unavailable"
        );

        let cancelled = FetchFailure::cancelled(0);
        assert_eq!(cancelled.to_string(), "cancelled after 0 attempt(s): cancelled");
    }
}
