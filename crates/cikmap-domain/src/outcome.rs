//! Outcome module - terminal per-item states and the rows built from them

use crate::extraction::{Extraction, ExtractionMethod};
use crate::fetch::{FetchErrorKind, FetchFailure};
use crate::filing::{FilingDescriptor, FormKind};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Which terminal branch a descriptor took
#[derive(Debug, Clone, PartialEq)]
pub enum OutcomeStatus {
    /// Fetched and parsed; the extraction may still be `NoMatch`
    Parsed(Extraction),

    /// The fetch gave up (permanent error or retries exhausted)
    FetchFailed(FetchFailure),

    /// The body could not be analysed
    ParseFailed(String),

    /// Cancellation reached the item before it finished
    Cancelled,
}

/// Terminal (`Recorded`) state of one input descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct ItemOutcome {
    /// The descriptor this outcome belongs to
    pub descriptor: FilingDescriptor,

    /// How processing ended
    pub status: OutcomeStatus,
}

impl ItemOutcome {
    /// Outcome for a parsed document
    pub fn parsed(descriptor: FilingDescriptor, extraction: Extraction) -> Self {
        Self {
            descriptor,
            status: OutcomeStatus::Parsed(extraction),
        }
    }

    /// Outcome for a failed fetch
    pub fn fetch_failed(descriptor: FilingDescriptor, failure: FetchFailure) -> Self {
        Self {
            descriptor,
            status: OutcomeStatus::FetchFailed(failure),
        }
    }

    /// Outcome for a failed parse
    pub fn parse_failed(descriptor: FilingDescriptor, reason: impl Into<String>) -> Self {
        Self {
            descriptor,
            status: OutcomeStatus::ParseFailed(reason.into()),
        }
    }

    /// Outcome for a cancelled item
    pub fn cancelled(descriptor: FilingDescriptor) -> Self {
        Self {
            descriptor,
            status: OutcomeStatus::Cancelled,
        }
    }

    /// The item key of the underlying descriptor
    pub fn item_key(&self) -> &str {
        &self.descriptor.item_key
    }

    /// The extraction, if the item was parsed
    pub fn extraction(&self) -> Option<&Extraction> {
        match &self.status {
            OutcomeStatus::Parsed(extraction) => Some(extraction),
            _ => None,
        }
    }

    /// Whether the item was cancelled
    pub fn is_cancelled(&self) -> bool {
        matches!(self.status, OutcomeStatus::Cancelled)
    }
}

/// Status column of a `BatchRecord`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// Fetched and parsed
    Ok,

    /// Fetch failed for good
    FetchFailed,

    /// Fetch ran out of retries on transient errors
    FetchExhausted,

    /// Parse failed
    ParseFailed,
}

impl RecordStatus {
    /// Whether a later run should try this filing again
    pub fn is_retryable(&self) -> bool {
        matches!(self, RecordStatus::FetchExhausted)
    }
}

/// Externally visible row handed to the sink
///
/// `item_key` is unique within an emitted batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRecord {
    /// Filer identifier (CIK)
    pub issuer_key: String,

    /// Filer name
    #[serde(default)]
    pub company_name: String,

    /// Form type
    pub form_kind: FormKind,

    /// Filing date
    pub filed_on: NaiveDate,

    /// Stable identity
    pub item_key: String,

    /// Filing locator
    #[serde(default)]
    pub fetch_target: String,

    /// Extracted identifier, if any
    pub candidate: Option<String>,

    /// How the identifier was found
    pub method: ExtractionMethod,

    /// Extraction confidence
    #[serde(default)]
    pub confidence: f32,

    /// Processing status
    pub status: RecordStatus,

    /// Failure description for non-`ok` rows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchRecord {
    /// Build the row for a terminal outcome
    ///
    /// Returns `None` for cancelled items: they are left out of the batch so
    /// the next run picks them up again.
    pub fn from_outcome(outcome: &ItemOutcome) -> Option<Self> {
        let d = &outcome.descriptor;
        let (candidate, method, confidence, status, error) = match &outcome.status {
            OutcomeStatus::Parsed(extraction) => (
                extraction.candidate.clone(),
                extraction.method,
                extraction.confidence,
                RecordStatus::Ok,
                None,
            ),
            OutcomeStatus::FetchFailed(failure) => (
                None,
                ExtractionMethod::NoMatch,
                0.0,
                match failure.kind {
                    FetchErrorKind::Exhausted => RecordStatus::FetchExhausted,
                    _ => RecordStatus::FetchFailed,
                },
                Some(failure.to_string()),
            ),
            OutcomeStatus::ParseFailed(reason) => (
                None,
                ExtractionMethod::NoMatch,
                0.0,
                RecordStatus::ParseFailed,
                Some(reason.clone()),
            ),
            OutcomeStatus::Cancelled => return None,
        };

        Some(Self {
            issuer_key: d.issuer_key.clone(),
            company_name: d.company_name.clone(),
            form_kind: d.form_kind.clone(),
            filed_on: d.filed_on,
            item_key: d.item_key.clone(),
            fetch_target: d.fetch_target.clone(),
            candidate,
            method,
            confidence,
            status,
            error,
        })
    }

    /// Whether this row carries an identifier
    pub fn has_candidate(&self) -> bool {
        self.candidate.is_some()
    }
}
