//! Error types for the fetch client

use cikmap_domain::FetchFailure;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while fetching from the archive
#[derive(Error, Debug)]
pub enum FetchError {
    /// Worth retrying: network failure, 429 or a 5xx gateway/overload status
    #[error("Transient fetch error: {message}")]
    Transient {
        /// HTTP status, if a response arrived
        status: Option<u16>,
        /// Description
        message: String,
        /// Server-requested delay before the next attempt
        retry_after: Option<Duration>,
    },

    /// Not worth retrying: any other 4xx or a malformed request
    #[error("Permanent fetch error: {message}")]
    Permanent {
        /// Attempts made (always the last one)
        attempts: u32,
        /// HTTP status, if a response arrived
        status: Option<u16>,
        /// Description
        message: String,
    },

    /// Every allowed attempt failed transiently
    #[error("Retries exhausted after {attempts} attempt(s): {message}")]
    Exhausted {
        /// Attempts made
        attempts: u32,
        /// Last HTTP status seen
        status: Option<u16>,
        /// Last failure description
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl FetchError {
    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Transient { status, .. }
            | FetchError::Permanent { status, .. }
            | FetchError::Exhausted { status, .. } => *status,
            FetchError::Config(_) => None,
        }
    }

    /// Convert into the per-item failure recorded by the pipeline
    pub fn into_failure(self) -> FetchFailure {
        match self {
            FetchError::Transient {
                status, message, ..
            } => FetchFailure::exhausted(message, 1, status),
            FetchError::Permanent {
                attempts,
                status,
                message,
            } => FetchFailure::permanent(message, attempts, status),
            FetchError::Exhausted {
                attempts,
                status,
                message,
            } => FetchFailure::exhausted(message, attempts, status),
            FetchError::Config(message) => FetchFailure::permanent(message, 0, None),
        }
    }
}
