//! Error types for the pipeline

use cikmap_fetch::GovernorError;
use thiserror::Error;

/// Errors that abort a run before any work starts
///
/// Per-item failures are never errors; they are recorded as outcomes.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// The rate governor could not be built
    #[error("Rate governor error: {0}")]
    Governor(#[from] GovernorError),
}
