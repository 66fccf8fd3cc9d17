//! Error types for the CLI application.

use cikmap_fetch::FetchError;
use cikmap_pipeline::PipelineError;
use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Pipeline could not start
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Archive request failed
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Unusable index file
    #[error("Index error: {0}")]
    Index(String),
}
