//! Error types for the Extractor

use thiserror::Error;

/// Errors that can occur during extraction
///
/// Finding nothing is not an error; it is reported as
/// `ExtractionMethod::NoMatch`.
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// Document exceeds the configured size limit
    #[error("Text too long: {0} bytes (max: {1})")]
    TextTooLong(usize, usize),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
