//! Extraction module - the parser's verdict for one document

use crate::filing::FilingDescriptor;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the extractor arrived at its answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtractionMethod {
    /// Found near an explicit identifier label
    #[serde(rename = "window")]
    Window,

    /// Found by scanning the whole document
    #[serde(rename = "fallback")]
    Fallback,

    /// Nothing acceptable was found
    #[serde(rename = "none")]
    NoMatch,
}

impl ExtractionMethod {
    /// Wire label (`window`, `fallback`, `none`)
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::Window => "window",
            ExtractionMethod::Fallback => "fallback",
            ExtractionMethod::NoMatch => "none",
        }
    }
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Best-guess identifier extracted from a document
///
/// `candidate` is `None` exactly when `method` is `NoMatch`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    /// The chosen identifier, upper-cased
    pub candidate: Option<String>,

    /// Which phase produced it
    pub method: ExtractionMethod,

    /// Confidence in [0.0, 1.0]
    pub confidence: f32,
}

impl Extraction {
    /// A successful extraction
    pub fn found(candidate: impl Into<String>, method: ExtractionMethod, confidence: f32) -> Self {
        Self {
            candidate: Some(candidate.into()),
            method,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// No candidate anywhere in the document
    pub fn no_match() -> Self {
        Self {
            candidate: None,
            method: ExtractionMethod::NoMatch,
            confidence: 0.0,
        }
    }

    /// Whether a candidate was found
    pub fn is_match(&self) -> bool {
        self.candidate.is_some()
    }
}

/// Extraction produced for one fetched descriptor
///
/// Created exactly once per successful fetch and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// The filing the text came from
    pub descriptor: FilingDescriptor,

    /// What the extractor found
    pub extraction: Extraction,
}

impl ExtractionResult {
    /// Pair an extraction with its descriptor
    pub fn new(descriptor: FilingDescriptor, extraction: Extraction) -> Self {
        Self {
            descriptor,
            extraction,
        }
    }

    /// `(candidate, method)` view of the result
    pub fn as_pair(&self) -> (Option<&str>, ExtractionMethod) {
        (
            self.extraction.candidate.as_deref(),
            self.extraction.method,
        )
    }
}
