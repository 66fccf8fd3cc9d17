//! cikmap Extractor
//!
//! Locates the nine-character security identifier (CUSIP) inside free-form
//! filing text.
//!
//! # Overview
//!
//! Filings are noisy: SGML headers full of tax ids and file numbers, HTML
//! tables, identifiers split across separators. The extractor is a pure
//! function over the document text that commits to one best answer and
//! reports how it got there.
//!
//! # Algorithm
//!
//! ```text
//! text → skip header → normalize → tokens
//!      → marker-window phase (near "CUSIP") → Window
//!      → whole-document fallback (strict)   → Fallback
//!      → nothing acceptable                 → NoMatch
//! ```
//!
//! Candidates are scored by length (nine preferred), presence of a letter,
//! a verified check digit and, in the window phase, proximity to the marker.
//!
//! The check digit is advisory: a mismatch halves confidence and forfeits the
//! ranking bonus, but a candidate is never rejected for it alone. The one
//! exception is an all-digit nine-character token, where a failing check
//! digit is what distinguishes a ZIP+4 code from a real identifier.
//!
//! # Example Usage
//!
//! ```
//! use cikmap_domain::ExtractionMethod;
//! use cikmap_extractor::{CandidateExtractor, ExtractorConfig};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let extractor = CandidateExtractor::new(ExtractorConfig::default())?;
//!
//! let extraction = extractor.extract("... CUSIP 68389X105 ...")?;
//! assert_eq!(extraction.candidate.as_deref(), Some("68389X105"));
//! assert_eq!(extraction.method, ExtractionMethod::Window);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod extractor;
mod normalize;
mod validate;


pub use config::ExtractorConfig;
pub use error::ExtractorError;
pub use extractor::{extract_candidate, CandidateExtractor};
pub use normalize::{normalize, skip_header};
pub use validate::{
    check_digit_status, compute_check_digit, is_denied_by_context, is_valid, CheckDigitStatus,
};
