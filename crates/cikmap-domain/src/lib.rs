//! cikmap Domain Layer
//!
//! Value types shared by every layer of the filing pipeline. Nothing in this
//! crate performs I/O; fetchers, the extractor and the pipeline all speak in
//! these types.
//!
//! ## Key Concepts
//!
//! - **FilingDescriptor**: immutable metadata plus fetch locator for one filing
//! - **FetchOutcome**: the body (or failure) produced by exactly one fetch
//! - **Extraction**: the best-guess identifier, the method that found it and a confidence
//! - **ItemOutcome**: the terminal, recorded state of one descriptor
//! - **BatchRecord**: the externally visible row handed to the sink
//!
//! ## Lifecycle
//!
//! ```text
//! Pending → Fetching → Fetched | FetchFailed
//!         → (Fetched only) Parsing → Parsed | ParseFailed
//!         → Recorded
//! ```
//!
//! `ItemOutcome` is the `Recorded` state; `OutcomeStatus` tells which branch
//! the descriptor took to get there.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod extraction;
pub mod fetch;
pub mod filing;
pub mod outcome;

// Re-exports for convenience
pub use extraction::{Extraction, ExtractionMethod, ExtractionResult};
pub use fetch::{FetchErrorKind, FetchFailure, FetchOutcome};
pub use filing::{accession_from_locator, FilingDescriptor, FormKind};
pub use outcome::{BatchRecord, ItemOutcome, OutcomeStatus, RecordStatus};
