//! cikmap Pipeline
//!
//! Concurrent fetch/parse orchestration over a batch of filing descriptors.
//!
//! # Overview
//!
//! The pipeline is responsible for:
//! - **Fetching**: a pool of fetch workers, every attempt paid through one shared
//!   [`cikmap_fetch::RateGovernor`]
//! - **Parsing**: a pool of parse workers running the candidate extractor off the
//!   async runtime
//! - **Collecting**: exactly one terminal [`cikmap_domain::ItemOutcome`] per input
//!   descriptor, whatever fails along the way
//! - **Resuming**: skipping item keys an earlier batch already holds
//! - **Mapping**: folding a finished batch into the CIK to CUSIP mapping and
//!   per-pair dynamics
//!
//! # Architecture
//!
//! ```text
//!   descriptors ──cursor──▶ fetch workers ──bounded buffer──▶ parse workers
//!                               │                                  │
//!                               └──────────── outcomes ◀───────────┘
//!                                                │
//!                                            collector
//! ```
//!
//! Fetch failures skip the buffer and go straight to the collector. When the
//! buffer is full, fetch workers wait, which in turn stops them from paying
//! for requests the parsers cannot absorb.
//!
//! ## Cancellation
//!
//! Raising a [`CancelSignal`] stops workers from pulling new descriptors. A
//! fetch in flight is abandoned, buffered documents are drained as
//! `Cancelled`, and descriptors never dispatched are recorded as `Cancelled`
//! by the collector. The run returns promptly with a complete report.
//!
//! # Usage
//!
//! ```no_run
//! use cikmap_fetch::{FetchConfig, HttpFetcher};
//! use cikmap_pipeline::{CancelSignal, Pipeline, PipelineConfig, ResumeLedger};
//!
//! # async fn example(
//! #     descriptors: Vec<cikmap_domain::FilingDescriptor>,
//! #     existing: Vec<cikmap_domain::BatchRecord>,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = HttpFetcher::new(FetchConfig {
//!     contact_name: "Jane Analyst".to_string(),
//!     contact_email: "jane@example.com".to_string(),
//!     ..FetchConfig::default()
//! })?;
//! let config = PipelineConfig::default();
//! let pipeline = Pipeline::new(fetcher, config.clone())?;
//!
//! let ledger = ResumeLedger::load(&existing);
//! let residual = ledger.filter(descriptors, config.force_refetch);
//!
//! let cancel = CancelSignal::new();
//! let report = pipeline.run_until(residual, &cancel).await;
//! let batch = cikmap_pipeline::merge(existing, report.records());
//! println!("{}\n{} records", report.summary.summary(), batch.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration Presets
//!
//! ```
//! use cikmap_pipeline::PipelineConfig;
//!
//! // Default: 10 req/s, 4 fetch workers, 4 parse workers
//! let config = PipelineConfig::default();
//!
//! // Aggressive: more workers, deeper buffer
//! let config = PipelineConfig::aggressive();
//!
//! // Polite: half the request rate
//! let config = PipelineConfig::polite();
//! ```

#![warn(missing_docs)]

mod cancel;
mod config;
mod error;
mod ledger;
mod mapping;
mod pipeline;
mod summary;

pub use cancel::CancelSignal;
pub use config::PipelineConfig;
pub use error::PipelineError;
pub use ledger::{dedup, merge, ResumeLedger};
pub use mapping::{build_dynamics, build_mapping, CusipDynamics, MappingOptions, MappingRow};
pub use pipeline::{Pipeline, RunReport};
pub use summary::RunSummary;
