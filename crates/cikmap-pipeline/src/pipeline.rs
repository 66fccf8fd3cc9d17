//! Concurrent fetch/parse orchestration

use crate::cancel::CancelSignal;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::ledger;
use crate::summary::RunSummary;
use cikmap_domain::{
    BatchRecord, ExtractionResult, FetchErrorKind, FetchFailure, FetchOutcome, FilingDescriptor,
    ItemOutcome, OutcomeStatus,
};
use cikmap_extractor::CandidateExtractor;
use cikmap_fetch::{Fetcher, RateGovernor};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

type Handoff = (usize, FetchOutcome);
type Recorded = (usize, ItemOutcome);

/// Everything a finished run produced
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Time-ordered id of this run
    pub run_id: Uuid,

    /// One terminal outcome per input descriptor, in completion order
    pub outcomes: Vec<ItemOutcome>,

    /// Counts derived from `outcomes`
    pub summary: RunSummary,
}

impl RunReport {
    /// Batch records for persistence, one per item key
    ///
    /// Cancelled items are left out so a later run picks them up again.
    pub fn records(&self) -> Vec<BatchRecord> {
        ledger::dedup(
            self.outcomes
                .iter()
                .filter_map(BatchRecord::from_outcome)
                .collect(),
        )
    }

    /// Extraction results of the items that were fetched and parsed
    pub fn extraction_results(&self) -> Vec<ExtractionResult> {
        self.outcomes
            .iter()
            .filter_map(|outcome| match &outcome.status {
                OutcomeStatus::Parsed(extraction) => Some(ExtractionResult::new(
                    outcome.descriptor.clone(),
                    extraction.clone(),
                )),
                _ => None,
            })
            .collect()
    }
}

/// Fetch/parse pipeline over a pool of fetch workers and a pool of parse workers
///
/// Fetch workers pull descriptors from a shared cursor, pay the governor and
/// hand fetched documents to the parse pool over a bounded channel. Every
/// terminal outcome flows to a single collector on the caller's task.
///
/// # Examples
///
/// ```
/// use cikmap_domain::{FilingDescriptor, FormKind};
/// use cikmap_fetch::MockFetcher;
/// use cikmap_pipeline::{Pipeline, PipelineConfig};
///
/// # async fn example() -> Result<(), cikmap_pipeline::PipelineError> {
/// let fetcher = MockFetcher::new("CUSIP No. 68389X105");
/// let pipeline = Pipeline::new(fetcher, PipelineConfig::default())?;
///
/// let descriptor = FilingDescriptor::new(
///     "1341439",
///     "ORACLE CORP",
///     FormKind::Schedule13G,
///     chrono::NaiveDate::from_ymd_opt(2024, 2, 14).unwrap(),
///     "edgar/data/1341439/0001341439-24-000001.txt",
/// );
/// let report = pipeline.run(vec![descriptor]).await;
/// assert_eq!(report.summary.total_found(), 1);
/// # Ok(())
/// # }
/// ```
pub struct Pipeline<F> {
    fetcher: Arc<F>,
    governor: Arc<RateGovernor>,
    extractor: Arc<CandidateExtractor>,
    config: PipelineConfig,
}

impl<F: Fetcher + 'static> Pipeline<F> {
    /// Create a pipeline with its own governor built from `config`
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Config` for an invalid configuration.
    pub fn new(fetcher: F, config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate().map_err(PipelineError::Config)?;
        let governor = RateGovernor::new(config.rate_per_second)?.with_burst(config.burst)?;
        Self::with_governor(fetcher, config, Arc::new(governor))
    }

    /// Create a pipeline that shares an existing governor
    ///
    /// The rate and burst of `config` are ignored in favor of the governor's.
    pub fn with_governor(
        fetcher: F,
        config: PipelineConfig,
        governor: Arc<RateGovernor>,
    ) -> Result<Self, PipelineError> {
        config.validate().map_err(PipelineError::Config)?;
        let extractor = CandidateExtractor::new(config.extractor.clone())
            .map_err(|e| PipelineError::Config(e.to_string()))?;

        Ok(Self {
            fetcher: Arc::new(fetcher),
            governor,
            extractor: Arc::new(extractor),
            config,
        })
    }

    /// Governor paid by every fetch attempt
    pub fn governor(&self) -> &Arc<RateGovernor> {
        &self.governor
    }

    /// Active configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every descriptor to completion
    pub async fn run(&self, descriptors: Vec<FilingDescriptor>) -> RunReport {
        self.run_until(descriptors, &CancelSignal::new()).await
    }

    /// Run until done or until `cancel` is raised
    pub async fn run_until(
        &self,
        descriptors: Vec<FilingDescriptor>,
        cancel: &CancelSignal,
    ) -> RunReport {
        self.run_with_observer(descriptors, cancel, |_| {}).await
    }

    /// Run, calling `observer` once for each terminal outcome
    ///
    /// The report always holds exactly one outcome per descriptor. Items never
    /// dispatched because of cancellation are recorded as `Cancelled`.
    pub async fn run_with_observer<O>(
        &self,
        descriptors: Vec<FilingDescriptor>,
        cancel: &CancelSignal,
        mut observer: O,
    ) -> RunReport
    where
        O: FnMut(&ItemOutcome),
    {
        let run_id = Uuid::now_v7();
        let started = Instant::now();
        let total = descriptors.len();

        info!(
            "Run {} started: {} filings, {} fetch workers, {} parse workers, {:.1} req/s",
            run_id,
            total,
            self.config.fetch_workers,
            self.config.parse_workers,
            self.governor.rate()
        );

        let items: Arc<[FilingDescriptor]> = descriptors.into();
        let cursor = Arc::new(AtomicUsize::new(0));
        let (doc_tx, doc_rx) = mpsc::channel::<Handoff>(self.config.buffer_capacity);
        let doc_rx = Arc::new(Mutex::new(doc_rx));
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Recorded>();

        let mut workers = JoinSet::new();
        for worker in 0..self.config.fetch_workers {
            workers.spawn(fetch_worker(
                worker,
                Arc::clone(&self.fetcher),
                Arc::clone(&self.governor),
                Arc::clone(&items),
                Arc::clone(&cursor),
                doc_tx.clone(),
                out_tx.clone(),
                cancel.clone(),
            ));
        }
        for worker in 0..self.config.parse_workers {
            workers.spawn(parse_worker(
                worker,
                Arc::clone(&self.extractor),
                Arc::clone(&doc_rx),
                out_tx.clone(),
                cancel.clone(),
            ));
        }
        drop(doc_tx);
        drop(out_tx);

        let mut seen = vec![false; total];
        let mut outcomes = Vec::with_capacity(total);
        let mut summary = RunSummary::new();

        while let Some((index, outcome)) = out_rx.recv().await {
            if std::mem::replace(&mut seen[index], true) {
                warn!("Duplicate outcome for {} ignored", outcome.item_key());
                continue;
            }
            summary.record(&outcome);
            observer(&outcome);
            outcomes.push(outcome);
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!("Pipeline worker failed: {}", e);
            }
        }

        // Left over: never dispatched, or lost with a failed worker
        for (index, _) in seen.iter().enumerate().filter(|(_, done)| !**done) {
            let descriptor = items[index].clone();
            let outcome = if cancel.is_cancelled() {
                ItemOutcome::cancelled(descriptor)
            } else {
                warn!("No outcome for {}; recording a failure", descriptor.item_key);
                ItemOutcome::fetch_failed(
                    descriptor,
                    FetchFailure::permanent("worker terminated before the item completed", 0, None),
                )
            };
            summary.record(&outcome);
            observer(&outcome);
            outcomes.push(outcome);
        }

        summary.elapsed = started.elapsed();
        info!(
            "Run {} finished in {:.1}s: {} parsed ({} found), {} failed, {} cancelled",
            run_id,
            summary.elapsed.as_secs_f64(),
            summary.total_parsed(),
            summary.total_found(),
            summary.total_failed(),
            summary.cancelled
        );

        RunReport {
            run_id,
            outcomes,
            summary,
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn fetch_worker<F: Fetcher>(
    worker: usize,
    fetcher: Arc<F>,
    governor: Arc<RateGovernor>,
    items: Arc<[FilingDescriptor]>,
    cursor: Arc<AtomicUsize>,
    documents: mpsc::Sender<Handoff>,
    outcomes: mpsc::UnboundedSender<Recorded>,
    cancel: CancelSignal,
) {
    debug!("Fetch worker {} started", worker);

    while !cancel.is_cancelled() {
        let index = cursor.fetch_add(1, Ordering::SeqCst);
        let Some(descriptor) = items.get(index) else {
            break;
        };

        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            outcome = fetcher.fetch(descriptor, &governor) => Some(outcome),
        };

        let outcome = match fetched {
            None => ItemOutcome::cancelled(descriptor.clone()),
            Some(FetchOutcome {
                descriptor,
                result: Err(failure),
            }) => {
                if failure.kind == FetchErrorKind::Cancelled {
                    ItemOutcome::cancelled(descriptor)
                } else {
                    debug!("Fetch failed for {}: {}", descriptor.item_key, failure);
                    ItemOutcome::fetch_failed(descriptor, failure)
                }
            }
            Some(fetched) => {
                debug!("Fetched {}", descriptor.item_key);
                let sent = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(ItemOutcome::cancelled(descriptor.clone())),
                    sent = documents.send((index, fetched)) => sent.map_err(|mpsc::error::SendError((_, doc))| {
                        ItemOutcome::parse_failed(doc.descriptor, "no parse worker available")
                    }),
                };
                match sent {
                    Ok(()) => continue,
                    Err(outcome) => outcome,
                }
            }
        };

        if outcomes.send((index, outcome)).is_err() {
            break;
        }
    }

    debug!("Fetch worker {} stopped", worker);
}

async fn parse_worker(
    worker: usize,
    extractor: Arc<CandidateExtractor>,
    documents: Arc<Mutex<mpsc::Receiver<Handoff>>>,
    outcomes: mpsc::UnboundedSender<Recorded>,
    cancel: CancelSignal,
) {
    debug!("Parse worker {} started", worker);

    loop {
        let next = documents.lock().await.recv().await;
        let Some((index, FetchOutcome { descriptor, result })) = next else {
            break;
        };

        let outcome = match result {
            Err(failure) => ItemOutcome::fetch_failed(descriptor, failure),
            Ok(_) if cancel.is_cancelled() => ItemOutcome::cancelled(descriptor),
            Ok(body) => {
                let parser = Arc::clone(&extractor);
                match tokio::task::spawn_blocking(move || parser.extract(&body)).await {
                    Ok(Ok(extraction)) => {
                        debug!(
                            "Parsed {}: {:?} ({})",
                            descriptor.item_key, extraction.candidate, extraction.method
                        );
                        ItemOutcome::parsed(descriptor, extraction)
                    }
                    Ok(Err(e)) => {
                        warn!("Parse failed for {}: {}", descriptor.item_key, e);
                        ItemOutcome::parse_failed(descriptor, e.to_string())
                    }
                    Err(e) => {
                        error!("Parse task for {} failed: {}", descriptor.item_key, e);
                        ItemOutcome::parse_failed(descriptor, format!("parse task failed: {}", e))
                    }
                }
            }
        };

        if outcomes.send((index, outcome)).is_err() {
            break;
        }
    }

    debug!("Parse worker {} stopped", worker);
}
