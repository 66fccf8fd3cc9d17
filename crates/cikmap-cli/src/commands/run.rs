//! Run command implementation.

use crate::batch_file;
use crate::cli::RunArgs;
use crate::config::Config;
use crate::error::Result;
use crate::index;
use crate::output::Formatter;
use cikmap_domain::{BatchRecord, ItemOutcome};
use cikmap_fetch::HttpFetcher;
use cikmap_pipeline::{merge, CancelSignal, Pipeline, ResumeLedger};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Execute the run command.
pub async fn execute_run(args: RunArgs, mut config: Config, formatter: &Formatter) -> Result<()> {
    apply_overrides(&args, &mut config);

    let descriptors = index::read_index_files(&args.index, &config.fetch)?;
    let descriptors = index::filter_forms(descriptors, &args.forms);
    let descriptors = match &args.cik_filter {
        Some(path) => index::filter_ciks(descriptors, &index::load_cik_filter(path)?),
        None => descriptors,
    };

    let existing = batch_file::load(&args.output)?;
    let ledger = ResumeLedger::load(&existing);
    let residual = ledger.filter(descriptors, config.pipeline.force_refetch);

    if residual.is_empty() {
        eprintln!("{}", formatter.info("Nothing to do: every filing is already recorded"));
        return Ok(());
    }
    eprintln!(
        "{}",
        formatter.info(&format!(
            "Processing {} filings ({} already recorded)",
            residual.len(),
            ledger.len()
        ))
    );

    let fetcher = HttpFetcher::new(config.fetch.clone())?;
    let pipeline = Pipeline::new(fetcher, config.pipeline.clone())?;

    let cancel = CancelSignal::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, cancelling run");
                cancel.cancel();
            }
        })
    };

    let mut checkpoint = Checkpoint::new(&args.output, existing, args.checkpoint_every);
    let report = pipeline
        .run_with_observer(residual, &cancel, |outcome| checkpoint.observe(outcome))
        .await;
    interrupt.abort();

    let written = checkpoint.finish()?;

    println!("{}", formatter.format_summary(&report.summary)?);
    if cancel.is_cancelled() {
        eprintln!(
            "{}",
            formatter.warning(&format!(
                "Run interrupted: {} filings left for the next run",
                report.summary.cancelled
            ))
        );
    }
    eprintln!(
        "{}",
        formatter.success(&format!(
            "Wrote {} records to {}",
            written,
            args.output.display()
        ))
    );

    Ok(())
}

fn apply_overrides(args: &RunArgs, config: &mut Config) {
    config.apply_identity(&args.identity);
    if let Some(rate) = args.rate {
        config.pipeline.rate_per_second = rate;
    }
    if let Some(workers) = args.fetch_workers {
        config.pipeline.fetch_workers = workers;
    }
    if let Some(workers) = args.parse_workers {
        config.pipeline.parse_workers = workers;
    }
    if args.force {
        config.pipeline.force_refetch = true;
    }
}

/// Collects new records, appending them to the batch file every `every`
/// records; `finish` rewrites the file with the merged batch
struct Checkpoint {
    path: PathBuf,
    every: usize,
    existing: Vec<BatchRecord>,
    records: Vec<BatchRecord>,
    flushed: usize,
}

impl Checkpoint {
    fn new(path: &Path, existing: Vec<BatchRecord>, every: usize) -> Self {
        Self {
            path: path.to_path_buf(),
            every,
            existing,
            records: Vec::new(),
            flushed: 0,
        }
    }

    fn observe(&mut self, outcome: &ItemOutcome) {
        if let Some(record) = BatchRecord::from_outcome(outcome) {
            self.records.push(record);
        }
        if self.every > 0 && self.records.len() - self.flushed >= self.every {
            let pending = &self.records[self.flushed..];
            match batch_file::append(&self.path, pending) {
                Ok(()) => {
                    self.flushed = self.records.len();
                    info!("Checkpoint: {} new records", self.flushed);
                }
                Err(e) => warn!("Checkpoint to {} failed: {}", self.path.display(), e),
            }
        }
    }

    /// Write the final batch; returns the number of records written
    fn finish(self) -> Result<usize> {
        let batch = merge(self.existing, self.records);
        batch_file::save(&self.path, &batch)?;
        Ok(batch.len())
    }
}
