//! Concurrency harness for the fetch/parse pipeline
//!
//! Uses scripted fetchers with real (short) latencies on a multi-threaded
//! runtime, so the worker pools actually interleave.

use async_trait::async_trait;
use chrono::NaiveDate;
use cikmap_domain::{
    ExtractionMethod, FetchErrorKind, FetchFailure, FetchOutcome, FilingDescriptor, FormKind,
    ItemOutcome, OutcomeStatus, RecordStatus,
};
use cikmap_extractor::ExtractorConfig;
use cikmap_fetch::{Fetcher, MockFetcher, RateGovernor};
use cikmap_pipeline::{
    merge, CancelSignal, Pipeline, PipelineConfig, PipelineError, ResumeLedger,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

const FILING: &str = "<SEC-HEADER>IRS NUMBER 123456789</SEC-HEADER>\n\
    <DOCUMENT>SCHEDULE 13G\nORACLE CORP\n(Title of Class of Securities)\n\
    68389X105\n(CUSIP Number)\n</DOCUMENT>";

fn descriptor(n: usize) -> FilingDescriptor {
    FilingDescriptor::new(
        n.to_string(),
        format!("ISSUER {}", n),
        if n % 2 == 0 {
            FormKind::Schedule13G
        } else {
            FormKind::Schedule13DA
        },
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(n as u64),
        format!(
            "https://example.test/Archives/edgar/data/{}/{:010}-24-{:06}.txt",
            n, n, n
        ),
    )
}

fn descriptors(count: usize) -> Vec<FilingDescriptor> {
    (0..count).map(descriptor).collect()
}

fn config(fetch_workers: usize, parse_workers: usize, buffer_capacity: usize) -> PipelineConfig {
    PipelineConfig {
        rate_per_second: 1000.0,
        burst: 1.0,
        fetch_workers,
        parse_workers,
        buffer_capacity,
        ..PipelineConfig::default()
    }
}

fn assert_one_outcome_per_item(outcomes: &[ItemOutcome], input: &[FilingDescriptor]) {
    assert_eq!(outcomes.len(), input.len());
    let seen: HashSet<_> = outcomes.iter().map(|o| o.item_key().to_string()).collect();
    let expected: HashSet<_> = input.iter().map(|d| d.item_key.clone()).collect();
    assert_eq!(seen, expected);
}

/// Fetcher that panics on one item and delegates the rest
struct PanickingFetcher {
    inner: MockFetcher,
    poison: String,
}

#[async_trait]
impl Fetcher for PanickingFetcher {
    async fn fetch(&self, descriptor: &FilingDescriptor, governor: &RateGovernor) -> FetchOutcome {
        if descriptor.item_key == self.poison {
            panic!("fetch transport blew up");
        }
        self.inner.fetch(descriptor, governor).await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_every_item_reaches_one_outcome_across_pool_sizes() {
    let input = descriptors(24);

    for fetch_workers in [1, 2, 5] {
        for parse_workers in [1, 3] {
            for buffer_capacity in [1, 4, 64] {
                let fetcher = MockFetcher::new(FILING).with_latency(Duration::from_millis(2));
                let pipeline = Pipeline::new(
                    fetcher.clone(),
                    config(fetch_workers, parse_workers, buffer_capacity),
                )
                .unwrap();

                let report = pipeline.run(input.clone()).await;

                assert_one_outcome_per_item(&report.outcomes, &input);
                assert_eq!(fetcher.call_count(), input.len());
                assert_eq!(report.summary.total, input.len());
                assert_eq!(
                    report.summary.window,
                    input.len(),
                    "pools {}x{} buffer {}",
                    fetch_workers,
                    parse_workers,
                    buffer_capacity
                );
            }
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_slow_and_fast_items_interleave() {
    let input = descriptors(12);
    let fetcher = MockFetcher::new(FILING).with_latency(Duration::from_millis(1));
    for d in input.iter().step_by(3) {
        fetcher.add_delay(d.item_key.clone(), Duration::from_millis(60));
    }

    let pipeline = Pipeline::new(fetcher, config(4, 2, 2)).unwrap();
    let report = pipeline.run(input.clone()).await;

    assert_one_outcome_per_item(&report.outcomes, &input);
    // A slow item never holds back the fast ones behind it
    let first_slow = report
        .outcomes
        .iter()
        .position(|o| o.item_key() == input[0].item_key)
        .unwrap();
    assert!(first_slow > 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_failures_are_isolated_per_item() {
    let input = descriptors(10);
    let fetcher = MockFetcher::new(FILING);
    fetcher.add_failure(
        input[3].item_key.clone(),
        FetchFailure::permanent("HTTP 404", 1, Some(404)),
    );
    fetcher.add_failure(
        input[7].item_key.clone(),
        FetchFailure::exhausted("HTTP 503", 5, Some(503)),
    );
    fetcher.add_response(input[5].item_key.clone(), "no identifier in this document");

    let pipeline = Pipeline::new(fetcher, config(3, 2, 4)).unwrap();
    let report = pipeline.run(input.clone()).await;

    assert_one_outcome_per_item(&report.outcomes, &input);
    assert_eq!(report.summary.window, 7);
    assert_eq!(report.summary.no_match, 1);
    assert_eq!(report.summary.fetch_permanent, 1);
    assert_eq!(report.summary.fetch_exhausted, 1);

    let failed = report
        .outcomes
        .iter()
        .find(|o| o.item_key() == input[7].item_key)
        .unwrap();
    match &failed.status {
        OutcomeStatus::FetchFailed(failure) => {
            assert_eq!(failure.kind, FetchErrorKind::Exhausted);
            assert_eq!(failure.attempts, 5);
        }
        other => panic!("expected fetch failure, got {:?}", other),
    }

    let records = report.records();
    assert_eq!(records.len(), 10);
    let failed_record = records
        .iter()
        .find(|r| r.item_key == input[3].item_key)
        .unwrap();
    assert_eq!(failed_record.status, RecordStatus::FetchFailed);
    assert_eq!(failed_record.method, ExtractionMethod::NoMatch);
    assert!(failed_record.candidate.is_none());
    let exhausted_record = records
        .iter()
        .find(|r| r.item_key == input[7].item_key)
        .unwrap();
    assert_eq!(exhausted_record.status, RecordStatus::FetchExhausted);
    assert_eq!(report.extraction_results().len(), 8);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_resume_skips_completed_items() {
    let input = descriptors(8);
    let fetcher = MockFetcher::new(FILING);
    let pipeline = Pipeline::new(fetcher.clone(), config(2, 2, 4)).unwrap();

    let first = pipeline.run(input.clone()).await;
    let batch = merge(Vec::new(), first.records());
    assert_eq!(batch.len(), 8);
    assert_eq!(fetcher.call_count(), 8);

    fetcher.reset_call_count();
    let ledger = ResumeLedger::load(&batch);
    let residual = ledger.filter(input.clone(), false);
    assert!(residual.is_empty());

    let second = pipeline.run(residual).await;
    assert!(second.outcomes.is_empty());
    assert_eq!(fetcher.call_count(), 0);

    let rebatched = merge(batch.clone(), second.records());
    assert_eq!(rebatched, batch);

    // Forced refetch processes everything again
    let forced = ledger.filter(input.clone(), true);
    let third = pipeline.run(forced).await;
    assert_eq!(third.outcomes.len(), 8);
    assert_eq!(fetcher.call_count(), 8);
    assert_eq!(merge(batch, third.records()).len(), 8);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cancellation_mid_run_terminates_every_item() {
    let input = descriptors(50);
    let fetcher = MockFetcher::new(FILING);
    let pipeline = Pipeline::new(
        fetcher.clone(),
        PipelineConfig {
            rate_per_second: 10.0,
            ..config(4, 2, 2)
        },
    )
    .unwrap();

    let cancel = CancelSignal::new();
    let trigger = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            cancel.cancel();
        })
    };

    let report = tokio::time::timeout(
        Duration::from_secs(3),
        pipeline.run_until(input.clone(), &cancel),
    )
    .await
    .expect("cancelled run should return promptly");
    trigger.await.unwrap();

    assert_one_outcome_per_item(&report.outcomes, &input);
    assert!(report.summary.total_parsed() >= 1);
    assert!(report.summary.cancelled > 0);
    assert!(fetcher.call_count() < input.len());

    // Cancelled items stay out of the batch so a re-run picks them up
    assert_eq!(report.records().len(), report.summary.total_parsed());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancelled_before_start_fetches_nothing() {
    let input = descriptors(5);
    let fetcher = MockFetcher::new(FILING);
    let pipeline = Pipeline::new(fetcher.clone(), config(2, 2, 2)).unwrap();

    let cancel = CancelSignal::new();
    cancel.cancel();
    let report = pipeline.run_until(input.clone(), &cancel).await;

    assert_one_outcome_per_item(&report.outcomes, &input);
    assert!(report.outcomes.iter().all(ItemOutcome::is_cancelled));
    assert_eq!(report.summary.cancelled, 5);
    assert_eq!(fetcher.call_count(), 0);
    assert!(report.records().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_request_rate_is_respected() {
    let input = descriptors(11);
    let pipeline = Pipeline::new(
        MockFetcher::new(FILING),
        PipelineConfig {
            rate_per_second: 10.0,
            ..config(4, 2, 4)
        },
    )
    .unwrap();

    let start = std::time::Instant::now();
    let report = pipeline.run(input).await;
    let elapsed = start.elapsed();

    assert_eq!(report.summary.window, 11);
    assert_eq!(pipeline.governor().total_granted(), 11);
    // One immediate permit, then one every 100ms
    assert!(elapsed >= Duration::from_millis(950), "took {:?}", elapsed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shared_governor_counts_every_attempt() {
    let governor = Arc::new(RateGovernor::new(1000.0).unwrap());
    let pipeline = Pipeline::with_governor(
        MockFetcher::new(FILING),
        config(2, 1, 2),
        Arc::clone(&governor),
    )
    .unwrap();

    pipeline.run(descriptors(6)).await;
    assert_eq!(governor.total_granted(), 6);
    assert!(Arc::ptr_eq(pipeline.governor(), &governor));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_observer_sees_each_outcome_once() {
    let input = descriptors(9);
    let pipeline = Pipeline::new(MockFetcher::new(FILING), config(3, 3, 3)).unwrap();

    let mut observed = Vec::new();
    let report = pipeline
        .run_with_observer(input.clone(), &CancelSignal::new(), |outcome| {
            observed.push(outcome.item_key().to_string())
        })
        .await;

    assert_eq!(observed.len(), 9);
    let unique: HashSet<_> = observed.iter().collect();
    assert_eq!(unique.len(), 9);
    assert_eq!(report.outcomes.len(), 9);
}

#[tokio::test]
async fn test_invalid_configuration_is_fatal() {
    let result = Pipeline::new(
        MockFetcher::default(),
        PipelineConfig {
            fetch_workers: 0,
            ..PipelineConfig::default()
        },
    );
    assert!(matches!(result, Err(PipelineError::Config(_))));

    let result = Pipeline::new(
        MockFetcher::default(),
        PipelineConfig {
            rate_per_second: 0.0,
            ..PipelineConfig::default()
        },
    );
    assert!(matches!(result, Err(PipelineError::Config(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_oversized_document_is_a_parse_failure() {
    let input = descriptors(3);
    let fetcher = MockFetcher::new(FILING);
    fetcher.add_response(input[1].item_key.clone(), "x".repeat(4096));

    let pipeline = Pipeline::new(
        fetcher,
        PipelineConfig {
            extractor: ExtractorConfig {
                max_document_bytes: 1024,
                ..ExtractorConfig::default()
            },
            ..config(2, 2, 2)
        },
    )
    .unwrap();
    let report = pipeline.run(input.clone()).await;

    assert_eq!(report.summary.parse_failed, 1);
    assert_eq!(report.summary.window, 2);
    let record = report
        .records()
        .into_iter()
        .find(|r| r.item_key == input[1].item_key)
        .unwrap();
    assert_eq!(record.status, RecordStatus::ParseFailed);
    assert!(record.error.unwrap().contains("too long"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_duplicate_descriptors_collapse_in_records() {
    let mut input = descriptors(3);
    input.push(descriptor(1));

    let pipeline = Pipeline::new(MockFetcher::new(FILING), config(2, 2, 2)).unwrap();
    let report = pipeline.run(input).await;

    assert_eq!(report.outcomes.len(), 4);
    assert_eq!(report.records().len(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_panicking_fetcher_still_yields_full_count() {
    let input = descriptors(8);
    let poison = input[2].item_key.clone();
    let fetcher = PanickingFetcher {
        inner: MockFetcher::new(FILING),
        poison: poison.clone(),
    };

    let pipeline = Pipeline::new(fetcher, config(3, 2, 2)).unwrap();
    let report = tokio::time::timeout(Duration::from_secs(5), pipeline.run(input.clone()))
        .await
        .expect("run should finish after a worker panic");

    assert_one_outcome_per_item(&report.outcomes, &input);
    let lost = report
        .outcomes
        .iter()
        .find(|o| o.item_key() == poison)
        .unwrap();
    assert!(matches!(lost.status, OutcomeStatus::FetchFailed(_)));
    assert_eq!(report.summary.window, 7);
}
