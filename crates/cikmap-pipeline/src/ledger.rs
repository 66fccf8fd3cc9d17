//! Resume/dedup ledger
//!
//! A read-only snapshot of the item keys a previous run already produced,
//! plus the merge that folds a new run's records into the old batch.

use cikmap_domain::{BatchRecord, FilingDescriptor};
use indexmap::IndexMap;
use std::collections::HashSet;
use tracing::info;

/// Item keys already present in an earlier batch
#[derive(Debug, Clone, Default)]
pub struct ResumeLedger {
    keys: HashSet<String>,
}

impl ResumeLedger {
    /// An empty ledger (nothing is skipped)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Snapshot the keys of an existing batch
    ///
    /// Records whose fetch ran out of retries are left out so the next run
    /// tries them again; their old row is replaced when the new one merges.
    pub fn load<'a>(existing: impl IntoIterator<Item = &'a BatchRecord>) -> Self {
        Self::from_keys(
            existing
                .into_iter()
                .filter(|r| !r.status.is_retryable())
                .map(|r| r.item_key.clone()),
        )
    }

    /// Build a ledger from raw keys
    pub fn from_keys(keys: impl IntoIterator<Item = String>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
        }
    }

    /// Whether `item_key` is known
    pub fn contains(&self, item_key: &str) -> bool {
        self.keys.contains(item_key)
    }

    /// Number of known keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the ledger is empty
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Residual work: descriptors whose key is not in the ledger
    ///
    /// With `force_refetch` every descriptor is kept.
    pub fn filter(
        &self,
        descriptors: Vec<FilingDescriptor>,
        force_refetch: bool,
    ) -> Vec<FilingDescriptor> {
        if force_refetch {
            return descriptors;
        }
        let before = descriptors.len();
        let residual: Vec<_> = descriptors
            .into_iter()
            .filter(|d| !self.contains(&d.item_key))
            .collect();
        info!(
            "Resume ledger skipped {} of {} filings",
            before - residual.len(),
            before
        );
        residual
    }
}

/// Fold new records into an existing batch
///
/// A key present in both takes the new record; keys only in `existing` keep
/// their old record. Order is first appearance.
pub fn merge(existing: Vec<BatchRecord>, new: Vec<BatchRecord>) -> Vec<BatchRecord> {
    let mut by_key: IndexMap<String, BatchRecord> = IndexMap::with_capacity(existing.len());
    for record in existing.into_iter().chain(new) {
        by_key.insert(record.item_key.clone(), record);
    }
    by_key.into_values().collect()
}

/// Collapse duplicate keys, keeping the most recent record
pub fn dedup(records: Vec<BatchRecord>) -> Vec<BatchRecord> {
    merge(Vec::new(), records)
}
