//! CIK to CUSIP mapping
//!
//! Folds a batch of per-filing records into the two products downstream users
//! consume: the deduplicated `(cik, cusip6, cusip8)` mapping and per-pair
//! dynamics (when a filer first and last named an identifier, how often, on
//! which forms, and how reliably it was parsed).

use chrono::{Datelike, NaiveDate};
use cikmap_domain::{BatchRecord, ExtractionMethod, RecordStatus};
use cikmap_extractor::{check_digit_status, CheckDigitStatus};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Filters applied when building the mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingOptions {
    /// Accepted lengths of the full identifier as extracted
    pub valid_lengths: Vec<usize>,

    /// Issuer prefixes (`cusip6`) that never describe a real issuer
    pub forbidden_prefixes: Vec<String>,
}

impl Default for MappingOptions {
    fn default() -> Self {
        Self {
            valid_lengths: vec![6, 8, 9],
            forbidden_prefixes: vec!["000000".to_string(), "0001PT".to_string()],
        }
    }
}

/// One row of the CIK to CUSIP mapping
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MappingRow {
    /// Filer CIK without leading zeros
    pub cik: u64,

    /// Issuer prefix
    pub cusip6: String,

    /// Issuer prefix plus issue number
    pub cusip8: String,
}

/// Aggregate history of one `(cik, cusip8)` pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CusipDynamics {
    /// Filer CIK without leading zeros
    pub cik: u64,

    /// Issuer prefix
    pub cusip6: String,

    /// Issuer prefix plus issue number
    pub cusip8: String,

    /// First full 9-character identifier seen for the pair, if any
    pub cusip9: Option<String>,

    /// Earliest filing date
    pub first_seen: NaiveDate,

    /// Latest filing date
    pub last_seen: NaiveDate,

    /// Filings naming the pair
    pub filings_count: usize,

    /// Distinct form labels, sorted
    pub forms: Vec<String>,

    /// Distinct calendar months with at least one filing
    pub months_active: usize,

    /// Accession number of the latest filing
    pub most_recent_accession: String,

    /// Form of the latest filing
    pub most_recent_form: String,

    /// Date of the latest filing
    pub most_recent_filing_date: NaiveDate,

    /// Whether `cusip9` carries a correct check digit
    pub valid_check_digit: bool,

    /// Distinct extraction methods, sorted
    pub parse_methods: Vec<String>,

    /// Filings where the identifier was not found next to a label
    pub fallback_filings: usize,
}

/// Identifier parts of one usable record
struct Parts<'a> {
    cik: u64,
    full: &'a str,
    cusip6: &'a str,
    cusip8: &'a str,
}

fn parts(record: &BatchRecord) -> Option<Parts<'_>> {
    if record.status != RecordStatus::Ok {
        return None;
    }
    let full = record.candidate.as_deref()?;
    let cik = record.issuer_key.trim().parse::<u64>().ok()?;
    if full.len() < 8 || !full.is_ascii() {
        return None;
    }
    Some(Parts {
        cik,
        full,
        cusip6: &full[..6],
        cusip8: &full[..8],
    })
}

/// Build the deduplicated mapping, sorted by CIK then `cusip8`
///
/// Only parsed records with an identifier and a numeric CIK contribute.
/// Identifiers whose length is not whitelisted or whose prefix is
/// forbidden are dropped.
///
/// # Examples
///
/// ```
/// use cikmap_pipeline::{build_mapping, MappingOptions};
///
/// let rows = build_mapping(&[], &MappingOptions::default());
/// assert!(rows.is_empty());
/// ```
pub fn build_mapping(records: &[BatchRecord], options: &MappingOptions) -> Vec<MappingRow> {
    let forbidden: BTreeSet<String> = options
        .forbidden_prefixes
        .iter()
        .map(|p| p.to_uppercase())
        .collect();

    records
        .iter()
        .filter_map(parts)
        .filter(|p| options.valid_lengths.contains(&p.full.len()))
        .filter(|p| !forbidden.contains(&p.cusip6.to_uppercase()))
        .map(|p| MappingRow {
            cik: p.cik,
            cusip6: p.cusip6.to_uppercase(),
            cusip8: p.cusip8.to_uppercase(),
        })
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Aggregate per-pair dynamics, sorted by CIK then `cusip8`
pub fn build_dynamics(records: &[BatchRecord]) -> Vec<CusipDynamics> {
    let mut groups: BTreeMap<(u64, String), Vec<(&BatchRecord, Parts<'_>)>> = BTreeMap::new();
    for record in records {
        if let Some(p) = parts(record) {
            groups
                .entry((p.cik, p.cusip8.to_uppercase()))
                .or_default()
                .push((record, p));
        }
    }

    groups
        .into_iter()
        .filter_map(|((cik, cusip8), mut group)| {
            group.sort_by(|(a, _), (b, _)| {
                (a.filed_on, &a.item_key).cmp(&(b.filed_on, &b.item_key))
            });
            let (first, _) = group.first()?;
            let (latest, _) = group.last()?;

            let cusip9 = group
                .iter()
                .find(|(_, p)| p.full.len() == 9)
                .map(|(_, p)| p.full.to_uppercase());
            let valid_check_digit = cusip9
                .as_deref()
                .is_some_and(|c| check_digit_status(c) == CheckDigitStatus::Valid);

            let forms: BTreeSet<String> =
                group.iter().map(|(r, _)| r.form_kind.to_string()).collect();
            let months: BTreeSet<(i32, u32)> = group
                .iter()
                .map(|(r, _)| (r.filed_on.year(), r.filed_on.month()))
                .collect();
            let methods: BTreeSet<String> =
                group.iter().map(|(r, _)| r.method.to_string()).collect();
            let fallback_filings = group
                .iter()
                .filter(|(r, _)| r.method != ExtractionMethod::Window)
                .count();

            Some(CusipDynamics {
                cik,
                cusip6: group[0].1.cusip6.to_uppercase(),
                cusip8,
                cusip9,
                first_seen: first.filed_on,
                last_seen: latest.filed_on,
                filings_count: group.len(),
                forms: forms.into_iter().collect(),
                months_active: months.len(),
                most_recent_accession: latest.item_key.clone(),
                most_recent_form: latest.form_kind.to_string(),
                most_recent_filing_date: latest.filed_on,
                valid_check_digit,
                parse_methods: methods.into_iter().collect(),
                fallback_filings,
            })
        })
        .collect()
}
