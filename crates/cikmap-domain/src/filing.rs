//! Filing module - descriptors for filings discovered in an archive index

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

// NNNNNNNNNN-NN-NNNNNN, e.g. 0001234567-12-000001
static ACCESSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{10}-\d{2}-\d{6}").unwrap());

/// Extract the accession number embedded in a filing locator, if any.
///
/// # Examples
///
/// ```
/// use cikmap_domain::accession_from_locator;
///
/// let url = "https://www.sec.gov/Archives/edgar/data/1234567/0001234567-12-000001.txt";
/// assert_eq!(accession_from_locator(url), Some("0001234567-12-000001"));
/// assert_eq!(accession_from_locator("edgar/data/1/readme.txt"), None);
/// ```
pub fn accession_from_locator(locator: &str) -> Option<&str> {
    ACCESSION_RE.find(locator).map(|m| m.as_str())
}

/// Form type of a filing
///
/// Ownership-disclosure schedules are the forms of interest. Anything else
/// is carried through verbatim as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum FormKind {
    /// Schedule 13D (beneficial ownership, active investors)
    Schedule13D,

    /// Amendment to a Schedule 13D
    Schedule13DA,

    /// Schedule 13G (beneficial ownership, passive investors)
    Schedule13G,

    /// Amendment to a Schedule 13G
    Schedule13GA,

    /// Any other form label, kept as written in the index
    Other(String),
}

impl FormKind {
    /// Parse an index form label such as `SC 13D/A` or `SCHEDULE 13G`
    ///
    /// # Examples
    ///
    /// ```
    /// use cikmap_domain::FormKind;
    ///
    /// assert_eq!(FormKind::parse("SC 13D"), FormKind::Schedule13D);
    /// assert_eq!(FormKind::parse("sc 13g/a"), FormKind::Schedule13GA);
    /// assert_eq!(FormKind::parse("SCHEDULE 13D/A"), FormKind::Schedule13DA);
    /// assert_eq!(FormKind::parse("10-K"), FormKind::Other("10-K".to_string()));
    /// ```
    pub fn parse(label: &str) -> Self {
        let normalized = label
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_uppercase();
        let stripped = normalized
            .strip_prefix("SCHEDULE ")
            .or_else(|| normalized.strip_prefix("SC "))
            .unwrap_or(&normalized);

        match stripped {
            "13D" => FormKind::Schedule13D,
            "13D/A" => FormKind::Schedule13DA,
            "13G" => FormKind::Schedule13G,
            "13G/A" => FormKind::Schedule13GA,
            _ => FormKind::Other(label.trim().to_string()),
        }
    }

    /// Base form without the amendment suffix (`13D`, `13G`, or the raw label)
    pub fn base(&self) -> &str {
        match self {
            FormKind::Schedule13D | FormKind::Schedule13DA => "13D",
            FormKind::Schedule13G | FormKind::Schedule13GA => "13G",
            FormKind::Other(label) => label,
        }
    }

    /// Whether this form amends an earlier filing
    pub fn is_amendment(&self) -> bool {
        match self {
            FormKind::Schedule13DA | FormKind::Schedule13GA => true,
            FormKind::Other(label) => label.trim().to_uppercase().ends_with("/A"),
            _ => false,
        }
    }

    /// Index label for this form
    pub fn label(&self) -> &str {
        match self {
            FormKind::Schedule13D => "SC 13D",
            FormKind::Schedule13DA => "SC 13D/A",
            FormKind::Schedule13G => "SC 13G",
            FormKind::Schedule13GA => "SC 13G/A",
            FormKind::Other(label) => label,
        }
    }
}

impl fmt::Display for FormKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<String> for FormKind {
    fn from(label: String) -> Self {
        FormKind::parse(&label)
    }
}

impl From<FormKind> for String {
    fn from(kind: FormKind) -> Self {
        kind.label().to_string()
    }
}

/// Immutable description of one filing to fetch and parse
///
/// Created by the index reader, consumed (never mutated) by the pipeline.
/// `item_key` is the stable identity used for dedup and resume; it is
/// unique within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilingDescriptor {
    /// Opaque identifier of the filer (the CIK)
    pub issuer_key: String,

    /// Filer name as listed in the index
    pub company_name: String,

    /// Form type
    pub form_kind: FormKind,

    /// Date the filing was accepted
    pub filed_on: NaiveDate,

    /// Locator of the filing text (URL)
    pub fetch_target: String,

    /// Stable identity within a run (the accession number when available)
    pub item_key: String,
}

impl FilingDescriptor {
    /// Create a descriptor, deriving `item_key` from the locator
    ///
    /// The accession number embedded in the locator is used when present,
    /// otherwise the locator itself.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use cikmap_domain::{FilingDescriptor, FormKind};
    ///
    /// let descriptor = FilingDescriptor::new(
    ///     "1234567",
    ///     "ACME CORP",
    ///     FormKind::Schedule13G,
    ///     NaiveDate::from_ymd_opt(2024, 2, 14).unwrap(),
    ///     "https://www.sec.gov/Archives/edgar/data/1234567/0001234567-24-000001.txt",
    /// );
    /// assert_eq!(descriptor.item_key, "0001234567-24-000001");
    /// ```
    pub fn new(
        issuer_key: impl Into<String>,
        company_name: impl Into<String>,
        form_kind: FormKind,
        filed_on: NaiveDate,
        fetch_target: impl Into<String>,
    ) -> Self {
        let fetch_target = fetch_target.into();
        let item_key = accession_from_locator(&fetch_target)
            .unwrap_or(&fetch_target)
            .to_string();

        Self {
            issuer_key: issuer_key.into(),
            company_name: company_name.into(),
            form_kind,
            filed_on,
            fetch_target,
            item_key,
        }
    }

    /// Replace the derived item key
    pub fn with_item_key(mut self, item_key: impl Into<String>) -> Self {
        self.item_key = item_key.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 11, 3).unwrap()
    }

    #[test]
    fn test_form_kind_parsing() {
        assert_eq!(FormKind::parse("SC 13D"), FormKind::Schedule13D);
        assert_eq!(FormKind::parse("SC 13D/A"), FormKind::Schedule13DA);
        assert_eq!(FormKind::parse("  SC   13G "), FormKind::Schedule13G);
        assert_eq!(FormKind::parse("SCHEDULE 13G/A"), FormKind::Schedule13GA);
        assert_eq!(FormKind::parse("13D"), FormKind::Schedule13D);
        assert_eq!(
            FormKind::parse("SC TO-T"),
            FormKind::Other("SC TO-T".to_string())
        );
    }

    #[test]
    fn test_form_kind_base_and_amendment() {
        assert_eq!(FormKind::Schedule13DA.base(), "13D");
        assert_eq!(FormKind::Schedule13G.base(), "13G");
        assert!(FormKind::Schedule13GA.is_amendment());
        assert!(!FormKind::Schedule13D.is_amendment());
        assert!(FormKind::Other("10-K/A".to_string()).is_amendment());
    }

    #[test]
    fn test_form_kind_serializes_as_label() {
        let json = serde_json::to_string(&FormKind::Schedule13DA).unwrap();
        assert_eq!(json, "\"SC 13D/A\"");

        let parsed: FormKind = serde_json::from_str("\"SCHEDULE 13G\"").unwrap();
        assert_eq!(parsed, FormKind::Schedule13G);
    }

    #[test]
    fn test_descriptor_derives_item_key_from_accession() {
        let descriptor = FilingDescriptor::new(
            "320193",
            "APPLE INC",
            FormKind::Schedule13G,
            date(),
            "https://www.sec.gov/Archives/edgar/data/320193/0000320193-23-000106.txt",
        );
        assert_eq!(descriptor.item_key, "0000320193-23-000106");
    }

    #[test]
    fn test_descriptor_falls_back_to_locator() {
        let descriptor = FilingDescriptor::new(
            "1",
            "X",
            FormKind::Schedule13D,
            date(),
            "file:///tmp/filing.txt",
        );
        assert_eq!(descriptor.item_key, "file:///tmp/filing.txt");

        let renamed = descriptor.with_item_key("custom");
        assert_eq!(renamed.item_key, "custom");
    }

    #[test]
    fn test_accession_from_locator() {
        assert_eq!(
            accession_from_locator("edgar/data/1/0000950123-24-000042.txt"),
            Some("0000950123-24-000042")
        );
        assert_eq!(accession_from_locator("0000950123-24-00004"), None);
    }
}
