//! EDGAR master index reading and filtering.
//!
//! `master.idx` files carry a free-text preamble, a column header and a
//! dashed separator, followed by one `|`-delimited row per filing:
//!
//! ```text
//! CIK|Company Name|Form Type|Date Filed|Filename
//! --------------------------------------------------------------------------------
//! 1000045|NICHOLAS FINANCIAL INC|SC 13G/A|2024-02-13|edgar/data/1000045/0000950170-24-015412.txt
//! ```

use crate::error::{CliError, Result};
use chrono::NaiveDate;
use cikmap_domain::{FilingDescriptor, FormKind};
use cikmap_fetch::FetchConfig;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

const SEPARATOR_PREFIX: &str = "----";
const COLUMNS: usize = 5;

/// Parse one master index into descriptors.
///
/// Rows with the wrong number of columns, unparseable dates or forms other
/// than 13D/13G (and their amendments) are skipped.
pub fn parse_master_index(text: &str, fetch: &FetchConfig) -> Vec<FilingDescriptor> {
    let rows = match text.find(&format!("\n{}", SEPARATOR_PREFIX)) {
        Some(pos) => text[pos + 1..].split_once('\n').map_or("", |(_, rest)| rest),
        None if text.starts_with(SEPARATOR_PREFIX) => {
            text.split_once('\n').map_or("", |(_, rest)| rest)
        }
        None => text,
    };

    let mut descriptors = Vec::new();
    let mut skipped = 0usize;

    for line in rows.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match parse_row(line, fetch) {
            Some(descriptor) => descriptors.push(descriptor),
            None => skipped += 1,
        }
    }

    debug!(
        "Index rows: {} kept, {} skipped",
        descriptors.len(),
        skipped
    );
    descriptors
}

fn parse_row(line: &str, fetch: &FetchConfig) -> Option<FilingDescriptor> {
    let fields: Vec<&str> = line.split('|').map(str::trim).collect();
    if fields.len() != COLUMNS {
        return None;
    }

    let form_kind = FormKind::parse(fields[2]);
    if matches!(form_kind, FormKind::Other(_)) {
        return None;
    }
    let filed_on = NaiveDate::parse_from_str(fields[3], "%Y-%m-%d").ok()?;
    if fields[0].is_empty() || fields[4].is_empty() {
        return None;
    }

    Some(FilingDescriptor::new(
        fields[0],
        fields[1],
        form_kind,
        filed_on,
        fetch.archive_url(fields[4]),
    ))
}

/// Decode index bytes: UTF-8 when valid, otherwise Latin-1.
fn decode(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => e.into_bytes().iter().map(|&b| b as char).collect(),
    }
}

/// Read index files from disk.
pub fn read_index_files(
    paths: &[impl AsRef<Path>],
    fetch: &FetchConfig,
) -> Result<Vec<FilingDescriptor>> {
    let mut descriptors = Vec::new();
    for path in paths {
        let path = path.as_ref();
        let bytes = fs::read(path)
            .map_err(|e| CliError::Index(format!("Cannot read {}: {}", path.display(), e)))?;
        let text = decode(bytes);
        let parsed = parse_master_index(&text, fetch);
        info!("Read {} filings from {}", parsed.len(), path.display());
        descriptors.extend(parsed);
    }
    Ok(descriptors)
}

/// Keep descriptors whose form matches one of `forms`.
///
/// A bare family (`13D`) matches the form and its amendment; a full label
/// (`SC 13D/A`) matches exactly.
pub fn filter_forms(
    descriptors: Vec<FilingDescriptor>,
    forms: &[String],
) -> Vec<FilingDescriptor> {
    let wanted: Vec<FormKind> = forms.iter().map(|f| FormKind::parse(f)).collect();
    let families: HashSet<String> = forms
        .iter()
        .map(|f| f.trim().to_uppercase())
        .collect();

    descriptors
        .into_iter()
        .filter(|d| families.contains(d.form_kind.base()) || wanted.contains(&d.form_kind))
        .collect()
}

/// Strip leading zeros so `0000320193` and `320193` compare equal.
pub fn normalize_cik(cik: &str) -> String {
    let trimmed = cik.trim().trim_start_matches('0');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Load a CIK filter file (one CIK per line, blank lines ignored).
pub fn load_cik_filter(path: &Path) -> Result<HashSet<String>> {
    let contents = fs::read_to_string(path)?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(normalize_cik)
        .collect())
}

/// Keep descriptors whose issuer is in `ciks`.
pub fn filter_ciks(
    descriptors: Vec<FilingDescriptor>,
    ciks: &HashSet<String>,
) -> Vec<FilingDescriptor> {
    descriptors
        .into_iter()
        .filter(|d| ciks.contains(&normalize_cik(&d.issuer_key)))
        .collect()
}

/// File name used for a downloaded quarter.
pub fn index_file_name(year: u16, quarter: u8) -> String {
    format!("{}-QTR{}-master.idx", year, quarter)
}

/// Every (year, quarter) from start to end, inclusive.
pub fn quarters(start: (u16, u8), end: (u16, u8)) -> Vec<(u16, u8)> {
    let mut out = Vec::new();
    let (mut year, mut quarter) = start;
    while (year, quarter) <= end {
        out.push((year, quarter));
        if quarter == 4 {
            year += 1;
            quarter = 1;
        } else {
            quarter += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Description:           Master Index of EDGAR Dissemination Feed\n\
Last Data Received:    March 31, 2024\n\
Comments:              webmaster@sec.gov\n\
\n\
CIK|Company Name|Form Type|Date Filed|Filename\n\
--------------------------------------------------------------------------------\n\
1000045|NICHOLAS FINANCIAL INC|SC 13G/A|2024-02-13|edgar/data/1000045/0000950170-24-015412.txt\n\
1000097|KINGDON CAPITAL MANAGEMENT, L.L.C.|13F-HR|2024-02-14|edgar/data/1000097/0001000097-24-000002.txt\n\
1000177|NORDIC AMERICAN TANKERS Ltd|SC 13D|2024-01-05|edgar/data/1000177/0001000177-24-000001.txt\n\
1000209|BROKEN ROW|SC 13D|not-a-date|edgar/data/1000209/0001000209-24-000001.txt\n\
1000228|TOO|FEW|COLUMNS\n\
0000320193|APPLE INC|SC 13D/A|2024-03-01|edgar/data/320193/0000320193-24-000010.txt\n";

    fn fetch() -> FetchConfig {
        FetchConfig::default()
    }

    #[test]
    fn test_parse_master_index() {
        let descriptors = parse_master_index(SAMPLE, &fetch());
        assert_eq!(descriptors.len(), 3);

        let first = &descriptors[0];
        assert_eq!(first.issuer_key, "1000045");
        assert_eq!(first.company_name, "NICHOLAS FINANCIAL INC");
        assert_eq!(first.form_kind, FormKind::Schedule13GA);
        assert_eq!(first.filed_on, NaiveDate::from_ymd_opt(2024, 2, 13).unwrap());
        assert_eq!(
            first.fetch_target,
            "https://www.sec.gov/Archives/edgar/data/1000045/0000950170-24-015412.txt"
        );
        assert_eq!(first.item_key, "0000950170-24-015412");
    }

    #[test]
    fn test_header_line_is_not_a_row() {
        let descriptors = parse_master_index(SAMPLE, &fetch());
        assert!(descriptors.iter().all(|d| d.issuer_key != "CIK"));
    }

    #[test]
    fn test_rows_without_preamble() {
        let text = "1|ONE|SC 13G|2024-01-02|edgar/data/1/0000000001-24-000001.txt\n";
        assert_eq!(parse_master_index(text, &fetch()).len(), 1);
    }

    #[test]
    fn test_filter_forms() {
        let descriptors = parse_master_index(SAMPLE, &fetch());

        let only_13d = filter_forms(descriptors.clone(), &["13D".to_string()]);
        assert_eq!(only_13d.len(), 2);

        let exact = filter_forms(descriptors.clone(), &["SC 13G/A".to_string()]);
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0].form_kind, FormKind::Schedule13GA);

        let none = filter_forms(descriptors, &["10-K".to_string()]);
        assert!(none.is_empty());
    }

    #[test]
    fn test_cik_filter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ciks.txt");
        fs::write(&path, "320193\n\n  0001000177 \n").unwrap();

        let ciks = load_cik_filter(&path).unwrap();
        assert_eq!(ciks.len(), 2);

        let kept = filter_ciks(parse_master_index(SAMPLE, &fetch()), &ciks);
        let issuers: Vec<_> = kept.iter().map(|d| d.issuer_key.as_str()).collect();
        assert_eq!(issuers, vec!["1000177", "0000320193"]);
    }

    #[test]
    fn test_normalize_cik() {
        assert_eq!(normalize_cik("0000320193"), "320193");
        assert_eq!(normalize_cik(" 42 "), "42");
        assert_eq!(normalize_cik("0000"), "0");
    }

    #[test]
    fn test_read_latin1_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("master.idx");
        let mut bytes = b"CIK|Company Name|Form Type|Date Filed|Filename\n----\n".to_vec();
        bytes.extend_from_slice(b"7|CAF\xC9 CORP|SC 13D|2024-01-02|edgar/data/7/0000000007-24-000001.txt\n");
        fs::write(&path, bytes).unwrap();

        let descriptors = read_index_files(&[&path], &fetch()).unwrap();
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].company_name, "CAFÉ CORP");
    }

    #[test]
    fn test_utf8_index_kept_as_is() {
        assert_eq!(decode("CAFÉ".as_bytes().to_vec()), "CAFÉ");
        assert_eq!(decode(b"CAF\xC9".to_vec()), "CAFÉ");
    }

    #[test]
    fn test_missing_index_file() {
        let result = read_index_files(&["/nonexistent/master.idx"], &fetch());
        assert!(matches!(result, Err(CliError::Index(_))));
    }

    #[test]
    fn test_quarters() {
        assert_eq!(
            quarters((2023, 3), (2024, 2)),
            vec![(2023, 3), (2023, 4), (2024, 1), (2024, 2)]
        );
        assert!(quarters((2024, 2), (2024, 1)).is_empty());
        assert_eq!(index_file_name(2024, 1), "2024-QTR1-master.idx");
    }
}
