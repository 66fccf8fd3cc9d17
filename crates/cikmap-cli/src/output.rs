//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use cikmap_domain::{BatchRecord, Extraction};
use cikmap_pipeline::{CusipDynamics, MappingRow, RunSummary};
use colored::*;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Active output format.
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Format batch records.
    pub fn format_records(&self, records: &[BatchRecord]) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(records)?),
            OutputFormat::Table => Ok(self.format_records_table(records)),
            OutputFormat::Quiet => Ok(records
                .iter()
                .filter_map(|r| {
                    r.candidate
                        .as_ref()
                        .map(|c| format!("{} {}", r.issuer_key, c))
                })
                .collect::<Vec<_>>()
                .join("\n")),
        }
    }

    fn format_records_table(&self, records: &[BatchRecord]) -> String {
        if records.is_empty() {
            return self.colorize("No records.", "yellow");
        }

        let mut builder = Builder::default();
        builder.push_record([
            "CIK", "Company", "Form", "Filed", "CUSIP", "Method", "Confidence", "Status",
        ]);

        for record in records {
            let status = match &record.error {
                Some(error) => format!("{:?}: {}", record.status, error),
                None => format!("{:?}", record.status),
            };
            builder.push_record([
                record.issuer_key.clone(),
                record.company_name.clone(),
                record.form_kind.to_string(),
                record.filed_on.to_string(),
                record.candidate.clone().unwrap_or_else(|| "-".to_string()),
                record.method.to_string(),
                format!("{:.2}", record.confidence),
                status,
            ]);
        }

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));
        table.to_string()
    }

    /// Format extractions of local files.
    pub fn format_extractions(&self, results: &[(String, Extraction)]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let rows: Vec<serde_json::Value> = results
                    .iter()
                    .map(|(file, extraction)| {
                        serde_json::json!({
                            "file": file,
                            "candidate": extraction.candidate,
                            "method": extraction.method,
                            "confidence": extraction.confidence,
                        })
                    })
                    .collect();
                Ok(serde_json::to_string_pretty(&rows)?)
            }
            OutputFormat::Quiet => Ok(results
                .iter()
                .map(|(_, e)| e.candidate.clone().unwrap_or_else(|| "-".to_string()))
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => {
                if results.is_empty() {
                    return Ok(self.colorize("No files.", "yellow"));
                }
                let mut builder = Builder::default();
                builder.push_record(["File", "CUSIP", "Method", "Confidence"]);
                for (file, extraction) in results {
                    builder.push_record([
                        file.clone(),
                        extraction.candidate.clone().unwrap_or_else(|| "-".to_string()),
                        extraction.method.to_string(),
                        format!("{:.2}", extraction.confidence),
                    ]);
                }
                let mut table = builder.build();
                table
                    .with(Style::rounded())
                    .with(Modify::new(Rows::first()).with(Alignment::center()));
                Ok(table.to_string())
            }
        }
    }

    /// Format the CIK to CUSIP mapping.
    pub fn format_mapping(&self, rows: &[MappingRow]) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(rows)?),
            OutputFormat::Quiet => Ok(rows
                .iter()
                .map(|r| format!("{} {}", r.cik, r.cusip8))
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => {
                if rows.is_empty() {
                    return Ok(self.colorize("No mappings.", "yellow"));
                }
                let mut builder = Builder::default();
                builder.push_record(["CIK", "CUSIP6", "CUSIP8"]);
                for row in rows {
                    builder.push_record([
                        row.cik.to_string(),
                        row.cusip6.clone(),
                        row.cusip8.clone(),
                    ]);
                }
                let mut table = builder.build();
                table
                    .with(Style::rounded())
                    .with(Modify::new(Rows::first()).with(Alignment::center()));
                Ok(table.to_string())
            }
        }
    }

    /// Format per-pair dynamics.
    pub fn format_dynamics(&self, rows: &[CusipDynamics]) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(rows)?),
            OutputFormat::Quiet => Ok(rows
                .iter()
                .map(|r| format!("{} {} {}", r.cik, r.cusip8, r.filings_count))
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => {
                if rows.is_empty() {
                    return Ok(self.colorize("No mappings.", "yellow"));
                }
                let mut builder = Builder::default();
                builder.push_record([
                    "CIK", "CUSIP8", "CUSIP9", "First", "Last", "Filings", "Months", "Forms",
                    "Check", "Fallback",
                ]);
                for row in rows {
                    builder.push_record([
                        row.cik.to_string(),
                        row.cusip8.clone(),
                        row.cusip9.clone().unwrap_or_else(|| "-".to_string()),
                        row.first_seen.to_string(),
                        row.last_seen.to_string(),
                        row.filings_count.to_string(),
                        row.months_active.to_string(),
                        row.forms.join(";"),
                        if row.valid_check_digit { "ok" } else { "-" }.to_string(),
                        row.fallback_filings.to_string(),
                    ]);
                }
                let mut table = builder.build();
                table
                    .with(Style::rounded())
                    .with(Modify::new(Rows::first()).with(Alignment::center()));
                Ok(table.to_string())
            }
        }
    }

    /// Format a run summary.
    pub fn format_summary(&self, summary: &RunSummary) -> Result<String> {
        match self.format {
            OutputFormat::Table => Ok(summary.summary()),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&serde_json::json!({
                "total": summary.total,
                "parsed": summary.total_parsed(),
                "window": summary.window,
                "fallback": summary.fallback,
                "none": summary.no_match,
                "fetch_permanent": summary.fetch_permanent,
                "fetch_exhausted": summary.fetch_exhausted,
                "parse_failed": summary.parse_failed,
                "cancelled": summary.cancelled,
                "found_rate": summary.found_rate(),
                "elapsed_secs": summary.elapsed.as_secs_f64(),
            }))?),
            OutputFormat::Quiet => Ok(format!("{}/{}", summary.total_found(), summary.total)),
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            _ => text.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use cikmap_domain::{ExtractionMethod, FormKind, RecordStatus};
    use std::time::Duration;

    fn create_test_record() -> BatchRecord {
        BatchRecord {
            issuer_key: "1341439".to_string(),
            company_name: "ORACLE CORP".to_string(),
            form_kind: FormKind::Schedule13GA,
            filed_on: NaiveDate::from_ymd_opt(2024, 2, 14).unwrap(),
            item_key: "0001341439-24-000001".to_string(),
            fetch_target: "https://www.sec.gov/Archives/edgar/data/1341439/0001341439-24-000001.txt"
                .to_string(),
            candidate: Some("68389X105".to_string()),
            method: ExtractionMethod::Window,
            confidence: 0.9,
            status: RecordStatus::Ok,
            error: None,
        }
    }

    #[test]
    fn test_json_format() {
        let formatter = Formatter::new(OutputFormat::Json, false);
        let output = formatter.format_records(&[create_test_record()]).unwrap();
        assert!(output.contains("\"candidate\": \"68389X105\""));
        assert!(output.contains("\"form_kind\": \"SC 13G/A\""));
    }

    #[test]
    fn test_quiet_format() {
        let formatter = Formatter::new(OutputFormat::Quiet, false);
        let mut missing = create_test_record();
        missing.candidate = None;
        let output = formatter
            .format_records(&[create_test_record(), missing])
            .unwrap();
        assert_eq!(output, "1341439 68389X105");
    }

    #[test]
    fn test_table_format() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_records(&[create_test_record()]).unwrap();
        assert!(output.contains("CUSIP"));
        assert!(output.contains("68389X105"));
        assert!(output.contains("window"));
    }

    #[test]
    fn test_empty_records() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_records(&[]).unwrap();
        assert!(output.contains("No records"));
    }

    #[test]
    fn test_extractions() {
        let results = vec![
            (
                "a.txt".to_string(),
                Extraction::found("68389X105", ExtractionMethod::Fallback, 0.6),
            ),
            ("b.txt".to_string(), Extraction::no_match()),
        ];

        let quiet = Formatter::new(OutputFormat::Quiet, false);
        assert_eq!(quiet.format_extractions(&results).unwrap(), "68389X105\n-");

        let json = Formatter::new(OutputFormat::Json, false);
        let output = json.format_extractions(&results).unwrap();
        assert!(output.contains("\"method\": \"fallback\""));
        assert!(output.contains("\"method\": \"none\""));
    }

    #[test]
    fn test_summary_formats() {
        let summary = RunSummary {
            total: 4,
            window: 2,
            fallback: 1,
            no_match: 1,
            elapsed: Duration::from_secs(1),
            ..RunSummary::default()
        };

        let quiet = Formatter::new(OutputFormat::Quiet, false);
        assert_eq!(quiet.format_summary(&summary).unwrap(), "3/4");

        let table = Formatter::new(OutputFormat::Table, false);
        assert!(table.format_summary(&summary).unwrap().contains("Filings processed: 4"));

        let json = Formatter::new(OutputFormat::Json, false);
        assert!(json.format_summary(&summary).unwrap().contains("\"found_rate\": 0.75"));
    }

    #[test]
    fn test_mapping_formats() {
        let rows = vec![MappingRow {
            cik: 1341439,
            cusip6: "68389X".to_string(),
            cusip8: "68389X10".to_string(),
        }];

        let quiet = Formatter::new(OutputFormat::Quiet, false);
        assert_eq!(quiet.format_mapping(&rows).unwrap(), "1341439 68389X10");

        let table = Formatter::new(OutputFormat::Table, false);
        assert!(table.format_mapping(&rows).unwrap().contains("CUSIP6"));
        assert!(table.format_mapping(&[]).unwrap().contains("No mappings"));

        let json = Formatter::new(OutputFormat::Json, false);
        assert!(json.format_mapping(&rows).unwrap().contains("\"cik\": 1341439"));
    }

    #[test]
    fn test_dynamics_table() {
        let records = vec![create_test_record()];
        let dynamics = cikmap_pipeline::build_dynamics(&records);

        let table = Formatter::new(OutputFormat::Table, false);
        let output = table.format_dynamics(&dynamics).unwrap();
        assert!(output.contains("68389X105"));
        assert!(output.contains("SC 13G/A"));

        let quiet = Formatter::new(OutputFormat::Quiet, false);
        assert_eq!(quiet.format_dynamics(&dynamics).unwrap(), "1341439 68389X10 1");
    }

    #[test]
    fn test_colorize_disabled() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        assert_eq!(formatter.success("test"), "✓ test");
    }
}
