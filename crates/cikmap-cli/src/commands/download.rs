//! Download command implementation.

use crate::cli::DownloadArgs;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use cikmap_domain::accession_from_locator;
use cikmap_fetch::{HttpFetcher, RateGovernor};
use std::fs;

/// Execute the download command.
pub async fn execute_download(
    args: DownloadArgs,
    mut config: Config,
    formatter: &Formatter,
) -> Result<()> {
    config.apply_identity(&args.identity);
    let accession = validate_accession(&args.accession)?;

    let governor = RateGovernor::new(config.pipeline.rate_per_second)
        .map_err(|e| CliError::Config(e.to_string()))?;
    let fetcher = HttpFetcher::new(config.fetch.clone())?;

    let url = fetcher.filing_url(args.cik.trim(), accession);
    let body = fetcher.get_text(&url, &governor).await?;

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(&args.output, &body)?;

    println!(
        "{}",
        formatter.success(&format!(
            "Saved {} ({} bytes) to {}",
            accession,
            body.len(),
            args.output.display()
        ))
    );
    Ok(())
}

fn validate_accession(raw: &str) -> Result<&str> {
    let trimmed = raw.trim();
    match accession_from_locator(trimmed) {
        Some(found) if found == trimmed => Ok(trimmed),
        _ => Err(CliError::InvalidInput(format!(
            "'{}' is not an accession number (expected NNNNNNNNNN-NN-NNNNNN)",
            raw
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accession() {
        assert_eq!(
            validate_accession(" 0000320193-23-000106 ").unwrap(),
            "0000320193-23-000106"
        );
        assert!(validate_accession("0000320193-23-00010").is_err());
        assert!(validate_accession("x0000320193-23-000106").is_err());
        assert!(validate_accession("edgar/data/1/0000320193-23-000106.txt").is_err());
    }
}
