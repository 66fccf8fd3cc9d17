//! Fetch-index command implementation.

use crate::cli::FetchIndexArgs;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::index;
use crate::output::Formatter;
use chrono::Datelike;
use cikmap_fetch::{HttpFetcher, RateGovernor};
use std::fs;
use tracing::{info, warn};

/// Execute the fetch-index command.
pub async fn execute_fetch_index(
    args: FetchIndexArgs,
    mut config: Config,
    formatter: &Formatter,
) -> Result<()> {
    config.apply_identity(&args.identity);
    let rate = args.rate.unwrap_or(config.pipeline.rate_per_second);
    let governor = RateGovernor::new(rate).map_err(|e| CliError::Config(e.to_string()))?;
    let fetcher = HttpFetcher::new(config.fetch.clone())?;

    let start = (args.start_year, args.start_quarter);
    let end = resolve_end(args.end_year, args.end_quarter, current_quarter());
    if start > end {
        return Err(CliError::InvalidInput(format!(
            "start {} QTR{} is after end {} QTR{}",
            start.0, start.1, end.0, end.1
        )));
    }

    fs::create_dir_all(&args.dir)?;

    let mut downloaded = 0usize;
    let mut skipped = 0usize;
    let mut missing = 0usize;

    for (year, quarter) in index::quarters(start, end) {
        let path = args.dir.join(index::index_file_name(year, quarter));
        if args.skip_existing && path.exists() {
            skipped += 1;
            continue;
        }

        match fetcher
            .fetch_optional(&fetcher.index_url(year, quarter), &governor)
            .await?
        {
            Some(body) => {
                fs::write(&path, body)?;
                info!("Saved {}", path.display());
                downloaded += 1;
            }
            None => {
                warn!("No index published for {} QTR{}", year, quarter);
                missing += 1;
            }
        }
    }

    println!(
        "{}",
        formatter.success(&format!(
            "Downloaded {} index files to {} ({} kept, {} not published)",
            downloaded,
            args.dir.display(),
            skipped,
            missing
        ))
    );
    Ok(())
}

fn current_quarter() -> (u16, u8) {
    let today = chrono::Utc::now().date_naive();
    (today.year() as u16, (today.month0() / 3 + 1) as u8)
}

/// Last quarter to download; an explicit past year defaults to its Q4.
fn resolve_end(year: Option<u16>, quarter: Option<u8>, now: (u16, u8)) -> (u16, u8) {
    let year = year.unwrap_or(now.0);
    let quarter = quarter.unwrap_or(if year >= now.0 { now.1 } else { 4 });
    (year, quarter)
}
