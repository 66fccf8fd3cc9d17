//! Extract command implementation.

use crate::cli::ExtractArgs;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use cikmap_extractor::CandidateExtractor;
use std::fs;

/// Execute the extract command.
pub fn execute_extract(args: ExtractArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let mut extractor_config = config.pipeline.extractor.clone();
    if let Some(radius) = args.window_radius {
        extractor_config.window_radius = radius;
    }
    if args.strict {
        extractor_config.strict_validation = true;
    }
    let extractor =
        CandidateExtractor::new(extractor_config).map_err(|e| CliError::Config(e.to_string()))?;

    let mut results = Vec::with_capacity(args.files.len());
    for file in &args.files {
        let bytes = fs::read(file)?;
        let text = String::from_utf8_lossy(&bytes);
        match extractor.extract(&text) {
            Ok(extraction) => results.push((file.display().to_string(), extraction)),
            Err(e) => eprintln!("{}", formatter.error(&format!("{}: {}", file.display(), e))),
        }
    }

    println!("{}", formatter.format_extractions(&results)?);
    Ok(())
}
