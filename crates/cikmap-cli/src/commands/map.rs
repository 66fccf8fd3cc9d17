//! Map command implementation.

use crate::batch_file;
use crate::cli::MapArgs;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use cikmap_pipeline::{build_dynamics, build_mapping, MappingOptions};

/// Execute the map command.
pub fn execute_map(args: MapArgs, formatter: &Formatter) -> Result<()> {
    let mapping_options = options(&args)?;
    let records = batch_file::load_all(&args.input)?;

    if args.dynamics {
        let rows = build_dynamics(&records);
        match &args.output {
            Some(path) => {
                batch_file::save_lines(path, &rows)?;
                eprintln!(
                    "{}",
                    formatter.success(&format!("Wrote {} pairs to {}", rows.len(), path.display()))
                );
            }
            None => println!("{}", formatter.format_dynamics(&rows)?),
        }
    } else {
        let rows = build_mapping(&records, &mapping_options);
        match &args.output {
            Some(path) => {
                batch_file::save_lines(path, &rows)?;
                eprintln!(
                    "{}",
                    formatter.success(&format!(
                        "Wrote {} mappings to {}",
                        rows.len(),
                        path.display()
                    ))
                );
            }
            None => println!("{}", formatter.format_mapping(&rows)?),
        }
    }

    Ok(())
}

fn options(args: &MapArgs) -> Result<MappingOptions> {
    let mut options = MappingOptions::default();
    if let Some(lengths) = &args.valid_lengths {
        if lengths.is_empty() {
            return Err(CliError::InvalidInput(
                "--valid-lengths needs at least one length".to_string(),
            ));
        }
        options.valid_lengths = lengths.clone();
    }
    if let Some(prefixes) = &args.forbidden_prefixes {
        options.forbidden_prefixes = prefixes.iter().map(|p| p.trim().to_uppercase()).collect();
    }
    Ok(options)
}
