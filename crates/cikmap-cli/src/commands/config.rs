//! Config command implementation.

use crate::cli::{ConfigAction, ConfigArgs};
use crate::config::{Config, OutputFormat};
use crate::error::Result;
use crate::output::Formatter;
use std::path::Path;

/// Execute the config command.
pub fn execute_config(
    args: ConfigArgs,
    config: &Config,
    path: Option<&Path>,
    formatter: &Formatter,
) -> Result<()> {
    match args.action {
        ConfigAction::Show => show_config(config, formatter),
        ConfigAction::Init { force } => {
            let path = match path {
                Some(path) => path.to_path_buf(),
                None => Config::path()?,
            };
            init_config(&path, force, formatter)
        }
    }
}

/// Print the effective configuration.
fn show_config(config: &Config, formatter: &Formatter) -> Result<()> {
    let rendered = match formatter.format() {
        OutputFormat::Json => serde_json::to_string_pretty(config)?,
        _ => config.to_toml()?,
    };
    println!("{}", rendered);
    Ok(())
}

/// Write the default configuration file.
fn init_config(path: &Path, force: bool, formatter: &Formatter) -> Result<()> {
    if path.exists() && !force {
        println!(
            "{}",
            formatter.warning(&format!(
                "{} already exists (use --force to overwrite)",
                path.display()
            ))
        );
        return Ok(());
    }

    Config::default().save_to(path)?;
    println!(
        "{}",
        formatter.success(&format!("Wrote default configuration to {}", path.display()))
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_init_writes_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".cikmap").join("config.toml");
        let formatter = Formatter::new(OutputFormat::Table, false);

        init_config(&path, false, &formatter).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), Config::default());
    }

    #[test]
    fn test_init_keeps_existing_file_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[pipeline]\nfetch_workers = 9\n").unwrap();
        let formatter = Formatter::new(OutputFormat::Table, false);

        init_config(&path, false, &formatter).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().pipeline.fetch_workers, 9);

        init_config(&path, true, &formatter).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().pipeline.fetch_workers, 4);
    }

    #[test]
    fn test_show_config() {
        let formatter = Formatter::new(OutputFormat::Json, false);
        assert!(show_config(&Config::default(), &formatter).is_ok());
    }
}
