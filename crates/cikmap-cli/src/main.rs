//! cikmap CLI - map SEC filer CIKs to CUSIPs.

use cikmap_cli::commands;
use cikmap_cli::cli::ConfigAction;
use cikmap_cli::{Cli, Command, Config, Formatter};
use clap::Parser;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> cikmap_cli::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();
    cikmap_cli::init_tracing(cli.verbose);

    // `config init` creates the file, so it must not require one
    let config = match &cli.command {
        Command::Config(args) if matches!(args.action, ConfigAction::Init { .. }) => {
            Config::default()
        }
        _ => Config::load(cli.config.as_deref())?,
    };

    // Determine output format
    let format = cli
        .format
        .map(Into::into)
        .unwrap_or(config.settings.format);

    // Determine color setting
    let color_enabled = !cli.no_color && config.settings.color;

    let formatter = Formatter::new(format, color_enabled);

    match cli.command {
        Command::Run(args) => commands::execute_run(args, config, &formatter).await?,
        Command::FetchIndex(args) => {
            commands::execute_fetch_index(args, config, &formatter).await?
        }
        Command::Extract(args) => commands::execute_extract(args, &config, &formatter)?,
        Command::Download(args) => commands::execute_download(args, config, &formatter).await?,
        Command::Map(args) => commands::execute_map(args, &formatter)?,
        Command::Config(args) => {
            commands::execute_config(args, &config, cli.config.as_deref(), &formatter)?
        }
    }

    Ok(())
}
