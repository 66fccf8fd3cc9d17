//! CLI command definitions and argument parsing.

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

/// cikmap - Map SEC filer CIKs to the CUSIPs named in their 13D/13G filings.
#[derive(Debug, Parser)]
#[command(name = "cikmap")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path (default: ~/.cikmap/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
    /// Quiet format (identifiers only)
    Quiet,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch and parse the filings listed in master index files
    Run(RunArgs),

    /// Download quarterly master index files
    FetchIndex(FetchIndexArgs),

    /// Run the extractor over filings on disk
    Extract(ExtractArgs),

    /// Download a single filing
    Download(DownloadArgs),

    /// Build the CIK to CUSIP mapping from batch files
    Map(MapArgs),

    /// Show or initialize the configuration file
    Config(ConfigArgs),
}

/// Contact identity sent with every archive request.
#[derive(Debug, Clone, Default, Args)]
pub struct IdentityArgs {
    /// Contact name for the User-Agent header
    #[arg(long, env = "SEC_NAME")]
    pub sec_name: Option<String>,

    /// Contact email for the User-Agent and From headers
    #[arg(long, env = "SEC_EMAIL")]
    pub sec_email: Option<String>,
}

/// Arguments for the run command.
#[derive(Debug, Parser)]
pub struct RunArgs {
    /// master.idx files to read
    #[arg(short, long, required = true, num_args = 1..)]
    pub index: Vec<PathBuf>,

    /// Form families to keep (13D, 13G or exact labels such as "SC 13D/A")
    #[arg(long, value_delimiter = ',', default_value = "13D,13G")]
    pub forms: Vec<String>,

    /// JSON-lines batch file (read for resume, then rewritten)
    #[arg(short, long, default_value = "results.jsonl")]
    pub output: PathBuf,

    /// File with one CIK per line; only these filers are processed
    #[arg(long)]
    pub cik_filter: Option<PathBuf>,

    /// Re-fetch filings already present in the output
    #[arg(long)]
    pub force: bool,

    /// Requests per second
    #[arg(long)]
    pub rate: Option<f64>,

    /// Concurrent fetch workers
    #[arg(long)]
    pub fetch_workers: Option<usize>,

    /// Concurrent parse workers
    #[arg(long)]
    pub parse_workers: Option<usize>,

    /// Rewrite the output every N new outcomes (0 disables checkpoints)
    #[arg(long, default_value = "500")]
    pub checkpoint_every: usize,

    #[command(flatten)]
    pub identity: IdentityArgs,
}

/// Arguments for the fetch-index command.
#[derive(Debug, Parser)]
pub struct FetchIndexArgs {
    /// Directory receiving <year>-QTR<q>-master.idx files
    #[arg(short, long, default_value = "index")]
    pub dir: PathBuf,

    /// First year to download
    #[arg(long, default_value = "1994")]
    pub start_year: u16,

    /// First quarter of the first year
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u8).range(1..=4))]
    pub start_quarter: u8,

    /// Last year to download (default: current year)
    #[arg(long)]
    pub end_year: Option<u16>,

    /// Last quarter of the last year (default: current quarter)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=4))]
    pub end_quarter: Option<u8>,

    /// Keep index files that already exist on disk
    #[arg(long)]
    pub skip_existing: bool,

    /// Requests per second
    #[arg(long)]
    pub rate: Option<f64>,

    #[command(flatten)]
    pub identity: IdentityArgs,
}

/// Arguments for the extract command.
#[derive(Debug, Parser)]
pub struct ExtractArgs {
    /// Filing text files
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Characters searched on each side of a CUSIP marker
    #[arg(long)]
    pub window_radius: Option<usize>,

    /// Apply strict validation near markers too
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for the download command.
#[derive(Debug, Parser)]
pub struct DownloadArgs {
    /// Filer CIK
    #[arg(long)]
    pub cik: String,

    /// Accession number (NNNNNNNNNN-NN-NNNNNN)
    #[arg(long)]
    pub accession: String,

    /// Destination file
    #[arg(short, long)]
    pub output: PathBuf,

    #[command(flatten)]
    pub identity: IdentityArgs,
}

/// Arguments for the map command.
#[derive(Debug, Parser)]
pub struct MapArgs {
    /// JSON-lines batch files written by `run`
    #[arg(short, long, num_args = 1.., default_value = "results.jsonl")]
    pub input: Vec<PathBuf>,

    /// Write rows as JSON lines to this file instead of printing them
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Emit per-pair dynamics instead of the plain mapping
    #[arg(long)]
    pub dynamics: bool,

    /// Accepted identifier lengths
    #[arg(long, value_delimiter = ',')]
    pub valid_lengths: Option<Vec<usize>>,

    /// Issuer prefixes to exclude
    #[arg(long, value_delimiter = ',')]
    pub forbidden_prefixes: Option<Vec<String>>,
}

/// Arguments for config management.
#[derive(Debug, Parser)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config management actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
            CliFormat::Quiet => crate::config::OutputFormat::Quiet,
        }
    }
}
