//! cikmap CLI library.
//!
//! This library provides the core functionality for the `cikmap` command-line
//! interface: configuration management, index parsing, batch persistence,
//! command execution and output formatting.

pub mod batch_file;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod index;
pub mod output;

pub use cli::{Cli, Command};
pub use config::Config;
pub use error::{CliError, Result};
pub use output::Formatter;

/// Install the stderr log subscriber.
///
/// `RUST_LOG` wins when set and `verbose` is zero; otherwise `-v` selects
/// debug and `-vv` trace.
pub fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        1 => tracing_subscriber::EnvFilter::new("debug"),
        _ => tracing_subscriber::EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
