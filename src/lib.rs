//! Core library entry for the `tsmigrate` CLI.

pub mod adapters;
pub mod cassette;
pub mod classify;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod ports;
pub mod prompts;
pub mod refactor;
pub mod summary;
pub mod walk;

use clap::error::ErrorKind;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Run the CLI with the provided arguments.
///
/// # Errors
///
/// Returns an error string when argument parsing fails or the run cannot start.
pub fn run<I, T>(args: I) -> Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = match cli::Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            print!("{err}");
            return Ok(());
        }
        Err(err) => return Err(err.to_string()),
    };
    // A missing .env is normal; variables may come from the real environment.
    let _ = dotenvy::dotenv();
    commands::dispatch(&cli).map(|_| ())
}

/// Install the stderr log subscriber. `RUST_LOG` overrides the default filter.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,tsmigrate=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
