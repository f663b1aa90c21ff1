//! CLI argument definitions.

use std::path::PathBuf;

use clap::Parser;

use crate::config::Overrides;

/// Top-level CLI parser for `tsmigrate`.
#[derive(Debug, Parser)]
#[command(
    name = "tsmigrate",
    version,
    about = "Convert a JavaScript/React project to TypeScript file by file with an LLM"
)]
pub struct Cli {
    /// Root directory of the project to migrate.
    pub root: PathBuf,

    /// YAML config file (defaults to `tsmigrate.yaml` in ROOT when present).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Model tried first for every file.
    #[arg(long, value_name = "MODEL")]
    pub primary_model: Option<String>,

    /// Model tried once when the primary model fails.
    #[arg(long, value_name = "MODEL")]
    pub fallback_model: Option<String>,

    /// Attempts per model when rate limited.
    #[arg(long, value_name = "N")]
    pub max_attempts: Option<u32>,

    /// First backoff delay in milliseconds; doubles on each retry.
    #[arg(long, value_name = "MS")]
    pub base_delay_ms: Option<u64>,

    /// Pause after each written file in milliseconds.
    #[arg(long, value_name = "MS")]
    pub post_write_delay_ms: Option<u64>,

    /// Also write the run summary as JSON to this file.
    #[arg(long, value_name = "FILE")]
    pub summary_json: Option<PathBuf>,
}

impl Cli {
    /// The flags that override file and environment configuration.
    #[must_use]
    pub fn overrides(&self) -> Overrides {
        Overrides {
            primary_model: self.primary_model.clone(),
            fallback_model: self.fallback_model.clone(),
            max_attempts: self.max_attempts,
            base_delay_ms: self.base_delay_ms,
            post_write_delay_ms: self.post_write_delay_ms,
        }
    }
}
