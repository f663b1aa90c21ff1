//! Command handling: configuration, context wiring and reporting.

pub mod migrate;

use std::env;
use std::path::{Path, PathBuf};

use crate::cli::Cli;
use crate::config::{FileConfig, Settings, DEFAULT_CONFIG_FILE};
use crate::context::ServiceContext;
use crate::summary::RunSummary;

/// Environment variable naming a cassette to record completions into.
pub const RECORD_VAR: &str = "TSMIGRATE_RECORD";
/// Environment variable naming a cassette to serve completions from.
pub const REPLAY_VAR: &str = "TSMIGRATE_REPLAY";

/// Run a migration for the parsed command line and print its summary.
///
/// When `TSMIGRATE_REPLAY` is set, completions come from that cassette and no
/// credential is needed. When `TSMIGRATE_RECORD` is set, live completions are
/// also recorded to that cassette.
///
/// # Errors
///
/// Returns an error string for startup failures: a bad ROOT, an unreadable
/// config file, a missing credential, or an unwritable summary file.
/// Per-file failures are reported in the summary, not as errors.
pub fn dispatch(cli: &Cli) -> Result<RunSummary, String> {
    if !cli.root.is_dir() {
        return Err(format!("{} is not a directory", cli.root.display()));
    }

    let settings = load_settings(cli)?;
    let ctx = build_context(&settings)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .map_err(|e| format!("Failed to start async runtime: {e}"))?;
    let summary = runtime.block_on(migrate::migrate(&ctx, &settings, &cli.root));

    // Drop context first so a recording is flushed before the summary prints.
    drop(ctx);

    print!("{summary}");
    if let Some(path) = &cli.summary_json {
        write_summary_json(path, &summary)?;
    }
    Ok(summary)
}

/// Resolves settings from the config file, the environment and the flags.
fn load_settings(cli: &Cli) -> Result<Settings, String> {
    let file = match config_path(cli) {
        Some(path) => FileConfig::load(&path).map_err(|e| e.to_string())?,
        None => FileConfig::default(),
    };
    let lookup = |key: &str| env::var(key).ok();
    Settings::resolve(&file, lookup, &cli.overrides()).map_err(|e| e.to_string())
}

/// `--config` when given, else `tsmigrate.yaml` in ROOT if it exists.
fn config_path(cli: &Cli) -> Option<PathBuf> {
    cli.config.clone().or_else(|| {
        let candidate = cli.root.join(DEFAULT_CONFIG_FILE);
        candidate.is_file().then_some(candidate)
    })
}

fn build_context(settings: &Settings) -> Result<ServiceContext, String> {
    if let Ok(path) = env::var(REPLAY_VAR) {
        return ServiceContext::replaying(Path::new(&path));
    }
    if let Ok(path) = env::var(RECORD_VAR) {
        return ServiceContext::recording(settings, Path::new(&path)).map_err(|e| e.to_string());
    }
    ServiceContext::live(settings).map_err(|e| e.to_string())
}

fn write_summary_json(path: &Path, summary: &RunSummary) -> Result<(), String> {
    let json = serde_json::to_string_pretty(summary)
        .map_err(|e| format!("Failed to serialize summary: {e}"))?;
    std::fs::write(path, json)
        .map_err(|e| format!("Failed to write summary to {}: {e}", path.display()))
}
