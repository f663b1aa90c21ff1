//! Binary entrypoint for the `tsmigrate` CLI.

use std::process::ExitCode;

fn main() -> ExitCode {
    tsmigrate::init_logging();
    // Recording and replay are handled in commands::dispatch via
    // TSMIGRATE_RECORD / TSMIGRATE_REPLAY.
    match tsmigrate::run(std::env::args()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
