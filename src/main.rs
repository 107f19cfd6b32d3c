//! Application entry point.
//!
//! Parses command-line arguments, layers configuration over them and
//! delegates execution to [`runner::run`].

use makegen::{cli, runner};
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::fmt;

fn main() -> ExitCode {
    let (parsed, matches) = match cli::parse_from(std::env::args_os()) {
        Ok(parsed) => parsed,
        Err(err) => err.exit(),
    };
    let cli = match cli::merge_with_config(&parsed, &matches) {
        Ok(merged) => merged.with_default_command(),
        Err(err) => {
            fmt()
                .with_max_level(Level::ERROR)
                .with_writer(std::io::stderr)
                .init();
            tracing::error!(error = %err, "configuration failed");
            return ExitCode::FAILURE;
        }
    };
    let max_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::ERROR
    };
    fmt()
        .with_max_level(max_level)
        .with_writer(std::io::stderr)
        .init();
    match runner::run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "runner failed");
            ExitCode::FAILURE
        }
    }
}
