//! Entry point for the `trellis` plugin runner binary.

mod cli;
mod telemetry;

use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;

fn main() -> ExitCode {
    let args = cli::Args::parse();
    if let Err(failure) = telemetry::initialise(&args.log_filter) {
        // Telemetry is not up yet, so report directly on stderr.
        drop(writeln!(std::io::stderr().lock(), "trellis: {failure}"));
        return ExitCode::FAILURE;
    }

    match cli::run(&args) {
        Ok(code) => code,
        Err(failure) => {
            error!(target: "trellis_cli", "{failure:#}");
            ExitCode::FAILURE
        }
    }
}
