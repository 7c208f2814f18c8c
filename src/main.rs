//! `plw` binary entrypoint.

use std::process::ExitCode;

use clap::Parser;
use power_watchdog::cli_app::{self, Cli};

/// Exit status when configuration or environment checks abort startup.
const EXIT_STARTUP: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli_app::run(&cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("plw: {err}");
            if err.is_startup() {
                ExitCode::from(EXIT_STARTUP)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}
