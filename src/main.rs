//! Locpipe - command-line tool for the localization data pipeline

use std::process::ExitCode;

use locpipe::cli;

fn main() -> ExitCode {
    cli::run()
}
