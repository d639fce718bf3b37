//! rowmill binary entry point.

use std::path::Path;

use clap::error::ErrorKind;
use clap::Parser;

use rowmill_cli::{output, Cli, DEFAULT_ERROR_PATH, USAGE};

fn main() {
    match Cli::try_parse() {
        Ok(cli) => rowmill_cli::run(&cli),
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = err.print();
        }
        Err(_) => {
            // Wrong argument shape: there is no trustworthy output path, so
            // the usage error goes to the default location.
            let _ = output::write_error(Path::new(DEFAULT_ERROR_PATH), USAGE);
        }
    }
}
