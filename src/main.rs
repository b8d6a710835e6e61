//! secmar CLI entry point
//!
//! Parses arguments and dispatches through `cli::run`, which owns
//! configuration, logging and output. main.rs only maps failure to a
//! non-zero exit status.

use secmar::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
