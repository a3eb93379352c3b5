//! # git-externals CLI
//!
//! This is the binary entry point for the `git-externals` command-line tool,
//! also reachable as `git externals` once it is on the `PATH`.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Executing the appropriate command based on the parsed arguments.
//! - Turning a failed command into a message on stderr and the matching
//!   process exit code (see [`git_externals::error::exit_codes`]).
//!
//! The core application logic is defined in the `lib.rs` library crate, ensuring
//! that the binary is a thin wrapper around the reusable library functionality.

mod cli;
mod commands;

use clap::Parser;

use git_externals::error::{exit_codes, Error};

fn main() {
    let cli = cli::Cli::parse();
    let output = cli.output();

    if let Err(err) = cli.execute() {
        let code = err
            .downcast_ref::<Error>()
            .map(Error::exit_code)
            .unwrap_or(exit_codes::ERROR);
        eprintln!("{}", output.error(&format!("Error: {:#}", err)));
        std::process::exit(code);
    }
}
