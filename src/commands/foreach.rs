//! # Foreach Command Implementation
//!
//! This module implements the `foreach` subcommand, which runs an arbitrary
//! command inside every checked-out external, with its output passed through
//! to the terminal.
//!
//! The externals forest is sanity-checked first. A failing command stops the
//! iteration and its exit code becomes the exit code of `git-externals`.

use anyhow::Result;
use clap::Args;

use git_externals::runner::{OutputMode, SystemRunner};
use git_externals::sanity;
use git_externals::walk::walk;

use super::{preflight, Context, Requires};

/// Run a command in every external checkout
#[derive(Args, Debug)]
pub struct ForeachArgs {
    /// Include the externals of externals (default)
    #[arg(long, overrides_with = "no_recursive")]
    pub recursive: bool,

    /// Only visit the externals declared by this repository
    #[arg(long)]
    pub no_recursive: bool,

    /// The command to run, after `--`
    #[arg(value_name = "COMMAND", required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

/// Execute the `foreach` command.
pub fn execute(args: ForeachArgs, ctx: &Context) -> Result<()> {
    let root = preflight(Requires::Storage)?;
    let runner = SystemRunner;
    let vcs = ctx.vcs(&runner);

    let visits = walk(&vcs, &root, !args.no_recursive)?;
    sanity::check(&root, &visits)?;

    let (program, rest) = match args.command.split_first() {
        Some(split) => split,
        None => return Ok(()),
    };
    let rest: Vec<&str> = rest.iter().map(String::as_str).collect();

    for visit in visits.iter().filter(|v| v.exists) {
        println!("{}", ctx.output.info(&format!("External {}", visit.entry.name)));
        vcs.run(&visit.checkout, program, &rest, OutputMode::Stream)?;
    }
    Ok(())
}
