//! # List Command Implementation
//!
//! This module implements the `list` subcommand, which prints the name of
//! every external that has a checkout, one per line, nested externals
//! included.

use anyhow::Result;
use clap::Args;

use git_externals::runner::SystemRunner;
use git_externals::walk::{walk, Visit};

use super::{preflight, Context, Requires};

/// List the externals that have a checkout
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only list the externals declared by this repository
    #[arg(long)]
    pub no_recursive: bool,
}

/// Execute the `list` command.
pub fn execute(args: ListArgs, ctx: &Context) -> Result<()> {
    let root = preflight(Requires::Storage)?;
    let runner = SystemRunner;

    let visits = walk(&ctx.vcs(&runner), &root, !args.no_recursive)?;
    for name in checked_out(&visits) {
        println!("{}", name);
    }
    Ok(())
}

/// Names of the externals with a checkout, each listed once.
fn checked_out(visits: &[Visit]) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    for visit in visits.iter().filter(|v| v.exists) {
        if !names.contains(&visit.entry.name.as_str()) {
            names.push(&visit.entry.name);
        }
    }
    names
}
