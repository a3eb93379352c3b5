//! # Diff Command Implementation
//!
//! This module implements the `diff` subcommand, which prints `git diff` for
//! each checked-out external (or `svn diff` for plain svn working copies),
//! descending into nested externals.
//!
//! This command is a safe, read-only operation that does not modify any files.

use anyhow::Result;
use clap::Args;

use git_externals::runner::SystemRunner;
use git_externals::vcs::WorkingCopy;
use git_externals::walk::walk;

use super::{preflight, select, Context, Requires};

/// Show local changes of the externals
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Restrict the diff to these externals (name or reference)
    #[arg(value_name = "EXTERNAL")]
    pub externals: Vec<String>,
}

/// Execute the `diff` command.
pub fn execute(args: DiffArgs, ctx: &Context) -> Result<()> {
    let root = preflight(Requires::Storage)?;
    let runner = SystemRunner;
    let vcs = ctx.vcs(&runner);

    let visits = walk(&vcs, &root, true)?;
    for visit in select(&visits, &args.externals)
        .into_iter()
        .filter(|v| v.exists)
    {
        let diff = match WorkingCopy::detect(&visit.checkout) {
            Some(WorkingCopy::Svn) => vcs.svn(&visit.checkout, &["diff"])?,
            _ => vcs.diff(&visit.checkout)?,
        };
        if diff.trim().is_empty() {
            continue;
        }
        println!("{}", ctx.output.info(&format!("External {}", visit.entry.name)));
        println!("{}", diff.trim_end());
        println!();
    }
    Ok(())
}
