//! # Status Command Implementation
//!
//! This module implements the `status` subcommand, which reports the working
//! tree status of every checked-out external, descending into nested
//! externals.
//!
//! ## Output
//!
//! - **Default**: only externals with local modifications are printed, each
//!   under an `External <name>` header.
//! - **`--verbose`**: every external is printed, including untracked files.
//! - **`--porcelain`**: the reference of each external followed by the
//!   machine-readable `git status --porcelain` output.

use anyhow::Result;
use clap::Args;

use git_externals::runner::SystemRunner;
use git_externals::vcs::{Vcs, WorkingCopy};
use git_externals::walk::{walk, Visit};

use super::{preflight, select, Context, Requires};

/// Show the working tree status of the externals
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Machine-readable output
    #[arg(long)]
    pub porcelain: bool,

    /// Print every external, not only the modified ones
    #[arg(short, long)]
    pub verbose: bool,

    /// Restrict the report to these externals (name or reference)
    #[arg(value_name = "EXTERNAL")]
    pub externals: Vec<String>,
}

/// Execute the `status` command.
pub fn execute(args: StatusArgs, ctx: &Context) -> Result<()> {
    let root = preflight(Requires::Storage)?;
    let runner = SystemRunner;
    let vcs = ctx.vcs(&runner);

    let visits = walk(&vcs, &root, true)?;
    for visit in select(&visits, &args.externals)
        .into_iter()
        .filter(|v| v.exists)
    {
        let report = status_of(&vcs, visit, &args)?;
        if args.porcelain {
            println!("{}", visit.reference);
            print!("{}", report);
        } else if args.verbose || !report.trim().is_empty() {
            println!("{}", ctx.output.info(&format!("External {}", visit.entry.name)));
            println!("{}", report.trim_end());
            println!();
        }
    }
    Ok(())
}

fn status_of(vcs: &Vcs<'_>, visit: &Visit, args: &StatusArgs) -> Result<String> {
    let report = match WorkingCopy::detect(&visit.checkout) {
        Some(WorkingCopy::Svn) => vcs.svn_status(&visit.checkout, args.verbose)?,
        _ => vcs.status(&visit.checkout, args.porcelain || !args.verbose)?,
    };
    Ok(report)
}
