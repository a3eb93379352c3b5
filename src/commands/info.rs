//! # Info Command Implementation
//!
//! This module implements the `info` subcommand, which prints the declared
//! externals: reference, pin and every `source -> destination` mapping.
//!
//! With `--recursive` (the default) the manifests of existing checkouts are
//! included too, each nesting level indented one step further.
//!
//! This command is a safe, read-only operation that does not modify any files.

use std::fmt::Write as _;

use anyhow::Result;
use clap::Args;

use git_externals::manifest::Pin;
use git_externals::runner::SystemRunner;
use git_externals::walk::{walk, Visit};

use super::{preflight, select, Context, Requires};

/// Print the declared externals
#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Include the externals of externals (default)
    #[arg(long, overrides_with = "no_recursive")]
    pub recursive: bool,

    /// Only show the externals declared by this repository
    #[arg(long)]
    pub no_recursive: bool,

    /// Restrict the output to these externals (name or reference)
    #[arg(value_name = "EXTERNAL")]
    pub externals: Vec<String>,
}

/// Execute the `info` command.
pub fn execute(args: InfoArgs, ctx: &Context) -> Result<()> {
    let root = preflight(Requires::Storage)?;
    let runner = SystemRunner;

    let visits = walk(&ctx.vcs(&runner), &root, !args.no_recursive)?;
    print!("{}", render(&select(&visits, &args.externals)));
    Ok(())
}

fn render(visits: &[&Visit]) -> String {
    let mut out = String::new();
    for visit in visits {
        let indent = "    ".repeat(visit.depth);
        let entry = &visit.entry;

        // Writing to a String cannot fail.
        let _ = writeln!(out, "{}Repo: {}", indent, entry.reference);
        match &entry.pin {
            Pin::Tag(tag) => {
                let _ = writeln!(out, "{}Tag: {}", indent, tag);
            }
            Pin::Branch { name, r#ref } => {
                let _ = writeln!(out, "{}Branch: {}", indent, name);
                if let Some(r) = r#ref {
                    let _ = writeln!(out, "{}Ref: {}", indent, r);
                }
            }
        }
        for (src, dst) in entry.target_pairs() {
            let _ = writeln!(out, "{}  {} -> {}", indent, src, dst);
        }
        out.push('\n');
    }
    out
}
