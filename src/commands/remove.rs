//! # Remove Command Implementation
//!
//! This module implements the `remove` subcommand, which deletes externals
//! from `git_externals.json`. Checkouts and links are left alone; unknown
//! references are ignored.

use std::path::Path;

use anyhow::Result;
use clap::Args;

use git_externals::manifest::Manifest;

use super::{preflight, Context, Requires};

/// Remove externals from git_externals.json
#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// References of the externals to remove
    #[arg(value_name = "URL", required = true)]
    pub urls: Vec<String>,
}

/// Execute the `remove` command.
pub fn execute(args: RemoveArgs, ctx: &Context) -> Result<()> {
    let root = preflight(Requires::Manifest)?;
    for url in remove_from(&root, &args.urls)? {
        println!("{}", ctx.output.info(&format!("Removed {}", url)));
    }
    Ok(())
}

/// Remove `urls` from the manifest of `dir`, returning those that existed.
fn remove_from(dir: &Path, urls: &[String]) -> Result<Vec<String>> {
    let mut manifest = Manifest::load(dir)?;
    let removed: Vec<String> = urls
        .iter()
        .filter(|url| manifest.remove(url).is_some())
        .cloned()
        .collect();
    manifest.save(dir)?;
    Ok(removed)
}
