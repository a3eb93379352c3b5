//! # Add Command Implementation
//!
//! This module implements the `add` subcommand, which declares an external
//! in `git_externals.json`, creating the file if it does not exist yet.
//!
//! ## Functionality
//!
//! - **Pin**: exactly one of `--branch` (optionally refined by `--ref`) or
//!   `--tag` is required.
//! - **Existing Entries**: a new destination is appended to an existing
//!   entry, but its pin cannot be changed this way; a differing pin is an
//!   inconsistent-pin error.
//! - **No Sync**: only the manifest changes; run `update` afterwards.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{ArgGroup, Args};

use git_externals::manifest::{Manifest, Pin};

use super::{preflight, Context, Requires};

/// Declare an external in git_externals.json
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("pin").required(true).args(["branch", "tag"])))]
pub struct AddArgs {
    /// Repository URL, or a path relative to this repository's origin
    #[arg(value_name = "URL")]
    pub url: String,

    /// Path inside the external (`./` for the whole tree)
    #[arg(value_name = "SRC")]
    pub src: String,

    /// Destination of the link in this repository
    #[arg(value_name = "DST")]
    pub dst: String,

    /// Follow this branch
    #[arg(short, long)]
    pub branch: Option<String>,

    /// Pin to this tag
    #[arg(short, long)]
    pub tag: Option<String>,

    /// Pin the branch to this commit (or `svn:<revision>`)
    #[arg(short, long, requires = "branch")]
    pub r#ref: Option<String>,

    /// Checkout name, instead of the last segment of the URL
    #[arg(short, long)]
    pub name: Option<String>,
}

impl AddArgs {
    fn pin(&self) -> Pin {
        match (&self.tag, &self.branch) {
            (Some(tag), _) => Pin::tag(tag.clone()),
            (None, branch) => Pin::Branch {
                name: branch.clone().unwrap_or_default(),
                r#ref: self.r#ref.clone(),
            },
        }
    }
}

/// Execute the `add` command.
pub fn execute(args: AddArgs, ctx: &Context) -> Result<()> {
    let root = preflight(Requires::Repository)?;
    let file = add_to(&root, &args)?;
    println!(
        "{}",
        ctx.output.info(&format!(
            "Added {} ({}) -> {} in {}",
            args.url,
            args.src,
            args.dst,
            file.display()
        ))
    );
    Ok(())
}

fn add_to(dir: &Path, args: &AddArgs) -> Result<PathBuf> {
    let mut manifest = Manifest::load(dir)?;
    manifest.add(&args.url, &args.src, &args.dst, args.pin(), args.name.clone())?;
    Ok(manifest.save(dir)?)
}
