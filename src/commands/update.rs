//! # Update Command Implementation
//!
//! This module implements the `update` subcommand, which brings every
//! declared external to its pin and refreshes the links into the working
//! tree.
//!
//! ## Functionality
//!
//! - **Sanity Check**: the existing externals forest is checked for
//!   conflicting pins before anything is fetched.
//!
//! - **Local Modifications**: without `--reset` the update refuses to run
//!   while the repository or any external has local modifications. With
//!   `--reset` those modifications are discarded, after an interactive
//!   confirmation that `--no-confirm` skips.
//!
//! - **Recursion**: by default the externals of externals are updated too;
//!   `--no-recursive` stops at the first level.
//!
//! - **Centralized Externals**: first-time checkouts of svn externals go
//!   through git-svn unless `--no-gitsvn` is given.

use anyhow::Result;
use clap::Args;
use dialoguer::{theme::ColorfulTheme, Confirm};

use git_externals::engine::{Engine, EngineOptions};
use git_externals::runner::SystemRunner;

use super::{preflight, Context, Requires};

/// Clone or update every external and refresh its links
#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Also update the externals of externals (default)
    #[arg(long, overrides_with = "no_recursive")]
    pub recursive: bool,

    /// Only update the externals declared by this repository
    #[arg(long)]
    pub no_recursive: bool,

    /// Discard local modifications in the repository and every external
    #[arg(long)]
    pub reset: bool,

    /// Do not ask before discarding local modifications
    #[arg(long)]
    pub no_confirm: bool,

    /// Check out centralized externals through git-svn (default)
    #[arg(long, overrides_with = "no_gitsvn")]
    pub gitsvn: bool,

    /// Check out centralized externals with svn directly
    #[arg(long)]
    pub no_gitsvn: bool,
}

impl UpdateArgs {
    /// Engine options selected by the flags.
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            recursive: !self.no_recursive,
            reset: self.reset,
            use_bridge: !self.no_gitsvn,
        }
    }
}

/// Execute the `update` command.
pub fn execute(args: UpdateArgs, ctx: &Context) -> Result<()> {
    let root = preflight(Requires::Manifest)?;

    if args.reset && !args.no_confirm {
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!(
                "Discard all local modifications in {} and its externals?",
                root.display()
            ))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Aborted.");
            return Ok(());
        }
    }

    let runner = SystemRunner;
    let engine = Engine::new(ctx.vcs(&runner), args.engine_options());
    engine.update(&root)?;
    Ok(())
}
