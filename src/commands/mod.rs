//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the
//! `git-externals` command-line tool. Each subcommand is defined in its own
//! file to keep the logic separated and maintainable.
//!
//! ## Structure
//!
//! Each command module typically contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and the shared
//!   [`Context`], and performs the command's logic.
//!
//! Before doing anything, a command calls [`preflight`] with what it needs:
//! a git working tree root, the manifest, and for most commands an existing
//! externals storage directory. Failures there carry their own exit codes.

pub mod add;
pub mod completions;
pub mod diff;
pub mod foreach;
pub mod info;
pub mod list;
pub mod remove;
pub mod status;
pub mod update;

use std::env;
use std::path::{Path, PathBuf};

use anyhow::Result;

use git_externals::defaults::{externals_root, manifest_path};
use git_externals::error::Error;
use git_externals::output::OutputConfig;
use git_externals::runner::CommandRunner;
use git_externals::vcs::{Tools, Vcs};
use git_externals::walk::Visit;

/// Settings shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    pub tools: Tools,
    pub output: OutputConfig,
}

impl Context {
    pub fn vcs<'a>(&'a self, runner: &'a dyn CommandRunner) -> Vcs<'a> {
        Vcs::new(runner, &self.tools)
    }
}

/// What a command needs before it can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requires {
    /// Only a git working tree root.
    Repository,
    /// The root plus `git_externals.json`.
    Manifest,
    /// The manifest plus an externals storage created by a previous update.
    Storage,
}

/// Check the current directory against `requires` and return it.
pub fn preflight(requires: Requires) -> Result<PathBuf> {
    let root = env::current_dir()?;
    check_root(&root, requires)?;
    Ok(root)
}

fn check_root(root: &Path, requires: Requires) -> std::result::Result<(), Error> {
    if !root.join(".git").exists() {
        return Err(Error::NotARepository {
            path: root.to_path_buf(),
        });
    }
    if requires == Requires::Repository {
        return Ok(());
    }

    let manifest = manifest_path(root);
    if !manifest.is_file() {
        return Err(Error::ManifestNotFound { path: manifest });
    }
    if requires == Requires::Manifest {
        return Ok(());
    }

    let storage = externals_root(root);
    if !storage.is_dir() {
        return Err(Error::NotInitialized { path: storage });
    }
    Ok(())
}

/// Keep the visits whose name or reference is listed in `selected`; an empty
/// selection keeps everything.
pub fn select<'v>(visits: &'v [Visit], selected: &[String]) -> Vec<&'v Visit> {
    visits
        .iter()
        .filter(|v| {
            selected.is_empty()
                || selected
                    .iter()
                    .any(|s| *s == v.entry.name || *s == v.entry.reference || *s == v.reference)
        })
        .collect()
}
