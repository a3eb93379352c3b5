//! # git-externals Library
//!
//! This library implements the externals engine behind the `git-externals`
//! command-line tool. An *external* is another repository, checked out at a
//! branch, tag or revision under `.git/externals/<name>` and mapped into the
//! working tree with symbolic links, as declared in `git_externals.json`.
//!
//! ## Quick Example
//!
//! ```
//! use git_externals::manifest::{ExternalEntry, Manifest, Pin};
//! use std::path::Path;
//!
//! let mut manifest = Manifest::new();
//! manifest.insert(
//!     ExternalEntry::new("https://host/proj/libX.git", Pin::branch("master"))
//!         .with_target("./", "vendor/libX"),
//! );
//!
//! let json = manifest.to_json().unwrap();
//! let reloaded = Manifest::parse(&json, Path::new("git_externals.json")).unwrap();
//! assert_eq!(reloaded, manifest);
//! ```
//!
//! ## Core Concepts
//!
//! - **Manifest (`manifest`)**: the declared externals of one directory,
//!   with pins validated into the [`manifest::Pin`] enum at load time.
//! - **Command runner (`runner`, `vcs`)**: every git and svn process goes
//!   through the [`runner::CommandRunner`] trait with an explicit working
//!   directory.
//! - **Traversal (`walk`, `scope`)**: the read-only walk over the externals
//!   forest, restricted at each level to what the parent projects.
//! - **Sanity check (`sanity`)**: rejects one repository pinned differently
//!   in different places.
//! - **Resolver (`resolver`, `revision`, `cache`)**: clones or updates one
//!   external and translates centralized revisions into commits.
//! - **Projection (`links`, `untrack`)**: ordered symlink creation and the
//!   local exclude list.
//!
//! ## Execution Flow
//!
//! [`engine::Engine::update`] runs the sanity check, guards against local
//! modifications, then for each level resolves every external, projects its
//! links, writes the exclude list and recurses into nested manifests.

pub mod cache;
pub mod defaults;
pub mod engine;
pub mod error;
pub mod links;
pub mod manifest;
pub mod output;
pub mod path;
pub mod resolver;
pub mod revision;
pub mod runner;
pub mod sanity;
pub mod scope;
pub mod untrack;
pub mod vcs;
pub mod walk;

#[cfg(test)]
mod links_proptest;
#[cfg(test)]
mod testing;
