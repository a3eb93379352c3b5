//! # Resolver
//!
//! Brings the checkout of one external to the state its pin asks for.
//!
//! ## States
//!
//! - **Absent**: nothing exists under `<storage>/<name>`. The external is
//!   cloned first: a full clone when some target maps the whole tree, a
//!   sparse checkout of the declared sources otherwise. Centralized
//!   externals are cloned through git-svn, or checked out with svn directly
//!   when bridging is disabled.
//! - **Present**: the checkout exists. It is reset first when a destructive
//!   update was requested, then fetched and switched to its pin.
//!
//! A freshly cloned checkout goes through the same switch step, so both
//! paths converge on the same final state.

use std::path::{Path, PathBuf};

use crate::cache::RevisionCache;
use crate::error::{Error, Result};
use crate::manifest::{ExternalEntry, Pin, VcsKind};
use crate::path;
use crate::revision;
use crate::vcs::{Vcs, WorkingCopy};

/// Behaviour switches for [`Resolver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Discard local modifications and untracked files before updating.
    pub reset: bool,
    /// Clone centralized externals through git-svn instead of svn.
    pub use_bridge: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            reset: false,
            use_bridge: true,
        }
    }
}

/// What exists on disk for an external before it is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutState {
    Absent,
    Present(WorkingCopy),
}

impl CheckoutState {
    pub fn detect(checkout: &Path) -> Self {
        match WorkingCopy::detect(checkout) {
            Some(kind) => CheckoutState::Present(kind),
            None => CheckoutState::Absent,
        }
    }
}

/// Resolve a repository reference as declared in the manifest of `dir`.
///
/// Absolute references are returned unchanged; `./` and `../` references are
/// joined onto the `origin` remote of the repository at `dir`.
pub fn resolve_reference(vcs: &Vcs<'_>, dir: &Path, reference: &str) -> Result<String> {
    if !path::is_relative_reference(reference) {
        return Ok(reference.to_string());
    }
    let origin = vcs.origin_url(dir).ok_or_else(|| Error::Reference {
        reference: reference.to_string(),
        message: format!("{} has no origin remote", dir.display()),
    })?;
    path::join_reference(&origin, reference)
}

/// Clones and updates externals inside one storage directory.
pub struct Resolver<'a> {
    vcs: Vcs<'a>,
    cache: &'a RevisionCache,
    options: ResolveOptions,
}

impl<'a> Resolver<'a> {
    pub fn new(vcs: Vcs<'a>, cache: &'a RevisionCache, options: ResolveOptions) -> Self {
        Self {
            vcs,
            cache,
            options,
        }
    }

    /// Make `<storage>/<entry.name>` match the pin of `entry`, fetching from
    /// `url` (the resolved reference). Returns the checkout directory.
    pub fn resolve(&self, storage: &Path, url: &str, entry: &ExternalEntry) -> Result<PathBuf> {
        let checkout = storage.join(&entry.name);
        let state = CheckoutState::detect(&checkout);
        log::debug!("{} is {:?} at {}", entry.name, state, checkout.display());

        match (entry.vcs, state) {
            (VcsKind::Distributed, CheckoutState::Absent) => {
                match entry.sparse_paths() {
                    None => self.vcs.clone(storage, url, &entry.name)?,
                    Some(paths) => self.vcs.sparse_clone(
                        storage,
                        url,
                        &entry.name,
                        &paths,
                        entry.pin.ref_name(),
                    )?,
                };
                self.switch(&checkout, &entry.pin)?;
            }
            (VcsKind::Centralized, CheckoutState::Absent) => {
                if self.options.use_bridge {
                    self.vcs.git_svn_clone(storage, url, &entry.name)?;
                    self.switch_bridged(&checkout, &entry.pin)?;
                } else {
                    self.vcs
                        .svn_checkout(storage, url, &entry.name, entry.pin.svn_revision())?;
                }
            }
            (VcsKind::Distributed, CheckoutState::Present(WorkingCopy::Git)) => {
                if self.options.reset {
                    self.discard_changes(&checkout)?;
                }
                self.switch(&checkout, &entry.pin)?;
            }
            (VcsKind::Centralized, CheckoutState::Present(WorkingCopy::Git)) => {
                // git svn has no separate fetch step, local changes would
                // make the rebase fail.
                self.vcs.reset_hard(&checkout)?;
                if self.options.reset {
                    self.vcs.clean(&checkout);
                }
                self.switch_bridged(&checkout, &entry.pin)?;
            }
            (_, CheckoutState::Present(WorkingCopy::Svn)) => {
                self.vcs.svn_revert(&checkout)?;
                self.vcs.svn_update(&checkout, entry.pin.svn_revision())?;
            }
        }
        Ok(checkout)
    }

    fn discard_changes(&self, checkout: &Path) -> Result<()> {
        log::info!("Discarding local changes in {}", checkout.display());
        self.vcs.reset_hard(checkout)?;
        self.vcs.clean(checkout);
        Ok(())
    }

    /// Fetch, then move a native checkout to its pin.
    fn switch(&self, checkout: &Path, pin: &Pin) -> Result<()> {
        self.vcs.fetch_all(checkout)?;
        match pin {
            Pin::Tag(tag) => self.vcs.checkout(checkout, tag),
            Pin::Branch { name, r#ref } => {
                self.vcs.checkout(checkout, name)?;
                self.vcs.pull(checkout, name)?;
                match r#ref {
                    Some(_) => self.checkout_ref(checkout, name, pin),
                    None => Ok(()),
                }
            }
        }
    }

    /// Sync a git-svn checkout and move it to its pin.
    fn switch_bridged(&self, checkout: &Path, pin: &Pin) -> Result<()> {
        self.vcs.git_svn_rebase(checkout)?;
        match pin {
            Pin::Branch {
                name,
                r#ref: Some(_),
            } => self.checkout_ref(checkout, name, pin),
            _ => Ok(()),
        }
    }

    fn checkout_ref(&self, checkout: &Path, branch: &str, pin: &Pin) -> Result<()> {
        let target = match (pin.svn_revision(), pin) {
            (Some(revision), _) => {
                revision::translate(&self.vcs, self.cache, checkout, branch, revision)?
            }
            (
                None,
                Pin::Branch {
                    r#ref: Some(commit),
                    ..
                },
            ) => commit.clone(),
            _ => return Ok(()),
        };
        self.vcs.checkout(checkout, &target)
    }
}
