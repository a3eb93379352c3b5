//! # Externals Traversal
//!
//! Read-only walk over the externals forest as it currently exists on disk.
//! Nothing is fetched: nested manifests are only discovered inside checkouts
//! that already exist. The walk follows the same scoping and ordering as an
//! update, so it is what the sanity check, `status`, `diff`, `info`, `list`
//! and `foreach` iterate over.

use std::path::{Path, PathBuf};

use crate::defaults::externals_root;
use crate::error::{Error, Result};
use crate::manifest::{ExternalEntry, Manifest};
use crate::resolver::resolve_reference;
use crate::scope::Scope;
use crate::vcs::{Vcs, WorkingCopy};

/// One declaration of an external encountered during the walk.
#[derive(Debug, Clone)]
pub struct Visit {
    /// Resolved reference, the identity used for pin consistency and cycles.
    pub reference: String,
    /// The entry as declared (after scoping).
    pub entry: ExternalEntry,
    /// Directory whose manifest declares the entry.
    pub declared_in: PathBuf,
    /// Where the checkout lives (or would live).
    pub checkout: PathBuf,
    /// Whether the checkout exists.
    pub exists: bool,
    /// Nesting level, 0 for the root manifest.
    pub depth: usize,
}

impl Visit {
    /// `declared_in` relative to `root`, `.` for the root itself.
    pub fn site(&self, root: &Path) -> String {
        match self.declared_in.strip_prefix(root) {
            Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
            Ok(rel) => rel.display().to_string(),
            Err(_) => self.declared_in.display().to_string(),
        }
    }
}

/// Chain of resolved references from the root down to the current level.
#[derive(Debug, Clone, Default)]
pub struct Chain {
    references: Vec<String>,
}

impl Chain {
    /// Fail if `reference` already appears in the chain.
    pub fn check(&self, reference: &str) -> Result<()> {
        match self.references.iter().position(|r| r == reference) {
            Some(start) => {
                let mut cycle: Vec<&str> = self.references[start..]
                    .iter()
                    .map(String::as_str)
                    .collect();
                cycle.push(reference);
                Err(Error::CycleDetected {
                    cycle: cycle.join(" -> "),
                })
            }
            None => Ok(()),
        }
    }

    pub fn push(&mut self, reference: String) {
        self.references.push(reference);
    }

    pub fn pop(&mut self) {
        self.references.pop();
    }
}

/// Walk the externals declared at `root`, descending into existing git
/// checkouts when `recursive` is set.
pub fn walk(vcs: &Vcs<'_>, root: &Path, recursive: bool) -> Result<Vec<Visit>> {
    let manifest = Manifest::load(root)?;
    let mut chain = Chain::default();
    let mut visits = Vec::new();
    walk_level(vcs, root, &manifest, recursive, 0, &mut chain, &mut visits)?;
    Ok(visits)
}

fn walk_level(
    vcs: &Vcs<'_>,
    dir: &Path,
    manifest: &Manifest,
    recursive: bool,
    depth: usize,
    chain: &mut Chain,
    visits: &mut Vec<Visit>,
) -> Result<()> {
    let storage = externals_root(dir);
    for entry in manifest.iter() {
        let reference = resolve_reference(vcs, dir, &entry.reference)?;
        chain.check(&reference)?;

        let checkout = storage.join(&entry.name);
        let kind = WorkingCopy::detect(&checkout);
        visits.push(Visit {
            reference: reference.clone(),
            entry: entry.clone(),
            declared_in: dir.to_path_buf(),
            checkout: checkout.clone(),
            exists: kind.is_some(),
            depth,
        });

        if recursive && kind == Some(WorkingCopy::Git) {
            let declared = Manifest::load(&checkout)?;
            let nested = Scope::for_external(&checkout, entry).apply(&checkout, &declared);
            if !nested.is_empty() {
                chain.push(reference);
                walk_level(vcs, &checkout, &nested, recursive, depth + 1, chain, visits)?;
                chain.pop();
            }
        }
    }
    Ok(())
}
