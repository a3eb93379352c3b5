//! Restricting a nested manifest to what the parent actually uses.
//!
//! When an external is itself a repository with externals, only the nested
//! entries whose destinations fall under one of the sources the parent
//! projects are resolved. An external mapping `include/` from `libX` will
//! not pull in the test dependencies `libX` declares for `tests/vendor`.
//!
//! Paths are compared after resolving symbolic links that exist on disk, so
//! a source such as `include/` that is itself a link to `src/include` covers
//! destinations declared under either spelling. The last component of a
//! destination is never resolved: after a previous run it is usually a link
//! into the nested storage.

use std::fs;
use std::path::{Path, PathBuf};

use crate::manifest::{ExternalEntry, Manifest};
use crate::path;

/// The parts of one checkout that its parent projects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    roots: Vec<PathBuf>,
}

impl Scope {
    /// Scope of `entry`'s targets inside its `checkout`.
    pub fn for_external(checkout: &Path, entry: &ExternalEntry) -> Self {
        let mut roots: Vec<PathBuf> = Vec::new();
        for src in entry.targets.keys() {
            let lexical = path::normalize(&checkout.join(src));
            let real = real_path(&lexical);
            for root in [lexical, real] {
                if !roots.contains(&root) {
                    roots.push(root);
                }
            }
        }
        Self { roots }
    }

    /// Whether `path` lies within one of the projected sources.
    pub fn contains(&self, path: &Path) -> bool {
        let lexical = path::normalize(path);
        let real = match (lexical.parent(), lexical.file_name()) {
            (Some(parent), Some(name)) => real_path(parent).join(name),
            _ => real_path(&lexical),
        };
        self.roots
            .iter()
            .any(|root| path::is_within(&lexical, root) || path::is_within(&real, root))
    }

    /// Keep the targets of `manifest` (declared in `checkout`) whose
    /// destination is in scope; entries left without targets are dropped.
    pub fn apply(&self, checkout: &Path, manifest: &Manifest) -> Manifest {
        let mut scoped = Manifest::new();
        for entry in manifest.iter() {
            let mut entry = entry.clone();
            for dsts in entry.targets.values_mut() {
                dsts.retain(|dst| self.contains(&checkout.join(dst)));
            }
            entry.targets.retain(|_, dsts| !dsts.is_empty());

            if entry.targets.is_empty() {
                log::debug!("{} is out of scope in {}", entry.reference, checkout.display());
            } else {
                scoped.insert(entry);
            }
        }
        scoped
    }
}

/// Resolve the symbolic links in the longest existing prefix of `path`;
/// the rest is appended as written.
fn real_path(path: &Path) -> PathBuf {
    let mut existing = path;
    let mut rest: Vec<&std::ffi::OsStr> = Vec::new();
    loop {
        if let Ok(real) = fs::canonicalize(existing) {
            return rest.iter().rev().fold(real, |acc, part| acc.join(part));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                rest.push(name);
                existing = parent;
            }
            _ => return path.to_path_buf(),
        }
    }
}
