//! # Link Projection
//!
//! Makes the content of each checkout appear at its declared destinations by
//! way of symbolic links.
//!
//! ## Ordering
//!
//! Destinations may nest: `vendor/libX` can be a link into one external
//! while `vendor/libX/plugins` belongs to another. Links are therefore sorted
//! by `(depth, path)`:
//!
//! - existing links are removed deepest first, so a parent is never removed
//!   while a child link still lives underneath it;
//! - links are created shallowest first, so a directory link exists before
//!   anything is placed inside it.
//!
//! ## Stale links
//!
//! Destinations projected by a previous run but no longer declared are
//! removed by [`remove_stale`], again deepest first. Only symbolic links are
//! touched there; anything else at such a path belongs to the user.
//!
//! ## Overlap
//!
//! Two different `(external, source)` pairs may not claim the same
//! destination in one manifest; [`plan`] rejects such manifests before
//! anything is touched.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};
use crate::manifest::Manifest;
use crate::path;

/// One projected `source -> destination` mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Reference of the external owning the link.
    pub owner: String,
    /// Absolute path inside the checkout.
    pub source: PathBuf,
    /// Normalized destination, relative to the declaring repository.
    pub destination: PathBuf,
}

impl Link {
    fn sort_key(&self) -> (usize, &Path) {
        (path::depth(&self.destination), &self.destination)
    }
}

/// Sort links ascending by destination depth, then path.
pub fn sort_links(links: &mut [Link]) {
    links.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
}

/// Links in the order existing destinations must be removed (deepest first).
pub fn removal_order(links: &[Link]) -> Vec<&Link> {
    let mut ordered: Vec<&Link> = links.iter().collect();
    ordered.sort_by(|a, b| b.sort_key().cmp(&a.sort_key()));
    ordered
}

/// Links in the order they must be created (shallowest first).
pub fn creation_order(links: &[Link]) -> Vec<&Link> {
    let mut ordered: Vec<&Link> = links.iter().collect();
    ordered.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    ordered
}

/// Compute every link of `manifest`, with checkouts living in `storage`.
///
/// Fails if a destination leaves the repository or is claimed twice.
pub fn plan(storage: &Path, manifest: &Manifest) -> Result<Vec<Link>> {
    let mut claimed: HashMap<PathBuf, String> = HashMap::new();
    let mut links = Vec::new();

    for entry in manifest.iter() {
        let checkout = storage.join(&entry.name);
        for (src, dst) in entry.target_pairs() {
            let destination = path::normalize(Path::new(dst));
            check_destination(&destination, dst)?;

            let claimant = format!("{} ({})", entry.reference, src);
            if let Some(first) = claimed.get(&destination) {
                return Err(Error::OverlappingDestination {
                    destination: destination.display().to_string(),
                    first: first.clone(),
                    second: claimant,
                });
            }
            claimed.insert(destination.clone(), claimant);

            links.push(Link {
                owner: entry.reference.clone(),
                source: path::normalize(&checkout.join(src)),
                destination,
            });
        }
    }

    sort_links(&mut links);
    Ok(links)
}

fn check_destination(destination: &Path, declared: &str) -> Result<()> {
    let escapes = destination.as_os_str().is_empty()
        || destination
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
    if escapes {
        return Err(Error::Link {
            path: PathBuf::from(declared),
            message: "destination must be a path inside the repository".to_string(),
        });
    }
    Ok(())
}

/// Replace whatever exists at each destination under `root` with a fresh
/// link to its source.
pub fn project(root: &Path, links: &[Link]) -> Result<()> {
    for link in removal_order(links) {
        remove_existing(&root.join(&link.destination))?;
    }
    for link in creation_order(links) {
        create_link(&link.source, &root.join(&link.destination))?;
    }
    Ok(())
}

/// Remove the links of `previous` destinations that are not part of
/// `planned`, deepest first, together with the directories left empty
/// between them and `root`. Returns the removed destinations.
pub fn remove_stale<S: AsRef<str>>(
    root: &Path,
    previous: &[S],
    planned: &[Link],
) -> Result<Vec<PathBuf>> {
    let mut stale: Vec<PathBuf> = previous
        .iter()
        .map(|p| path::normalize(Path::new(p.as_ref())))
        .filter(|p| check_destination(p, "").is_ok())
        .filter(|p| !planned.iter().any(|link| &link.destination == p))
        .collect();
    stale.sort_by(|a, b| (path::depth(b), b).cmp(&(path::depth(a), a)));
    stale.dedup();

    let mut removed = Vec::new();
    for destination in stale {
        let full = root.join(&destination);
        let is_link = fs::symlink_metadata(&full)
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false);
        if !is_link {
            continue;
        }
        log::info!("Removing stale link {}", destination.display());
        remove_existing(&full)?;
        prune_empty_parents(root, &full);
        removed.push(destination);
    }
    Ok(removed)
}

fn prune_empty_parents(root: &Path, path: &Path) {
    let mut current = path.parent();
    while let Some(dir) = current {
        if dir == root || !dir.starts_with(root) {
            break;
        }
        // Fails on non-empty directories, which ends the walk.
        if fs::remove_dir(dir).is_err() {
            break;
        }
        current = dir.parent();
    }
}

/// Remove a link, file or empty directory. Missing paths are fine.
fn remove_existing(path: &Path) -> Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    if meta.file_type().is_symlink() {
        log::debug!("Removing link {}", path.display());
        // Directory symlinks are directories on Windows.
        fs::remove_file(path).or_else(|_| fs::remove_dir(path))?;
    } else if meta.is_dir() {
        fs::remove_dir(path).map_err(|e| Error::Link {
            path: path.to_path_buf(),
            message: format!("refusing to replace a non-empty directory ({})", e),
        })?;
    } else {
        fs::remove_file(path)?;
    }
    Ok(())
}

fn create_link(source: &Path, destination: &Path) -> Result<()> {
    if !source.exists() {
        return Err(Error::Link {
            path: destination.to_path_buf(),
            message: format!("source {} does not exist", source.display()),
        });
    }
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }

    log::debug!("Linking {} -> {}", destination.display(), source.display());

    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(source, destination)?;
    }
    #[cfg(windows)]
    {
        if source.is_dir() {
            std::os::windows::fs::symlink_dir(source, destination)?;
        } else {
            std::os::windows::fs::symlink_file(source, destination)?;
        }
    }
    Ok(())
}
