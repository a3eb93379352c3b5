//! Path manipulation utilities for git-externals
//!
//! Manifest paths are written POSIX-style (`./`, trailing `/` for
//! directories) and are never touched on disk before they are compared, so
//! everything here works lexically.

use std::path::{Component, Path, PathBuf};

use url::Url;

use crate::error::{Error, Result};

/// Lexically normalize a path: drop `.` components and fold `..` into the
/// preceding component where possible.
///
/// Unlike `fs::canonicalize` this never touches the filesystem, so it works
/// for destinations that do not exist yet.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(
                    out.components().next_back(),
                    Some(Component::Normal(_))
                );
                if can_pop {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Remove leading `./` markers from a manifest path.
pub fn strip_current_dir(path: &str) -> &str {
    let mut rest = path;
    while let Some(stripped) = rest.strip_prefix("./") {
        rest = stripped;
    }
    rest
}

/// Whether a target source denotes the whole tree of the external.
pub fn is_whole_tree(source: &str) -> bool {
    normalize(Path::new(source)).as_os_str().is_empty() || source == "/"
}

/// Number of normal components in a (relative) destination.
pub fn depth(path: &Path) -> usize {
    path.components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .count()
}

/// Whether `path` equals `base` or lives underneath it.
pub fn is_within(path: &Path, base: &Path) -> bool {
    path.starts_with(base)
}

/// Whether a repository reference is relative to the declaring repository.
pub fn is_relative_reference(reference: &str) -> bool {
    reference.starts_with("./") || reference.starts_with("../")
}

/// Resolve a relative repository reference against the origin remote of the
/// repository declaring it.
///
/// The origin is treated as a directory, so `../libX.git` next to
/// `https://host/group/app.git` becomes `https://host/group/libX.git`.
/// URL-shaped origins go through `url::Url::join`; scp-style origins
/// (`git@host:group/app.git`) and plain paths are folded segment by segment.
pub fn join_reference(origin: &str, reference: &str) -> Result<String> {
    let origin = origin.trim().trim_end_matches('/');
    if let Ok(base) = Url::parse(&format!("{}/", origin)) {
        if !base.cannot_be_a_base() {
            let joined = base.join(reference).map_err(|e| Error::Reference {
                reference: reference.to_string(),
                message: e.to_string(),
            })?;
            return Ok(joined.to_string());
        }
    }

    // scp-like syntax: keep the "user@host:" prefix out of the folding.
    let (prefix, path) = match origin.find(':') {
        Some(idx) if !origin[..idx].contains('/') => origin.split_at(idx + 1),
        _ => ("", origin),
    };

    let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    for part in reference.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(Error::Reference {
                        reference: reference.to_string(),
                        message: format!("climbs above the root of {}", origin),
                    });
                }
            }
            other => segments.push(other),
        }
    }

    let leading = if path.starts_with('/') { "/" } else { "" };
    Ok(format!("{}{}{}", prefix, leading, segments.join("/")))
}
