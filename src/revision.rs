//! # Centralized Revision Translation
//!
//! A branch pin may carry a `ref` of the form `svn:<N>`, naming a revision of
//! the centralized repository the external was converted from (or is bridged
//! to). Before it can be checked out it has to be mapped to a commit.
//!
//! ## Strategy
//!
//! 1. On a git-svn bridged checkout, ask `git svn find-rev`.
//! 2. Search the branch history for a commit whose message carries the exact
//!    `git-svn-id: <url>@<N>` marker.
//! 3. Fall back to scanning every commit message of the branch and pick the
//!    newest commit whose embedded revision is not greater than `N`. This
//!    handles revisions that did not touch the converted path.
//!
//! The fallback is a linear scan over the whole branch history. Results are
//! memoised per invocation in a [`RevisionCache`].

use std::path::Path;

use regex::Regex;

use crate::cache::{RevisionCache, RevisionKey};
use crate::error::{Error, Result};
use crate::vcs::Vcs;

const SVN_ID_PATTERN: &str = r"git-svn-id:\s*\S+@(\d+)";

/// Revision number embedded in a commit message, if any.
pub fn embedded_revision(re: &Regex, message: &str) -> Option<u64> {
    re.captures(message)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Map revision `revision` of `branch` to a commit of the checkout.
pub fn translate(
    vcs: &Vcs<'_>,
    cache: &RevisionCache,
    checkout: &Path,
    branch: &str,
    revision: &str,
) -> Result<String> {
    let key = RevisionKey::new(checkout, branch, revision);
    cache.get_or_resolve(key, || lookup(vcs, checkout, branch, revision))
}

fn lookup(vcs: &Vcs<'_>, checkout: &Path, branch: &str, revision: &str) -> Result<String> {
    let not_found = || Error::RevisionNotFound {
        checkout: checkout.to_path_buf(),
        branch: branch.to_string(),
        revision: revision.to_string(),
    };
    let wanted: u64 = revision.trim().parse().map_err(|_| not_found())?;

    if checkout.join(".git").join("svn").is_dir() {
        match vcs.git_svn_find_rev(checkout, revision) {
            Ok(Some(commit)) => return Ok(commit),
            Ok(None) => {}
            Err(e) => log::debug!("git svn find-rev r{} failed: {}", revision, e),
        }
    }

    let pattern = format!("git-svn-id: [^ ]+@{}( |$)", wanted);
    if let Some(commit) = vcs.log_grep(checkout, branch, &pattern)?.into_iter().next() {
        return Ok(commit);
    }

    log::debug!(
        "No commit carries revision {} directly, scanning the history of {}",
        wanted,
        branch
    );
    let re = Regex::new(SVN_ID_PATTERN)?;
    vcs.log_bodies(checkout, branch)?
        .into_iter()
        .find(|(_, body)| embedded_revision(&re, body).is_some_and(|rev| rev <= wanted))
        .map(|(sha, _)| sha)
        .ok_or_else(not_found)
}
