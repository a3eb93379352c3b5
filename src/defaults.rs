//! Default values for git-externals.
//!
//! This module provides the fixed names and locations used across the
//! library and commands, ensuring consistency and avoiding duplication.

use std::path::{Path, PathBuf};

/// Name of the manifest file declaring the externals of a directory.
pub const MANIFEST_FILENAME: &str = "git_externals.json";

/// Directory, relative to a repository root, holding one checkout per external.
pub const EXTERNALS_DIR: &str = ".git/externals";

/// Local, non-committed exclude list of a repository.
pub const EXCLUDE_FILE: &str = ".git/info/exclude";

/// Prefix marking a `ref` as a centralized (svn) revision number.
pub const SVN_REVISION_MARKER: &str = "svn:";

/// Default program used for distributed VCS commands.
pub const DEFAULT_GIT: &str = "git";

/// Default program used for centralized VCS commands.
pub const DEFAULT_SVN: &str = "svn";

/// Returns the path of the manifest inside `root`.
pub fn manifest_path(root: &Path) -> PathBuf {
    root.join(MANIFEST_FILENAME)
}

/// Returns the externals storage directory of the repository at `root`.
pub fn externals_root(root: &Path) -> PathBuf {
    root.join(EXTERNALS_DIR)
}

/// Returns the exclude file of the repository at `root`.
pub fn exclude_path(root: &Path) -> PathBuf {
    root.join(EXCLUDE_FILE)
}
