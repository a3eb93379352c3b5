//! Version-control operations built on top of the [`CommandRunner`].
//!
//! This uses the system `git` and `svn` commands, which automatically handle
//! SSH keys, credential helpers and any authentication configured for them.
//! Every function takes the directory it operates in.

use std::fs;
use std::path::{Path, PathBuf};

use crate::defaults::{DEFAULT_GIT, DEFAULT_SVN, MANIFEST_FILENAME};
use crate::error::Result;
use crate::path;
use crate::runner::{CommandRunner, OutputMode};

/// Programs used for each backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tools {
    /// The `git` executable.
    pub git: String,
    /// The `svn` executable.
    pub svn: String,
}

impl Default for Tools {
    fn default() -> Self {
        Self {
            git: DEFAULT_GIT.to_string(),
            svn: DEFAULT_SVN.to_string(),
        }
    }
}

/// Kind of working copy found on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkingCopy {
    /// A git (or git-svn) repository.
    Git,
    /// A plain svn checkout.
    Svn,
}

impl WorkingCopy {
    /// Detect the working copy at `dir`, if any.
    pub fn detect(dir: &Path) -> Option<Self> {
        if dir.join(".git").exists() {
            Some(WorkingCopy::Git)
        } else if dir.join(".svn").exists() {
            Some(WorkingCopy::Svn)
        } else {
            None
        }
    }
}

/// Thin facade over the runner that knows the git and svn command lines.
#[derive(Clone, Copy)]
pub struct Vcs<'a> {
    runner: &'a dyn CommandRunner,
    tools: &'a Tools,
}

impl<'a> Vcs<'a> {
    pub fn new(runner: &'a dyn CommandRunner, tools: &'a Tools) -> Self {
        Self { runner, tools }
    }

    /// Run an arbitrary program in `cwd`.
    pub fn run(&self, cwd: &Path, program: &str, args: &[&str], mode: OutputMode) -> Result<String> {
        self.runner.run(cwd, program, args, mode)
    }

    /// Run git in capture mode.
    pub fn git(&self, cwd: &Path, args: &[&str]) -> Result<String> {
        self.runner.run(cwd, &self.tools.git, args, OutputMode::Capture)
    }

    /// Run git with output passed through to the terminal.
    pub fn git_stream(&self, cwd: &Path, args: &[&str]) -> Result<()> {
        self.runner
            .run(cwd, &self.tools.git, args, OutputMode::Stream)
            .map(|_| ())
    }

    /// Run svn in capture mode.
    pub fn svn(&self, cwd: &Path, args: &[&str]) -> Result<String> {
        self.runner.run(cwd, &self.tools.svn, args, OutputMode::Capture)
    }

    /// Run svn with output passed through to the terminal.
    pub fn svn_stream(&self, cwd: &Path, args: &[&str]) -> Result<()> {
        self.runner
            .run(cwd, &self.tools.svn, args, OutputMode::Stream)
            .map(|_| ())
    }

    // ---- git --------------------------------------------------------------

    /// Full clone of `url` into `storage/name`.
    pub fn clone(&self, storage: &Path, url: &str, name: &str) -> Result<PathBuf> {
        self.git_stream(storage, &["clone", url, name])?;
        Ok(storage.join(name))
    }

    /// Sparse checkout of `url` into `storage/name`, restricted to `paths`
    /// plus the manifest so nested externals stay discoverable.
    pub fn sparse_clone(
        &self,
        storage: &Path,
        url: &str,
        name: &str,
        paths: &[&str],
        ref_name: &str,
    ) -> Result<PathBuf> {
        self.git(storage, &["init", name])?;
        let checkout = storage.join(name);

        self.git_stream(&checkout, &["remote", "add", "-f", "origin", url])?;
        self.git(&checkout, &["config", "core.sparsecheckout", "true"])?;

        let info = checkout.join(".git").join("info");
        fs::create_dir_all(&info)?;
        fs::write(info.join("sparse-checkout"), sparse_patterns(paths))?;

        self.git_stream(&checkout, &["pull", "origin", ref_name])?;
        Ok(checkout)
    }

    /// Fetch every remote branch and tag.
    pub fn fetch_all(&self, checkout: &Path) -> Result<()> {
        self.git_stream(checkout, &["fetch", "--all", "--tags"])
    }

    /// Switch the working tree to a branch, tag or commit.
    pub fn checkout(&self, checkout: &Path, what: &str) -> Result<()> {
        self.git(checkout, &["checkout", what]).map(|_| ())
    }

    /// Fast-forward the current branch from origin.
    pub fn pull(&self, checkout: &Path, branch: &str) -> Result<()> {
        self.git_stream(checkout, &["pull", "origin", branch])
    }

    /// Discard modifications to tracked files.
    pub fn reset_hard(&self, dir: &Path) -> Result<()> {
        self.git(dir, &["reset", "--hard"]).map(|_| ())
    }

    /// Remove untracked and ignored files.
    ///
    /// Failures are logged and ignored: git refuses to remove some nested
    /// repositories, which is harmless here.
    pub fn clean(&self, dir: &Path) {
        if let Err(e) = self.git(dir, &["clean", "-d", "-x", "-f"]) {
            log::warn!("git clean in {} reported: {}", dir.display(), e);
        }
    }

    /// `git status`, machine-readable with `porcelain`.
    pub fn status(&self, dir: &Path, porcelain: bool) -> Result<String> {
        if porcelain {
            self.git(dir, &["status", "--porcelain"])
        } else {
            self.git(dir, &["status"])
        }
    }

    /// `git diff` for display.
    pub fn diff(&self, dir: &Path) -> Result<String> {
        self.git(dir, &["diff"])
    }

    /// Whether tracked files of the repository at `dir` are unmodified.
    pub fn is_clean(&self, dir: &Path) -> Result<bool> {
        let out = self.git(dir, &["status", "--porcelain", "--untracked-files=no"])?;
        Ok(out.trim().is_empty())
    }

    /// URL of the `origin` remote, `None` when it is not configured.
    pub fn origin_url(&self, dir: &Path) -> Option<String> {
        self.git(dir, &["config", "--get", "remote.origin.url"])
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// Commits of `branch` whose message matches the extended regex `pattern`.
    pub fn log_grep(&self, checkout: &Path, branch: &str, pattern: &str) -> Result<Vec<String>> {
        let grep = format!("--grep={}", pattern);
        let out = self.git(
            checkout,
            &["log", "--format=%H", "--extended-regexp", &grep, branch],
        )?;
        Ok(out.lines().map(str::trim).filter(|l| !l.is_empty()).map(String::from).collect())
    }

    /// History of `branch` as `(sha, body)` pairs, newest first.
    pub fn log_bodies(&self, checkout: &Path, branch: &str) -> Result<Vec<(String, String)>> {
        let out = self.git(checkout, &["log", "--format=%x1e%H%n%b", branch])?;
        Ok(out
            .split('\u{1e}')
            .filter_map(|record| {
                let (sha, body) = record.split_once('\n').unwrap_or((record, ""));
                let sha = sha.trim();
                (!sha.is_empty()).then(|| (sha.to_string(), body.to_string()))
            })
            .collect())
    }

    // ---- git-svn ----------------------------------------------------------

    /// Bridged checkout of a centralized repository through git-svn.
    pub fn git_svn_clone(&self, storage: &Path, url: &str, name: &str) -> Result<PathBuf> {
        self.git_stream(storage, &["svn", "clone", url, name])?;
        Ok(storage.join(name))
    }

    /// Pull new svn revisions into a git-svn checkout.
    pub fn git_svn_rebase(&self, checkout: &Path) -> Result<()> {
        self.git_stream(checkout, &["svn", "rebase"])
    }

    /// Ask git-svn for the commit of an svn revision.
    pub fn git_svn_find_rev(&self, checkout: &Path, revision: &str) -> Result<Option<String>> {
        let rev = format!("r{}", revision);
        let out = self.git(checkout, &["svn", "find-rev", &rev])?;
        Ok(Some(out.trim().to_string()).filter(|s| !s.is_empty()))
    }

    // ---- svn --------------------------------------------------------------

    /// Direct svn working copy of `url` into `storage/name`.
    pub fn svn_checkout(
        &self,
        storage: &Path,
        url: &str,
        name: &str,
        revision: Option<&str>,
    ) -> Result<PathBuf> {
        let mut args = vec!["checkout"];
        if let Some(rev) = revision {
            args.extend(["-r", rev]);
        }
        args.extend([url, name]);
        self.svn_stream(storage, &args)?;
        Ok(storage.join(name))
    }

    /// Revert every local change in an svn working copy.
    pub fn svn_revert(&self, checkout: &Path) -> Result<()> {
        self.svn(checkout, &["revert", "-R", "."]).map(|_| ())
    }

    /// Bring an svn working copy to `revision` (or HEAD).
    pub fn svn_update(&self, checkout: &Path, revision: Option<&str>) -> Result<()> {
        let mut args = vec!["update"];
        if let Some(rev) = revision {
            args.extend(["-r", rev]);
        }
        self.svn_stream(checkout, &args)
    }

    /// `svn status` for display.
    pub fn svn_status(&self, checkout: &Path, verbose: bool) -> Result<String> {
        if verbose {
            self.svn(checkout, &["status"])
        } else {
            self.svn(checkout, &["status", "-q"])
        }
    }

    /// Whether an svn working copy has no local modifications.
    pub fn svn_is_clean(&self, checkout: &Path) -> Result<bool> {
        Ok(self.svn_status(checkout, false)?.trim().is_empty())
    }

    // ---- either -----------------------------------------------------------

    /// Whether the working copy at `dir` has no local modifications,
    /// whichever VCS manages it. Directories that are not working copies
    /// count as clean.
    pub fn working_copy_is_clean(&self, dir: &Path) -> Result<bool> {
        match WorkingCopy::detect(dir) {
            Some(WorkingCopy::Git) => self.is_clean(dir),
            Some(WorkingCopy::Svn) => self.svn_is_clean(dir),
            None => Ok(true),
        }
    }
}

/// Content of `.git/info/sparse-checkout` for the given source paths.
///
/// Directories keep their trailing slash so git matches them as
/// directories; the manifest is always included.
pub fn sparse_patterns(paths: &[&str]) -> String {
    let mut out = format!("{}\n", MANIFEST_FILENAME);
    for p in paths {
        let normalized = path::normalize(Path::new(p));
        out.push_str(&normalized.to_string_lossy().replace('\\', "/"));
        if p.ends_with('/') {
            out.push('/');
        }
        out.push('\n');
    }
    out
}
