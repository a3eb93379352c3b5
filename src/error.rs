//! # Error Handling
//!
//! This module defines the centralized error type for `git-externals`. It uses
//! `thiserror` to build a single `Error` enum covering every failure the
//! library can report, each variant carrying enough context to print a
//! complete message without consulting anything else.
//!
//! ## Key Components
//!
//! - **`Error`**: every failure mode of the library, grouped into
//!   configuration errors (manifest problems, inconsistent pins, overlapping
//!   destinations, cycles), VCS command errors, the local-modification guard,
//!   and wrapped I/O / JSON errors.
//!
//! - **`Result<T>`**: alias for `std::result::Result<T, Error>`.
//!
//! - **`exit_codes`**: the process exit codes the binary uses. The library
//!   never exits by itself; the command layer calls [`Error::exit_code`] once
//!   an error has bubbled all the way up.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Process exit codes used by the `git-externals` binary.
pub mod exit_codes {
    /// The command completed successfully.
    pub const SUCCESS: i32 = 0;
    /// Any failure without a more specific code.
    pub const ERROR: i32 = 1;
    /// Invalid command-line usage (reported by clap).
    pub const USAGE: i32 = 2;
    /// `git_externals.json` does not exist in the working directory.
    pub const MISSING_MANIFEST: i32 = 3;
    /// The externals storage directory does not exist yet.
    pub const NOT_INITIALIZED: i32 = 4;
    /// The same external is pinned differently in different places.
    pub const INCONSISTENT_PINS: i32 = 5;
    /// One or more working trees carry local modifications.
    pub const DIRTY_WORKING_TREE: i32 = 6;
    /// Externals reference each other in a loop.
    pub const CYCLE: i32 = 7;
}

/// One place where an external is declared, together with its pin.
///
/// Used to report every site participating in a pin conflict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinSite {
    /// Directory (relative to the root) whose manifest declares the external.
    pub path: String,
    /// Human-readable pin, e.g. `tag v1` or `branch master @ 1a2b3c`.
    pub pin: String,
}

/// A group of conflicting declarations for one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinConflict {
    /// The repository reference shared by all sites.
    pub reference: String,
    /// Every declaration of the reference, in traversal order.
    pub sites: Vec<PinSite>,
}

impl fmt::Display for PinConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reference)?;
        for site in &self.sites {
            write!(f, "\n    {}: {}", site.path, site.pin)?;
        }
        Ok(())
    }
}

fn format_conflicts(conflicts: &[PinConflict]) -> String {
    conflicts
        .iter()
        .map(|c| format!("  {}", c))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("  {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Main error type for git-externals operations
#[derive(Error, Debug)]
pub enum Error {
    /// The manifest exists but could not be understood.
    ///
    /// This error includes the specific issue and optionally a hint about how
    /// to fix it.
    #[error("Manifest error in {}: {message}{}", path.display(), hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ManifestParse {
        path: PathBuf,
        message: String,
        /// Optional hint for how to fix the manifest
        hint: Option<String>,
    },

    /// A command required the manifest but none was found.
    #[error("Unable to find {}", path.display())]
    ManifestNotFound { path: PathBuf },

    /// A command needs checkouts that were never created.
    #[error("Externals storage {} does not exist: run `git externals update` first", path.display())]
    NotInitialized { path: PathBuf },

    /// The directory is not the root of a git working tree.
    #[error("{} is not a git repository", path.display())]
    NotARepository { path: PathBuf },

    /// A version-control process exited unsuccessfully or could not start.
    #[error("{program} {} failed (exit code {}) in {}: {}", args.join(" "), code.map(|c| c.to_string()).unwrap_or_else(|| "none".to_string()), cwd.display(), stderr.trim_end())]
    Command {
        program: String,
        args: Vec<String>,
        cwd: PathBuf,
        /// Exit code of the child, `None` when it was killed by a signal or
        /// never started.
        code: Option<i32>,
        stderr: String,
    },

    /// The same external is pinned to different refs in different places.
    #[error("Inconsistent pins for the same external:\n{}", format_conflicts(conflicts))]
    InconsistentPins { conflicts: Vec<PinConflict> },

    /// `add` tried to change the pin of an existing external.
    #[error("{reference} is bound to {current}, cannot set it to {requested}")]
    PinMismatch {
        reference: String,
        current: String,
        requested: String,
    },

    /// Two externals of one manifest project onto the same destination.
    #[error("Destination {destination} is claimed by both {first} and {second}")]
    OverlappingDestination {
        destination: String,
        first: String,
        second: String,
    },

    /// Working trees with local modifications block a non-destructive update.
    #[error("Cannot update: local modifications in\n{}\nRun `git externals status` for details, or pass --reset to discard them", format_paths(paths))]
    DirtyWorkingTree { paths: Vec<PathBuf> },

    /// A circular reference between externals was detected.
    #[error("Cycle detected in externals: {cycle}")]
    CycleDetected { cycle: String },

    /// A centralized revision could not be mapped to a commit.
    #[error("Unable to find a commit for revision {revision} on {branch} in {}", checkout.display())]
    RevisionNotFound {
        checkout: PathBuf,
        branch: String,
        revision: String,
    },

    /// A link could not be removed or created.
    #[error("Link operation error at {}: {message}", path.display())]
    Link { path: PathBuf, message: String },

    /// A relative reference could not be resolved against the origin remote.
    #[error("Cannot resolve relative reference {reference}: {message}")]
    Reference { reference: String, message: String },

    /// An error indicating that a mutex or other lock has been poisoned.
    #[error("Lock poisoned: {context}")]
    LockPoisoned { context: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A regular expression failed to compile.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl Error {
    /// The process exit code this error should terminate the binary with.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::ManifestNotFound { .. } => exit_codes::MISSING_MANIFEST,
            Error::NotInitialized { .. } => exit_codes::NOT_INITIALIZED,
            Error::InconsistentPins { .. } | Error::PinMismatch { .. } => {
                exit_codes::INCONSISTENT_PINS
            }
            Error::DirtyWorkingTree { .. } => exit_codes::DIRTY_WORKING_TREE,
            Error::CycleDetected { .. } => exit_codes::CYCLE,
            Error::Command { code, .. } => match code {
                Some(c) if (1..=255).contains(c) => *c,
                _ => exit_codes::ERROR,
            },
            _ => exit_codes::ERROR,
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
