//! Shared test utilities for E2E tests.
//!
//! This module provides fixtures and manifest snippets to reduce duplication
//! across test files.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::repository().with_manifest(manifests::SINGLE_BRANCH);
//!     fixture.command().arg("info").assert().code(4);
//! }
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    #[allow(unused_imports)]
    pub use assert_cmd::cargo::cargo_bin_cmd;
    #[allow(unused_imports)]
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::manifests;
    pub use super::TestFixture;
}

/// Manifest snippets used across tests.
#[allow(dead_code)]
pub mod manifests {
    /// One external following a branch, linked as a whole.
    pub const SINGLE_BRANCH: &str = r#"{
    "https://example.com/libX.git": {
        "branch": "master",
        "targets": {
            "./": ["vendor/libX"]
        }
    }
}
"#;

    /// One external pinned to a tag, with two mappings.
    pub const TAGGED: &str = r#"{
    "https://example.com/libY.git": {
        "tag": "v1.0",
        "targets": {
            "include/": ["inc/libY"],
            "src/": ["src/libY"]
        }
    }
}
"#;

    /// An entry declaring both a branch and a tag.
    pub const BRANCH_AND_TAG: &str = r#"{
    "https://example.com/libX.git": {
        "branch": "master",
        "tag": "v1",
        "targets": {
            "./": ["vendor/libX"]
        }
    }
}
"#;

    /// Not JSON at all.
    pub const INVALID_JSON: &str = "{ unclosed";
}

/// A temporary directory laid out like a repository root.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    /// Create an empty temporary directory, not a repository.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Create a temporary directory with a `.git` metadata directory.
    pub fn repository() -> Self {
        let fixture = Self::new();
        fixture
            .temp_dir
            .child(".git")
            .create_dir_all()
            .expect("Failed to create .git");
        fixture
    }

    /// Write `git_externals.json` at the root.
    pub fn with_manifest(self, content: &str) -> Self {
        self.with_file("git_externals.json", content)
    }

    /// Create the externals storage directory.
    #[allow(dead_code)]
    pub fn initialized(self) -> Self {
        self.temp_dir
            .child(".git/externals")
            .create_dir_all()
            .expect("Failed to create externals storage");
        self
    }

    /// Create a fake checkout at `<dir>/.git/externals/<name>`, optionally
    /// declaring its own externals, and return its path.
    #[allow(dead_code)]
    pub fn checkout(&self, dir: &Path, name: &str, manifest: Option<&str>) -> PathBuf {
        let checkout = dir.join(".git/externals").join(name);
        std::fs::create_dir_all(checkout.join(".git")).expect("Failed to create checkout");
        if let Some(content) = manifest {
            std::fs::write(checkout.join("git_externals.json"), content)
                .expect("Failed to write nested manifest");
        }
        checkout
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Get the path to the manifest.
    #[allow(dead_code)]
    pub fn manifest_path(&self) -> PathBuf {
        self.temp_dir.path().join("git_externals.json")
    }

    /// Create a child path in the temp directory.
    #[allow(dead_code)]
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// Create a command configured to run in this fixture's directory.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("git-externals");
        cmd.current_dir(self.path());
        cmd.env_remove("RUST_LOG")
            .env_remove("GIT_EXTERNALS_GIT")
            .env_remove("GIT_EXTERNALS_SVN");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_fixture_has_git_dir() {
        let fixture = TestFixture::repository();
        assert!(fixture.path().join(".git").is_dir());
    }

    #[test]
    fn test_manifests_are_valid_json() {
        for manifest in [manifests::SINGLE_BRANCH, manifests::TAGGED, manifests::BRANCH_AND_TAG] {
            serde_json::from_str::<serde_json::Value>(manifest).expect("Manifest should be JSON");
        }
        assert!(serde_json::from_str::<serde_json::Value>(manifests::INVALID_JSON).is_err());
    }
}
