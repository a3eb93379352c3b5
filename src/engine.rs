//! # Update Engine
//!
//! Orchestrates one `update` invocation:
//!
//! 1. **Sanity check**: walk the externals that already exist on disk and
//!    reject inconsistent pins before anything is fetched.
//! 2. **Guard**: without `reset`, refuse to run while the root repository or
//!    any checkout carries local modifications. With `reset`, the root is
//!    reset instead.
//! 3. **Per level**: plan the links (rejecting overlapping destinations),
//!    resolve every external in manifest order, project the links, write the
//!    exclude list.
//! 4. **Recursion**: descend into each git checkout whose own manifest still
//!    has entries once scoped to what this level projects.
//!
//! Every step is idempotent, so re-running is the recovery path after an
//! interrupted update.

use std::fs;
use std::path::{Path, PathBuf};

use crate::cache::RevisionCache;
use crate::defaults::externals_root;
use crate::error::{Error, Result};
use crate::links;
use crate::manifest::Manifest;
use crate::resolver::{resolve_reference, ResolveOptions, Resolver};
use crate::sanity;
use crate::scope::Scope;
use crate::untrack;
use crate::vcs::{Vcs, WorkingCopy};
use crate::walk::{walk, Chain, Visit};

/// Options of an update run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Descend into the externals of externals.
    pub recursive: bool,
    /// Discard local modifications instead of refusing to run.
    pub reset: bool,
    /// Clone centralized externals through git-svn.
    pub use_bridge: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            reset: false,
            use_bridge: true,
        }
    }
}

/// Drives resolution, projection and recursion for one invocation.
pub struct Engine<'a> {
    vcs: Vcs<'a>,
    options: EngineOptions,
    cache: RevisionCache,
}

impl<'a> Engine<'a> {
    pub fn new(vcs: Vcs<'a>, options: EngineOptions) -> Self {
        Self {
            vcs,
            options,
            cache: RevisionCache::new(),
        }
    }

    /// Bring every external of the repository at `root` up to date.
    pub fn update(&self, root: &Path) -> Result<()> {
        let root = std::path::absolute(root)?;

        let visits = walk(&self.vcs, &root, self.options.recursive)?;
        sanity::check(&root, &visits)?;

        if self.options.reset {
            log::info!("Resetting {}", root.display());
            self.vcs.reset_hard(&root)?;
        } else {
            let dirty = self.dirty_paths(&root, &visits)?;
            if !dirty.is_empty() {
                return Err(Error::DirtyWorkingTree { paths: dirty });
            }
        }

        let manifest = Manifest::load(&root)?;
        let mut chain = Chain::default();
        self.update_level(&root, &manifest, &mut chain)
    }

    /// The root and every existing checkout that has local modifications.
    pub fn dirty_paths(&self, root: &Path, visits: &[Visit]) -> Result<Vec<PathBuf>> {
        let mut candidates = vec![root.to_path_buf()];
        for visit in visits.iter().filter(|v| v.exists) {
            if !candidates.contains(&visit.checkout) {
                candidates.push(visit.checkout.clone());
            }
        }

        let mut dirty = Vec::new();
        for dir in candidates {
            if !self.vcs.working_copy_is_clean(&dir)? {
                dirty.push(dir);
            }
        }
        Ok(dirty)
    }

    fn update_level(&self, dir: &Path, manifest: &Manifest, chain: &mut Chain) -> Result<()> {
        let storage = externals_root(dir);
        let planned = links::plan(&storage, manifest)?;
        let resolver = Resolver::new(
            self.vcs,
            &self.cache,
            ResolveOptions {
                reset: self.options.reset,
                use_bridge: self.options.use_bridge,
            },
        );

        if !manifest.is_empty() {
            fs::create_dir_all(&storage)?;
        }

        let mut resolved = Vec::with_capacity(manifest.len());
        for entry in manifest.iter() {
            let reference = resolve_reference(&self.vcs, dir, &entry.reference)?;
            chain.check(&reference)?;

            log::info!("External {} ({})", entry.name, entry.pin);
            let checkout = resolver.resolve(&storage, &reference, entry)?;
            resolved.push((reference, entry, checkout));
        }

        let previous = untrack::read_exclude(dir)?;
        links::remove_stale(dir, &previous, &planned)?;
        links::project(dir, &planned)?;
        untrack::write_exclude(
            dir,
            planned
                .iter()
                .map(|link| link.destination.to_string_lossy().into_owned()),
        )?;

        if !self.options.recursive {
            return Ok(());
        }

        for (reference, entry, checkout) in resolved {
            if WorkingCopy::detect(&checkout) != Some(WorkingCopy::Git) {
                log::debug!("Not descending into {}", checkout.display());
                continue;
            }
            let declared = Manifest::load(&checkout)?;
            let nested = Scope::for_external(&checkout, entry).apply(&checkout, &declared);
            if nested.is_empty() && untrack::read_exclude(&checkout)?.is_empty() {
                continue;
            }

            chain.push(reference);
            self.update_level(&checkout, &nested, chain)?;
            chain.pop();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::exclude_path;
    use crate::error::exit_codes;
    use crate::manifest::{ExternalEntry, Pin};
    use crate::testing::MockRunner;
    use crate::vcs::Tools;
    use tempfile::TempDir;

    fn repo() -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join(".git")).unwrap();
        temp
    }

    fn declare(dir: &Path, entries: Vec<ExternalEntry>) -> Manifest {
        let mut manifest = Manifest::new();
        for entry in entries {
            manifest.insert(entry);
        }
        manifest.save(dir).unwrap();
        manifest
    }

    fn run(runner: &MockRunner, root: &Path, options: EngineOptions) -> Result<()> {
        let tools = Tools::default();
        Engine::new(Vcs::new(runner, &tools), options).update(root)
    }

    fn position(lines: &[String], line: &str) -> usize {
        lines
            .iter()
            .position(|l| l == line)
            .unwrap_or_else(|| panic!("{line} not found in {lines:?}"))
    }

    #[test]
    fn test_first_update_clones_links_and_excludes() {
        let temp = repo();
        let root = temp.path();
        declare(
            root,
            vec![ExternalEntry::new("proj/libX.git", Pin::branch("master"))
                .with_target("./", "vendor/libX")],
        );
        let runner = MockRunner::new();
        runner.add_repo("proj/libX.git", &[("README", "libX")]);

        run(&runner, root, EngineOptions::default()).unwrap();

        let lines = runner.command_lines();
        let clone = position(&lines, "git clone proj/libX.git libX");
        let checkout = position(&lines, "git checkout master");
        assert!(clone < checkout);
        assert_eq!(runner.count("sparsecheckout"), 0);

        let storage = externals_root(root);
        assert_eq!(
            fs::read_link(root.join("vendor/libX")).unwrap(),
            storage.join("libX")
        );
        assert_eq!(
            fs::read_to_string(root.join("vendor/libX/README")).unwrap(),
            "libX"
        );
        assert_eq!(
            fs::read_to_string(exclude_path(root)).unwrap(),
            "vendor/libX\n"
        );
    }

    #[test]
    fn test_redeclared_destination_removes_old_link() {
        let temp = repo();
        let root = temp.path();
        declare(
            root,
            vec![ExternalEntry::new("proj/libX.git", Pin::branch("master"))
                .with_target("./", "old/libX")],
        );
        let runner = MockRunner::new();
        runner.add_repo("proj/libX.git", &[("README", "libX")]);
        run(&runner, root, EngineOptions::default()).unwrap();
        assert!(root.join("old/libX/README").is_file());

        declare(
            root,
            vec![ExternalEntry::new("proj/libX.git", Pin::branch("master"))
                .with_target("./", "new/libX")],
        );
        run(&runner, root, EngineOptions::default()).unwrap();

        assert!(fs::symlink_metadata(root.join("old/libX")).is_err());
        assert!(!root.join("old").exists());
        assert!(root.join("new/libX/README").is_file());
        assert_eq!(fs::read_to_string(exclude_path(root)).unwrap(), "new/libX\n");
    }

    #[test]
    fn test_dropping_every_external_removes_its_links() {
        let temp = repo();
        let root = temp.path();
        declare(
            root,
            vec![ExternalEntry::new("proj/libX.git", Pin::tag("v1")).with_target("./", "libX")],
        );
        let runner = MockRunner::new();
        runner.add_repo("proj/libX.git", &[("a.txt", "a")]);
        run(&runner, root, EngineOptions::default()).unwrap();
        assert!(root.join("libX/a.txt").is_file());

        declare(root, vec![]);
        run(&runner, root, EngineOptions::default()).unwrap();

        assert!(fs::symlink_metadata(root.join("libX")).is_err());
        assert_eq!(fs::read_to_string(exclude_path(root)).unwrap(), "");
        // The checkout itself stays in storage.
        assert!(externals_root(root).join("libX/a.txt").is_file());
    }

    #[test]
    fn test_conflicting_tags_abort_before_any_command() {
        let temp = repo();
        let root = temp.path();
        declare(
            root,
            vec![
                ExternalEntry::new("proj/libX.git", Pin::tag("v1")).with_target("./", "libX"),
                ExternalEntry::new("proj/other.git", Pin::tag("v1")).with_target("./", "other"),
            ],
        );
        let other = externals_root(root).join("other");
        fs::create_dir_all(other.join(".git")).unwrap();
        declare(
            &other,
            vec![ExternalEntry::new("proj/libX.git", Pin::tag("v2")).with_target("./", "libX")],
        );

        let runner = MockRunner::new();
        let err = run(&runner, root, EngineOptions::default()).unwrap_err();

        assert_eq!(err.exit_code(), exit_codes::INCONSISTENT_PINS);
        let message = err.to_string();
        assert!(message.contains("tag v1"));
        assert!(message.contains("tag v2"));
        assert!(message.contains(".git/externals/other"));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_dirty_checkout_blocks_update_without_reset() {
        let temp = repo();
        let root = temp.path();
        declare(
            root,
            vec![ExternalEntry::new("proj/libX.git", Pin::branch("master"))
                .with_target("./", "vendor/libX")],
        );
        let checkout = externals_root(root).join("libX");
        fs::create_dir_all(checkout.join(".git")).unwrap();

        let runner = MockRunner::new();
        runner.mark_dirty(&checkout);

        let err = run(&runner, root, EngineOptions::default()).unwrap_err();
        assert_eq!(err.exit_code(), exit_codes::DIRTY_WORKING_TREE);
        assert!(err.to_string().contains("libX"));
        assert_eq!(runner.count("fetch"), 0);
        assert_eq!(runner.count("checkout"), 0);

        let options = EngineOptions {
            reset: true,
            ..EngineOptions::default()
        };
        run(&runner, root, options).unwrap();
        assert_eq!(runner.count("fetch"), 1);
        assert_eq!(runner.count("git reset --hard"), 2);
        assert!(root.join("vendor/libX").exists());
    }

    #[test]
    fn test_dirty_root_blocks_update() {
        let temp = repo();
        let root = temp.path();
        declare(
            root,
            vec![ExternalEntry::new("proj/libX.git", Pin::tag("v1")).with_target("./", "x")],
        );
        let runner = MockRunner::new();
        runner.mark_dirty(root);

        let err = run(&runner, root, EngineOptions::default()).unwrap_err();
        assert!(matches!(err, Error::DirtyWorkingTree { .. }));
        assert_eq!(runner.count("clone"), 0);
    }

    #[test]
    fn test_update_is_idempotent() {
        let temp = repo();
        let root = temp.path();
        declare(
            root,
            vec![ExternalEntry::new("proj/libX.git", Pin::tag("v1"))
                .with_target("./", "vendor/libX")
                .with_target("./", "third_party/libX")],
        );
        let runner = MockRunner::new();
        runner.add_repo("proj/libX.git", &[("a.txt", "a")]);

        run(&runner, root, EngineOptions::default()).unwrap();
        let first_link = fs::read_link(root.join("vendor/libX")).unwrap();
        let first_exclude = fs::read_to_string(exclude_path(root)).unwrap();

        run(&runner, root, EngineOptions::default()).unwrap();

        assert_eq!(runner.count("clone"), 1);
        assert_eq!(fs::read_link(root.join("vendor/libX")).unwrap(), first_link);
        assert_eq!(fs::read_to_string(exclude_path(root)).unwrap(), first_exclude);
        assert_eq!(first_exclude, "third_party/libX\nvendor/libX\n");
    }

    #[test]
    fn test_nested_externals_are_resolved_in_scope() {
        let temp = repo();
        let root = temp.path();
        declare(
            root,
            vec![ExternalEntry::new("https://h/libX.git", Pin::branch("master"))
                .with_target("./", "vendor/libX")],
        );

        let mut nested = Manifest::new();
        nested.insert(
            ExternalEntry::new("https://h/libY.git", Pin::tag("v3")).with_target("./", "deps/libY"),
        );
        let nested_json = nested.to_json().unwrap();

        let runner = MockRunner::new();
        runner.add_repo("https://h/libX.git", &[("git_externals.json", nested_json.as_str())]);
        runner.add_repo("https://h/libY.git", &[("y.txt", "libY")]);

        run(&runner, root, EngineOptions::default()).unwrap();

        let lib_x = externals_root(root).join("libX");
        assert_eq!(
            fs::read_link(lib_x.join("deps/libY")).unwrap(),
            externals_root(&lib_x).join("libY")
        );
        assert_eq!(
            fs::read_to_string(root.join("vendor/libX/deps/libY/y.txt")).unwrap(),
            "libY"
        );
        assert_eq!(
            fs::read_to_string(exclude_path(&lib_x)).unwrap(),
            "deps/libY\n"
        );
    }

    #[test]
    fn test_non_recursive_update_stays_at_top_level() {
        let temp = repo();
        let root = temp.path();
        declare(
            root,
            vec![ExternalEntry::new("https://h/libX.git", Pin::branch("master"))
                .with_target("./", "vendor/libX")],
        );
        let mut nested = Manifest::new();
        nested.insert(
            ExternalEntry::new("https://h/libY.git", Pin::tag("v3")).with_target("./", "deps/libY"),
        );
        let nested_json = nested.to_json().unwrap();

        let runner = MockRunner::new();
        runner.add_repo("https://h/libX.git", &[("git_externals.json", nested_json.as_str())]);

        let options = EngineOptions {
            recursive: false,
            ..EngineOptions::default()
        };
        run(&runner, root, options).unwrap();

        assert_eq!(runner.count("clone"), 1);
        assert_eq!(runner.count("libY"), 0);
    }

    #[test]
    fn test_cycle_between_externals_is_reported() {
        let temp = repo();
        let root = temp.path();
        declare(
            root,
            vec![ExternalEntry::new("https://h/a.git", Pin::branch("master")).with_target("./", "a")],
        );

        let mut declares_b = Manifest::new();
        declares_b.insert(
            ExternalEntry::new("https://h/b.git", Pin::branch("master")).with_target("./", "b"),
        );
        let mut declares_a = Manifest::new();
        declares_a.insert(
            ExternalEntry::new("https://h/a.git", Pin::branch("master")).with_target("./", "a"),
        );

        let runner = MockRunner::new();
        runner.add_repo(
            "https://h/a.git",
            &[("git_externals.json", declares_b.to_json().unwrap().as_str())],
        );
        runner.add_repo(
            "https://h/b.git",
            &[("git_externals.json", declares_a.to_json().unwrap().as_str())],
        );

        let err = run(&runner, root, EngineOptions::default()).unwrap_err();
        assert_eq!(err.exit_code(), exit_codes::CYCLE);
        assert!(err
            .to_string()
            .contains("https://h/a.git -> https://h/b.git -> https://h/a.git"));
    }

    #[test]
    fn test_overlapping_destinations_fail_before_cloning() {
        let temp = repo();
        let root = temp.path();
        declare(
            root,
            vec![
                ExternalEntry::new("https://h/a.git", Pin::tag("v1")).with_target("./", "lib"),
                ExternalEntry::new("https://h/b.git", Pin::tag("v1")).with_target("src/", "lib"),
            ],
        );
        let runner = MockRunner::new();

        let err = run(&runner, root, EngineOptions::default()).unwrap_err();
        assert!(matches!(err, Error::OverlappingDestination { .. }));
        assert_eq!(runner.count("clone"), 0);
        assert_eq!(runner.count("init"), 0);
    }
}
