//! In-process cache of centralized-revision lookups
//!
//! Translating an svn revision into a commit may scan the whole history of a
//! branch, so results are memoised for the duration of one top-level
//! invocation. The cache is an explicit value handed down to the resolver;
//! nothing is kept between invocations.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};

/// Cache key: which checkout, which branch, which revision
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RevisionKey {
    pub checkout: PathBuf,
    pub branch: String,
    pub revision: String,
}

impl RevisionKey {
    pub fn new(checkout: &Path, branch: &str, revision: &str) -> Self {
        Self {
            checkout: checkout.to_path_buf(),
            branch: branch.to_string(),
            revision: revision.to_string(),
        }
    }
}

/// Memoised revision -> commit translations
#[derive(Debug, Clone, Default)]
pub struct RevisionCache {
    cache: Arc<Mutex<HashMap<RevisionKey, String>>>,
}

impl RevisionCache {
    /// Create a new empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a cached commit, or compute and cache it if not present
    pub fn get_or_resolve<F>(&self, key: RevisionKey, resolve: F) -> Result<String>
    where
        F: FnOnce() -> Result<String>,
    {
        if let Some(cached) = self.get(&key)? {
            log::debug!("Revision {} of {} served from cache", key.revision, key.branch);
            return Ok(cached);
        }

        let commit = resolve()?;

        self.lock()?.insert(key, commit.clone());
        Ok(commit)
    }

    /// Get a value from cache without computing
    pub fn get(&self, key: &RevisionKey) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    /// Get the number of cached entries
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    /// Check if cache is empty
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.lock()?.is_empty())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<RevisionKey, String>>> {
        self.cache.lock().map_err(|_| Error::LockPoisoned {
            context: "revision cache".to_string(),
        })
    }
}
