//! # Externals Manifest
//!
//! This module defines the in-memory form of `git_externals.json` and the
//! logic to load and persist it.
//!
//! ## Format
//!
//! The manifest is a JSON object keyed by repository reference:
//!
//! ```json
//! {
//!     "https://host/proj/libX.git": {
//!         "branch": "master",
//!         "ref": null,
//!         "targets": {
//!             "./": [
//!                 "vendor/libX"
//!             ]
//!         }
//!     }
//! }
//! ```
//!
//! An entry is pinned either to a `tag` or to a `branch` with an optional
//! `ref`. The two shapes are validated once at load time and represented by
//! the [`Pin`] enum, so the rest of the crate never inspects optional keys.
//! A `ref` starting with `svn:` names a centralized revision that must be
//! translated into a commit before use.
//!
//! ## Persistence
//!
//! Saving is deterministic: keys are sorted at every level and the document
//! is indented with four spaces, so `save(load(x)) == x` for any manifest
//! previously written by this module. Keys this crate does not know about
//! are carried through untouched. The VCS kind of an entry is derived from
//! its reference and never written.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::defaults::{manifest_path, SVN_REVISION_MARKER};
use crate::error::{Error, Result};
use crate::path;

/// Which backend fetches an external.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VcsKind {
    /// A git repository, cloned and fetched natively.
    Distributed,
    /// An svn repository, checked out through git-svn or svn itself.
    Centralized,
}

impl VcsKind {
    /// Derive the kind of repository a reference points to.
    pub fn detect(reference: &str) -> Self {
        let lower = reference.to_ascii_lowercase();
        if lower.starts_with("svn:") || lower.starts_with("svn+") || lower.contains("/svn/") {
            VcsKind::Centralized
        } else {
            VcsKind::Distributed
        }
    }
}

/// The point in history an external is locked to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Pin {
    /// An immutable tag.
    Tag(String),
    /// A movable branch, optionally pinned to one commit or svn revision.
    Branch { name: String, r#ref: Option<String> },
}

impl Pin {
    /// Pin to the tip of a branch.
    pub fn branch(name: impl Into<String>) -> Self {
        Pin::Branch {
            name: name.into(),
            r#ref: None,
        }
    }

    /// Pin to a tag.
    pub fn tag(name: impl Into<String>) -> Self {
        Pin::Tag(name.into())
    }

    /// The branch or tag name that a first clone should pull.
    pub fn ref_name(&self) -> &str {
        match self {
            Pin::Tag(tag) => tag,
            Pin::Branch { name, .. } => name,
        }
    }

    /// The svn revision number when the ref carries the `svn:` marker.
    pub fn svn_revision(&self) -> Option<&str> {
        match self {
            Pin::Branch {
                r#ref: Some(r), ..
            } => r.strip_prefix(SVN_REVISION_MARKER),
            _ => None,
        }
    }
}

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pin::Tag(tag) => write!(f, "tag {}", tag),
            Pin::Branch { name, r#ref: None } => write!(f, "branch {}", name),
            Pin::Branch {
                name,
                r#ref: Some(r),
            } => write!(f, "branch {} @ {}", name, r),
        }
    }
}

/// Derive the storage name of an external from its reference: the last path
/// segment with any `.git` suffix removed.
pub fn repo_name(reference: &str) -> String {
    let trimmed = reference.trim_end_matches('/');
    let last = trimmed.rsplit(['/', ':']).next().unwrap_or(trimmed);
    last.strip_suffix(".git").unwrap_or(last).to_string()
}

/// One declared dependency.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalEntry {
    /// URL or relative reference, exactly as written in the manifest.
    pub reference: String,
    /// Name of the checkout directory under the externals storage.
    pub name: String,
    /// Backend used to fetch the external.
    pub vcs: VcsKind,
    /// Branch/tag/ref the external is locked to.
    pub pin: Pin,
    /// Source path inside the external -> destinations in the declaring repo.
    pub targets: BTreeMap<String, Vec<String>>,
    name_override: Option<String>,
    extra: Map<String, Value>,
}

impl ExternalEntry {
    /// Create an entry with no targets.
    pub fn new(reference: impl Into<String>, pin: Pin) -> Self {
        let reference = reference.into();
        Self {
            name: repo_name(&reference),
            vcs: VcsKind::detect(&reference),
            reference,
            pin,
            targets: BTreeMap::new(),
            name_override: None,
            extra: Map::new(),
        }
    }

    /// Override the derived checkout name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.name = name.clone();
        self.name_override = Some(name);
        self
    }

    /// Add a `source -> destination` mapping, ignoring exact duplicates.
    pub fn with_target(mut self, source: &str, destination: &str) -> Self {
        self.add_target(source, destination);
        self
    }

    /// Add a `source -> destination` mapping; returns false if it was
    /// already present.
    pub fn add_target(&mut self, source: &str, destination: &str) -> bool {
        let dsts = self.targets.entry(source.to_string()).or_default();
        if dsts.iter().any(|d| d == destination) {
            false
        } else {
            dsts.push(destination.to_string());
            true
        }
    }

    /// Every `(source, destination)` pair of the entry, sources in sorted
    /// order and destinations in declaration order.
    pub fn target_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.targets
            .iter()
            .flat_map(|(src, dsts)| dsts.iter().map(move |d| (src.as_str(), d.as_str())))
    }

    /// Every destination declared by the entry.
    pub fn destinations(&self) -> impl Iterator<Item = &str> {
        self.target_pairs().map(|(_, dst)| dst)
    }

    /// Source paths to restrict a sparse checkout to, or `None` when some
    /// target maps the whole tree and a full clone is needed.
    pub fn sparse_paths(&self) -> Option<Vec<&str>> {
        if self.targets.keys().any(|src| path::is_whole_tree(src)) {
            None
        } else {
            Some(self.targets.keys().map(String::as_str).collect())
        }
    }

    fn from_raw(reference: &str, raw: RawEntry, file: &Path) -> Result<Self> {
        let invalid = |message: String, hint: Option<&str>| Error::ManifestParse {
            path: file.to_path_buf(),
            message,
            hint: hint.map(str::to_string),
        };

        let pin = match (raw.branch, raw.tag) {
            (Some(_), Some(_)) => {
                return Err(invalid(
                    format!("{} declares both a branch and a tag", reference),
                    Some("keep either \"branch\" (with an optional \"ref\") or \"tag\""),
                ))
            }
            (None, None) => {
                return Err(invalid(
                    format!("{} declares neither a branch nor a tag", reference),
                    Some("add \"branch\": \"master\" or \"tag\": \"<name>\""),
                ))
            }
            (None, Some(tag)) => {
                if let Some(Some(r)) = raw.r#ref {
                    return Err(invalid(
                        format!("{} is pinned to tag {} but also sets ref {}", reference, tag, r),
                        Some("a ref can only refine a branch"),
                    ));
                }
                Pin::Tag(tag)
            }
            (Some(name), None) => Pin::Branch {
                name,
                r#ref: raw.r#ref.flatten(),
            },
        };

        if let Some((src, _)) = raw.targets.iter().find(|(_, dsts)| dsts.is_empty()) {
            return Err(invalid(
                format!("{} maps {} to no destination", reference, src),
                None,
            ));
        }

        let mut entry = ExternalEntry::new(reference, pin);
        if let Some(name) = raw.name {
            entry = entry.with_name(name);
        }
        entry.targets = raw.targets;
        entry.extra = raw.extra;
        Ok(entry)
    }

    fn to_raw(&self) -> RawEntry {
        let (branch, tag, r#ref) = match &self.pin {
            Pin::Tag(tag) => (None, Some(tag.clone()), None),
            Pin::Branch { name, r#ref } => (Some(name.clone()), None, Some(r#ref.clone())),
        };
        RawEntry {
            branch,
            tag,
            r#ref,
            name: self.name_override.clone(),
            targets: self.targets.clone(),
            extra: self.extra.clone(),
        }
    }
}

/// Serialized shape of an entry.
#[derive(Debug, Serialize, Deserialize)]
struct RawEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tag: Option<String>,
    /// `None`: key absent, `Some(None)`: explicit `null`.
    #[serde(
        default,
        rename = "ref",
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    r#ref: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default)]
    targets: BTreeMap<String, Vec<String>>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

fn present_or_null<'de, D>(deserializer: D) -> std::result::Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// All externals declared by one directory, keyed by reference.
///
/// Whether the file ended with a newline is remembered so that saving an
/// unmodified manifest reproduces it byte for byte; manifests written by
/// older tooling have none.
#[derive(Debug, Clone)]
pub struct Manifest {
    entries: BTreeMap<String, ExternalEntry>,
    trailing_newline: bool,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            trailing_newline: true,
        }
    }
}

/// Equality covers the declared externals only, not the file layout.
impl PartialEq for Manifest {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Manifest {
    /// Create an empty manifest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the manifest of `dir`, or an empty manifest if there is none.
    pub fn load(dir: &Path) -> Result<Self> {
        let file = manifest_path(dir);
        if !file.exists() {
            log::debug!("No manifest at {}, treating it as empty", file.display());
            return Ok(Self::new());
        }
        let content = fs::read_to_string(&file)?;
        Self::parse(&content, &file)
    }

    /// Parse manifest content. `file` is only used in error messages.
    pub fn parse(content: &str, file: &Path) -> Result<Self> {
        let raw: BTreeMap<String, RawEntry> =
            serde_json::from_str(content).map_err(|e| Error::ManifestParse {
                path: file.to_path_buf(),
                message: e.to_string(),
                hint: None,
            })?;

        let mut entries = BTreeMap::new();
        for (reference, raw_entry) in raw {
            let entry = ExternalEntry::from_raw(&reference, raw_entry, file)?;
            entries.insert(reference, entry);
        }
        Ok(Self {
            entries,
            trailing_newline: content.ends_with('\n'),
        })
    }

    /// Write the manifest into `dir`, returning the file written.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        let file = manifest_path(dir);
        fs::write(&file, self.to_json()?)?;
        Ok(file)
    }

    /// Deterministic serialized form: sorted keys and four-space
    /// indentation, followed by a newline unless the parsed file had none.
    pub fn to_json(&self) -> Result<String> {
        let mut document = Map::new();
        for (reference, entry) in &self.entries {
            document.insert(reference.clone(), serde_json::to_value(entry.to_raw())?);
        }
        let document = sort_keys(Value::Object(document));

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        document.serialize(&mut serializer)?;
        if self.trailing_newline {
            buf.push(b'\n');
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Iterate over the entries in reference order.
    pub fn iter(&self) -> impl Iterator<Item = &ExternalEntry> {
        self.entries.values()
    }

    /// Look up an entry by reference.
    pub fn get(&self, reference: &str) -> Option<&ExternalEntry> {
        self.entries.get(reference)
    }

    /// Insert or replace an entry.
    pub fn insert(&mut self, entry: ExternalEntry) {
        self.entries.insert(entry.reference.clone(), entry);
    }

    /// Remove an entry by reference.
    pub fn remove(&mut self, reference: &str) -> Option<ExternalEntry> {
        self.entries.remove(reference)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the manifest declares no externals.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Declare `source -> destination` for `reference` pinned at `pin`.
    ///
    /// A new entry is created when the reference is unknown. An existing
    /// entry must carry the same pin; adding a destination that is already
    /// present is a no-op.
    pub fn add(
        &mut self,
        reference: &str,
        source: &str,
        destination: &str,
        pin: Pin,
        name: Option<String>,
    ) -> Result<()> {
        match self.entries.get_mut(reference) {
            Some(entry) => {
                if entry.pin != pin {
                    return Err(Error::PinMismatch {
                        reference: reference.to_string(),
                        current: entry.pin.to_string(),
                        requested: pin.to_string(),
                    });
                }
                if let Some(name) = name {
                    if name != entry.name {
                        *entry = entry.clone().with_name(name);
                    }
                }
                entry.add_target(source, destination);
            }
            None => {
                let mut entry = ExternalEntry::new(reference, pin).with_target(source, destination);
                if let Some(name) = name {
                    entry = entry.with_name(name);
                }
                self.insert(entry);
            }
        }
        Ok(())
    }
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> =
                map.into_iter().map(|(k, v)| (k, sort_keys(v))).collect();
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}
