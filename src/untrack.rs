//! Keeping projected links out of `git status`.
//!
//! The destinations of one level are written to the repository's local
//! exclude list, one per line, replacing what was there before. The list
//! therefore also records what the previous run projected.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::defaults::exclude_path;
use crate::error::Result;
use crate::path;

/// Destinations listed in the exclude file of the repository at `root`.
///
/// A missing file means nothing was projected yet.
pub fn read_exclude(root: &Path) -> Result<Vec<String>> {
    let content = match fs::read_to_string(exclude_path(root)) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Write `destinations` to the exclude file of the repository at `root`.
///
/// Leading `./` markers are dropped and duplicates are written once.
pub fn write_exclude<I, S>(root: &Path, destinations: I) -> Result<PathBuf>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut lines: Vec<String> = Vec::new();
    for dst in destinations {
        let line = path::strip_current_dir(dst.as_ref()).replace('\\', "/");
        if !lines.contains(&line) {
            lines.push(line);
        }
    }

    let file = exclude_path(root);
    if let Some(parent) = file.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut content = lines.join("\n");
    if !content.is_empty() {
        content.push('\n');
    }
    fs::write(&file, content)?;
    log::debug!("Excluded {} destinations in {}", lines.len(), file.display());
    Ok(file)
}
