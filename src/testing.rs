//! Test doubles shared by the unit tests of the crate.
//!
//! [`MockRunner`] records every invocation and imitates the filesystem side
//! effects of the VCS commands the engine relies on: clones and checkouts
//! create the target directory (with a `.git` or `.svn` marker) and copy in
//! the files registered for the remote with [`MockRunner::add_repo`].

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::runner::{CommandRunner, OutputMode};

/// One recorded invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub cwd: PathBuf,
    pub program: String,
    pub args: Vec<String>,
}

impl Call {
    pub fn line(&self) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

#[derive(Default)]
pub struct MockRunner {
    calls: Mutex<Vec<Call>>,
    dirty: Mutex<HashSet<PathBuf>>,
    origins: Mutex<HashMap<PathBuf, String>>,
    remotes: Mutex<HashMap<PathBuf, String>>,
    repos: Mutex<HashMap<String, Vec<(String, String)>>>,
    responses: Mutex<Vec<(String, String)>>,
    failures: Mutex<Vec<(String, i32)>>,
}

fn key(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the files a clone of `url` produces.
    pub fn add_repo(&self, url: &str, files: &[(&str, &str)]) {
        self.repos.lock().unwrap().insert(
            url.to_string(),
            files
                .iter()
                .map(|(p, c)| (p.to_string(), c.to_string()))
                .collect(),
        );
    }

    /// Make `git status --porcelain` / `svn status -q` report a change in `dir`.
    pub fn mark_dirty(&self, dir: &Path) {
        self.dirty.lock().unwrap().insert(key(dir));
    }

    /// Configure `remote.origin.url` for the repository at `dir`.
    pub fn set_origin(&self, dir: &Path, url: &str) {
        self.origins.lock().unwrap().insert(key(dir), url.to_string());
    }

    /// Return `output` for any command line starting with `prefix`.
    pub fn respond(&self, prefix: &str, output: &str) {
        self.responses
            .lock()
            .unwrap()
            .push((prefix.to_string(), output.to_string()));
    }

    /// Fail any command line containing `needle` with exit code `code`.
    pub fn fail_on(&self, needle: &str, code: i32) {
        self.failures.lock().unwrap().push((needle.to_string(), code));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn command_lines(&self) -> Vec<String> {
        self.calls().iter().map(Call::line).collect()
    }

    /// Number of recorded calls whose command line contains `needle`.
    pub fn count(&self, needle: &str) -> usize {
        self.command_lines()
            .iter()
            .filter(|l| l.contains(needle))
            .count()
    }

    fn populate(&self, url: &str, dir: &Path) -> Result<()> {
        if let Some(files) = self.repos.lock().unwrap().get(url) {
            for (rel, content) in files {
                let target = dir.join(rel);
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(target, content)?;
            }
        }
        Ok(())
    }

    fn create_checkout(&self, dir: &Path, marker: &str, url: Option<&str>) -> Result<()> {
        fs::create_dir_all(dir.join(marker))?;
        if let Some(url) = url {
            self.populate(url, dir)?;
            self.remotes.lock().unwrap().insert(key(dir), url.to_string());
        }
        Ok(())
    }

    fn status_output(&self, cwd: &Path) -> String {
        if self.dirty.lock().unwrap().contains(&key(cwd)) {
            " M modified.txt\n".to_string()
        } else {
            String::new()
        }
    }

    fn fail(call: &Call, code: i32, stderr: &str) -> Error {
        Error::Command {
            program: call.program.clone(),
            args: call.args.clone(),
            cwd: call.cwd.clone(),
            code: Some(code),
            stderr: stderr.to_string(),
        }
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, cwd: &Path, program: &str, args: &[&str], _mode: OutputMode) -> Result<String> {
        let call = Call {
            cwd: cwd.to_path_buf(),
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        };
        self.calls.lock().unwrap().push(call.clone());
        let line = call.line();

        if let Some((_, code)) = self
            .failures
            .lock()
            .unwrap()
            .iter()
            .find(|(needle, _)| line.contains(needle.as_str()))
        {
            return Err(Self::fail(&call, *code, "mock failure"));
        }

        let args_line = args.join(" ");
        if let Some((_, out)) = self
            .responses
            .lock()
            .unwrap()
            .iter()
            .find(|(prefix, _)| args_line.starts_with(prefix.as_str()))
        {
            return Ok(out.clone());
        }

        let is_svn = program.ends_with("svn");
        match args {
            ["clone", url, name] if !is_svn => {
                self.create_checkout(&cwd.join(name), ".git", Some(*url))?
            }
            ["svn", "clone", url, name] if !is_svn => {
                self.create_checkout(&cwd.join(name), ".git", Some(*url))?
            }
            ["init", name] if !is_svn => self.create_checkout(&cwd.join(name), ".git", None)?,
            ["remote", "add", "-f", "origin", url] if !is_svn => {
                self.remotes.lock().unwrap().insert(key(cwd), url.to_string());
            }
            ["pull", ..] if !is_svn => {
                let url = self.remotes.lock().unwrap().get(&key(cwd)).cloned();
                if let Some(url) = url {
                    self.populate(&url, cwd)?;
                }
            }
            ["status", "--porcelain", ..] if !is_svn => return Ok(self.status_output(cwd)),
            ["status", "-q"] if is_svn => return Ok(self.status_output(cwd)),
            ["config", "--get", "remote.origin.url"] if !is_svn => {
                return match self.origins.lock().unwrap().get(&key(cwd)) {
                    Some(url) => Ok(format!("{}\n", url)),
                    None => Err(Self::fail(&call, 1, "")),
                };
            }
            ["checkout", rest @ ..] if is_svn => {
                if let [.., url, name] = rest {
                    self.create_checkout(&cwd.join(name), ".svn", Some(*url))?;
                }
            }
            _ => {}
        }
        Ok(String::new())
    }
}
