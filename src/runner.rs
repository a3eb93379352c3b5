//! # Command Runner
//!
//! Every version-control process the crate starts goes through the
//! [`CommandRunner`] trait. Each invocation names its working directory
//! explicitly; nothing in the crate changes the process-wide current
//! directory.
//!
//! Two output modes exist:
//!
//! - [`OutputMode::Capture`]: stdout is collected and returned, stderr is
//!   kept for the error message. Used whenever output is parsed.
//! - [`OutputMode::Stream`]: stdout is inherited from the invoking terminal
//!   and stderr is copied through to it as it arrives, keeping its tail for
//!   the error message. Used for long-running operations such as clones and
//!   for `foreach`, where the user wants to see progress.
//!
//! A non-zero exit status becomes [`Error::Command`] with the program,
//! arguments, directory, exit code and captured stderr.

use std::io::{self, Read, Write};
use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::{Error, Result};

/// How a child process's output is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Collect stdout and return it.
    Capture,
    /// Pass stdout/stderr through to the terminal.
    Stream,
}

/// Trait for process execution - allows mocking in tests
pub trait CommandRunner {
    /// Run `program args...` inside `cwd`.
    ///
    /// Returns the captured stdout in [`OutputMode::Capture`] and an empty
    /// string in [`OutputMode::Stream`].
    fn run(&self, cwd: &Path, program: &str, args: &[&str], mode: OutputMode) -> Result<String>;
}

/// The default implementation of `CommandRunner`, which spawns real
/// processes with `std::process::Command`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, cwd: &Path, program: &str, args: &[&str], mode: OutputMode) -> Result<String> {
        log::debug!("[{}] {} {}", cwd.display(), program, args.join(" "));

        let command_error = |code: Option<i32>, stderr: String| Error::Command {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            cwd: cwd.to_path_buf(),
            code,
            stderr,
        };

        let mut command = Command::new(program);
        command.args(args).current_dir(cwd);

        match mode {
            OutputMode::Capture => {
                let output = command
                    .stdin(Stdio::null())
                    .output()
                    .map_err(|e| command_error(None, e.to_string()))?;

                if !output.status.success() {
                    return Err(command_error(
                        output.status.code(),
                        String::from_utf8_lossy(&output.stderr).into_owned(),
                    ));
                }
                Ok(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            OutputMode::Stream => {
                let mut child = command
                    .stderr(Stdio::piped())
                    .spawn()
                    .map_err(|e| command_error(None, e.to_string()))?;

                let tail = match child.stderr.take() {
                    Some(stderr) => tee_stderr(stderr)?,
                    None => String::new(),
                };
                let status = child.wait()?;

                if !status.success() {
                    return Err(command_error(status.code(), tail));
                }
                Ok(String::new())
            }
        }
    }
}

/// Bytes of a streamed command's stderr kept for its error message.
const STDERR_TAIL: usize = 4096;

/// Copy `source` to our stderr until it closes, returning its last lines.
fn tee_stderr(mut source: impl Read) -> Result<String> {
    let mut terminal = io::stderr();
    let mut tail: Vec<u8> = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = match source.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        // A closed terminal must not hide the command's own result.
        let _ = terminal.write_all(&buf[..n]);
        tail.extend_from_slice(&buf[..n]);
        if tail.len() > STDERR_TAIL {
            tail.drain(..tail.len() - STDERR_TAIL);
        }
    }
    let _ = terminal.flush();

    let text = String::from_utf8_lossy(&tail).into_owned();
    if tail.len() < STDERR_TAIL {
        return Ok(text);
    }
    // Drop the partial first line of a truncated tail.
    Ok(match text.split_once('\n') {
        Some((_, rest)) => rest.to_string(),
        None => text,
    })
}
