//! Running `git blame` against an in-memory buffer.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

use tracing::debug;

use crate::error::{BlameError, Result};

/// Something that can produce `git blame --incremental` output for a file
/// whose current content may differ from what is on disk.
pub trait BlameSource: Send + Sync {
    fn blame(&self, path: &Path, contents: &str) -> Result<String>;
}

/// Runs the git command-line tool.
#[derive(Debug, Clone)]
pub struct GitCli {
    git_path: PathBuf,
    max_output_bytes: usize,
}

impl GitCli {
    pub fn new(git_path: impl Into<PathBuf>, max_output_bytes: usize) -> Self {
        GitCli {
            git_path: git_path.into(),
            max_output_bytes,
        }
    }
}

impl Default for GitCli {
    fn default() -> Self {
        let config = crate::config::HeatConfig::default();
        GitCli::new(config.git_path, config.max_output_bytes)
    }
}

/// Split a file path into the directory git runs in and the name it blames.
fn split_path(path: &Path) -> Result<(PathBuf, String)> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| BlameError::InvalidPath(path.to_path_buf()))?;
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        Some(_) => PathBuf::from("."),
        None => return Err(BlameError::InvalidPath(path.to_path_buf())),
    };
    Ok((dir, name.to_string()))
}

impl BlameSource for GitCli {
    /// Blame `contents` as the new version of `path`.
    ///
    /// Runs `git blame --incremental --contents - -- <name>` in the file's
    /// directory with the buffer on stdin, so unsaved edits are attributed
    /// to the all-zero commit instead of shifting every later line.
    fn blame(&self, path: &Path, contents: &str) -> Result<String> {
        let (dir, name) = split_path(path)?;

        let mut child = Command::new(&self.git_path)
            .args(["blame", "--incremental", "--contents", "-", "--"])
            .arg(&name)
            .current_dir(&dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(BlameError::Spawn)?;

        // Feed stdin and drain stderr on their own threads; git may not read
        // all of its input before it starts writing output.
        let mut stdin = child.stdin.take().ok_or_else(|| {
            BlameError::Io(std::io::Error::other("git stdin was not captured"))
        })?;
        let input = contents.to_owned();
        let writer = thread::spawn(move || stdin.write_all(input.as_bytes()));

        let mut stderr = child.stderr.take().ok_or_else(|| {
            BlameError::Io(std::io::Error::other("git stderr was not captured"))
        })?;
        let stderr_reader = thread::spawn(move || {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf);
            buf
        });

        let stdout = child.stdout.take().ok_or_else(|| {
            BlameError::Io(std::io::Error::other("git stdout was not captured"))
        })?;
        let mut output = Vec::new();
        let limit = self.max_output_bytes;
        stdout.take(limit as u64 + 1).read_to_end(&mut output)?;

        if output.len() > limit {
            let _ = child.kill();
            let _ = child.wait();
            let _ = writer.join();
            let _ = stderr_reader.join();
            return Err(BlameError::OutputTooLarge { limit });
        }

        let status = child.wait()?;
        // A broken pipe here just means git exited early; the exit status
        // tells the real story.
        let _ = writer.join();
        let stderr = stderr_reader.join().unwrap_or_default();

        if !status.success() {
            return Err(BlameError::GitFailed {
                code: status.code(),
                stderr: stderr.trim().to_string(),
            });
        }

        debug!(path = %path.display(), bytes = output.len(), "git blame finished");
        Ok(String::from_utf8_lossy(&output).into_owned())
    }
}
