//! Repository capabilities consumed by the engine, and their `git` CLI
//! implementation.
//!
//! The engine never talks to `git` directly. It goes through the narrow
//! [`HistoryWalker`], [`RefStore`] and [`ContentReader`] traits, so tests
//! can inject an in-memory repository. Concurrent searches share nothing
//! but the immutable capability object.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::debug;

use crate::{CancelFlag, Commit, SearchError};

pub mod refs;
pub mod walker;

pub use refs::{Provenance, RefEntry, RefResolver};
pub use walker::{CommitStream, LogRecordReader};

/// Field separator in git log format: U+241E (SYMBOL FOR RECORD SEPARATOR).
/// Never appears in commit metadata.
pub(crate) const FIELD_SEP: &str = "␞";
/// Record separator that starts every commit in git log output.
pub(crate) const RECORD_SEP: &str = "␟";

// ─── Types ──────────────────────────────────────────────────────────

/// One commit as produced by a history walk, with its diff when requested.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitRecord {
    pub commit: Commit,
    /// Raw unified diff against the first parent (`git log -p`).
    pub diff: Option<String>,
}

/// What to walk.
#[derive(Clone, Debug, Default)]
pub struct WalkOptions {
    /// Starting revisions. Empty means every branch head.
    pub refs: Vec<String>,
    /// Attach each commit's diff text.
    pub include_diff: bool,
}

/// Boxed, lazy stream of commits in reverse-chronological order.
pub type CommitIter<'a> = Box<dyn Iterator<Item = Result<CommitRecord, SearchError>> + Send + 'a>;

// ─── Capabilities ───────────────────────────────────────────────────

/// History traversal: streams commits without buffering the whole history.
pub trait HistoryWalker: Send + Sync {
    /// Start a walk. The returned stream must stop with
    /// [`SearchError::Cancelled`] once `cancel` fires.
    fn walk<'a>(&'a self, opts: &WalkOptions, cancel: &CancelFlag) -> Result<CommitIter<'a>, SearchError>;
}

/// Ref listing and ancestry queries.
pub trait RefStore: Send + Sync {
    /// Every ref with the commit it (peeled) points at.
    fn list_refs(&self) -> Result<Vec<RefEntry>, SearchError>;

    /// True if `ancestor` is reachable from `descendant` (inclusive).
    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool, SearchError>;
}

/// File content at a revision.
pub trait ContentReader: Send + Sync {
    /// Read `path` at `revision`. Fails with [`SearchError::Cancelled`]
    /// once `cancel` fires, also while the read is in progress.
    fn read_file(&self, revision: &str, path: &str, cancel: &CancelFlag) -> Result<Vec<u8>, SearchError>;
}

// ─── Git CLI implementation ─────────────────────────────────────────

/// All three capabilities backed by the `git` executable.
#[derive(Clone, Debug)]
pub struct GitCli {
    repo_path: PathBuf,
}

impl GitCli {
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self { repo_path: repo_path.into() }
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new("git");
        cmd.current_dir(&self.repo_path)
            .args(["-c", "core.quotePath=false"]) // raw UTF-8 paths
            .stdin(Stdio::null());
        cmd
    }

    /// Arguments for a streaming `git log`.
    pub(crate) fn log_args(opts: &WalkOptions) -> Vec<String> {
        let mut args = vec![
            "log".to_string(),
            "--no-color".to_string(),
            format!(
                "--format={r}%H{f}%P{f}%an{f}%ae{f}%at{f}%cn{f}%ce{f}%ct{f}%B{f}",
                r = RECORD_SEP,
                f = FIELD_SEP
            ),
        ];
        if opts.include_diff {
            args.extend(["-p", "--no-ext-diff", "--no-textconv"].map(String::from));
        }
        if opts.refs.is_empty() {
            args.push("--branches".to_string());
        } else {
            args.extend(opts.refs.iter().cloned());
        }
        args.push("--".to_string());
        args
    }
}

/// Run a git command to completion and return stdout bytes.
fn run_git(cmd: &mut Command) -> Result<Vec<u8>, SearchError> {
    let output = cmd
        .output()
        .map_err(|e| SearchError::Traversal(format!("Failed to execute git: {}. Is git installed and in PATH?", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SearchError::Traversal(format!("git command failed: {}", stderr.trim())));
    }

    Ok(output.stdout)
}

/// Like [`run_git`], but kills the child and fails with
/// [`SearchError::Cancelled`] as soon as `cancel` fires.
fn run_git_cancellable(cmd: &mut Command, cancel: &CancelFlag) -> Result<Vec<u8>, SearchError> {
    if cancel.is_cancelled() {
        return Err(SearchError::Cancelled);
    }
    let mut child = cmd
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| SearchError::Traversal(format!("Failed to execute git: {}. Is git installed and in PATH?", e)))?;
    let stdout = child.stdout.take().map(|pipe| walker::drain_pipe(pipe, u64::MAX));
    let stderr = child.stderr.take().map(|pipe| walker::drain_pipe(pipe, walker::MAX_STDERR));

    let status = loop {
        if cancel.is_cancelled() {
            let _ = child.kill();
            let _ = child.wait();
            debug!("git command cancelled");
            return Err(SearchError::Cancelled);
        }
        match child.try_wait()? {
            Some(status) => break status,
            None => std::thread::sleep(walker::CANCEL_POLL_INTERVAL),
        }
    };

    let stdout = match stdout {
        Some(handle) => walker::join_pipe(handle)?,
        None => Vec::new(),
    };
    if !status.success() {
        let stderr = match stderr {
            Some(handle) => walker::join_pipe(handle)?,
            None => Vec::new(),
        };
        return Err(SearchError::Traversal(format!(
            "git command failed: {}",
            String::from_utf8_lossy(&stderr).trim()
        )));
    }
    Ok(stdout)
}

impl HistoryWalker for GitCli {
    fn walk<'a>(&'a self, opts: &WalkOptions, cancel: &CancelFlag) -> Result<CommitIter<'a>, SearchError> {
        let args = Self::log_args(opts);
        debug!(repo = %self.repo_path.display(), args = ?args, "Spawning git log");
        let mut cmd = self.command();
        cmd.args(&args);
        Ok(Box::new(CommitStream::spawn(cmd, cancel.clone())?))
    }
}

impl RefStore for GitCli {
    fn list_refs(&self) -> Result<Vec<RefEntry>, SearchError> {
        let mut cmd = self.command();
        cmd.arg("for-each-ref")
            .arg(format!("--format=%(objectname){f}%(*objectname){f}%(refname)", f = FIELD_SEP));
        let stdout = run_git(&mut cmd)?;
        let text = String::from_utf8_lossy(&stdout);
        text.lines()
            .filter(|l| !l.trim().is_empty())
            .map(refs::parse_ref_line)
            .collect()
    }

    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool, SearchError> {
        let status = self
            .command()
            .args(["merge-base", "--is-ancestor", ancestor, descendant])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| SearchError::Traversal(format!("Failed to execute git: {}", e)))?;
        match status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(SearchError::Traversal(format!(
                "git merge-base --is-ancestor {} {} failed ({})",
                ancestor, descendant, status
            ))),
        }
    }
}

impl ContentReader for GitCli {
    fn read_file(&self, revision: &str, path: &str, cancel: &CancelFlag) -> Result<Vec<u8>, SearchError> {
        let mut cmd = self.command();
        cmd.args(["cat-file", "blob", &format!("{}:{}", revision, path)]);
        run_git_cancellable(&mut cmd, cancel)
    }
}

// ─── Test support ───────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod fake;

#[cfg(test)]
#[path = "git_tests.rs"]
mod tests;
