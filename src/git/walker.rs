//! Streaming commit walker over `git log` output.
//!
//! Expected format (see [`GitCli::log_args`](super::GitCli)):
//! ```text
//! ␟<hash>␞<parents>␞<an>␞<ae>␞<at>␞<cn>␞<ce>␞<ct>␞<message>␞
//! <blank line>
//! diff --git ...            (only with -p)
//! ```
//!
//! Records are read line by line and emitted one at a time; the full
//! history is never held in memory. Dropping a [`CommitStream`] kills the
//! `git` child, which is how a bounded search stops the traversal early.

use std::io::{self, BufRead, BufReader, Read};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, warn};

use super::{CommitRecord, FIELD_SEP, RECORD_SEP};
use crate::{is_commit_id, CancelFlag, Commit, SearchError, Signature};

/// How often the watchdog checks the cancel flag while `git` is blocked.
pub(super) const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Bytes of `git` stderr kept for error messages; the rest is discarded.
pub(super) const MAX_STDERR: u64 = 16 * 1024;

/// Longest excerpt of a malformed record quoted in an error message.
const MAX_EXCERPT: usize = 100;

// ─── Record reader ──────────────────────────────────────────────────

/// Turns a `git log` byte stream into [`CommitRecord`]s, one per `next()`.
pub struct LogRecordReader<R> {
    reader: R,
    /// First line of the next record, already read.
    pending: Option<String>,
    done: bool,
}

impl<R: BufRead> LogRecordReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, pending: None, done: false }
    }

    /// Read one line (lossy UTF-8, terminator kept). `None` at EOF.
    fn read_line(&mut self) -> Result<Option<String>, SearchError> {
        let mut buf = Vec::new();
        let n = self
            .reader
            .read_until(b'\n', &mut buf)
            .map_err(|e| SearchError::Traversal(format!("IO error reading git log: {}", e)))?;
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }

    fn next_record(&mut self) -> Result<Option<CommitRecord>, SearchError> {
        let first = match self.pending.take() {
            Some(line) => line,
            None => loop {
                match self.read_line()? {
                    Some(line) if line.starts_with(RECORD_SEP) => break line,
                    Some(line) if line.trim().is_empty() => continue,
                    Some(line) => {
                        return Err(SearchError::Traversal(format!(
                            "unexpected git log output before first commit: {:?}",
                            excerpt(&line)
                        )));
                    }
                    None => return Ok(None),
                }
            },
        };

        let mut record = first;
        while let Some(line) = self.read_line()? {
            if line.starts_with(RECORD_SEP) {
                self.pending = Some(line);
                break;
            }
            record.push_str(&line);
        }

        parse_commit_record(&record).map(Some)
    }
}

impl<R: BufRead> Iterator for LogRecordReader<R> {
    type Item = Result<CommitRecord, SearchError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

fn excerpt(s: &str) -> &str {
    match s.char_indices().nth(MAX_EXCERPT) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn parse_timestamp(field: &str, what: &str) -> Result<i64, SearchError> {
    field
        .trim()
        .parse()
        .map_err(|_| SearchError::Traversal(format!("bad {} timestamp in git log: {:?}", what, field)))
}

/// Parse one `␟`-prefixed record (header, message and optional diff).
pub(crate) fn parse_commit_record(record: &str) -> Result<CommitRecord, SearchError> {
    let body = record.strip_prefix(RECORD_SEP).unwrap_or(record);
    let fields: Vec<&str> = body.splitn(9, FIELD_SEP).collect();
    if fields.len() < 9 {
        return Err(SearchError::Traversal(format!(
            "malformed git log record ({} fields, expected 9): {:?}",
            fields.len(),
            excerpt(record)
        )));
    }

    let id = fields[0].trim();
    if !is_commit_id(id) {
        return Err(SearchError::Traversal(format!("bad commit hash in git log: {:?}", id)));
    }

    // Message runs up to the closing separator; the rest is the diff.
    let (message, rest) = fields[8].split_once(FIELD_SEP).unwrap_or((fields[8], ""));

    let diff = rest.trim_matches(|c| c == '\n' || c == '\r');
    let diff = if diff.is_empty() { None } else { Some(format!("{}\n", diff)) };

    let commit = Commit {
        id: id.to_lowercase(),
        author: Signature {
            name: fields[2].to_string(),
            email: fields[3].to_string(),
            timestamp: parse_timestamp(fields[4], "author")?,
        },
        committer: Some(Signature {
            name: fields[5].to_string(),
            email: fields[6].to_string(),
            timestamp: parse_timestamp(fields[7], "committer")?,
        }),
        message: message.trim_end().to_string(),
        parents: fields[1].split_whitespace().map(str::to_string).collect(),
    };

    Ok(CommitRecord { commit, diff })
}

// ─── Child process stream ───────────────────────────────────────────

/// A running `git log` child plus the reader over its stdout.
///
/// A watchdog thread kills the child as soon as the cancel flag fires, so
/// cancellation also interrupts a read that is blocked on `git`.
pub struct CommitStream {
    records: LogRecordReader<BufReader<ChildStdout>>,
    child: Arc<Mutex<Child>>,
    cancel: CancelFlag,
    finished: Arc<AtomicBool>,
    stderr: Option<JoinHandle<Vec<u8>>>,
    exhausted: bool,
}

impl CommitStream {
    pub fn spawn(mut cmd: Command, cancel: CancelFlag) -> Result<Self, SearchError> {
        let mut child = cmd
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SearchError::Traversal(format!("Failed to execute git: {}. Is git installed and in PATH?", e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SearchError::Traversal("git stdout was not captured".to_string()))?;
        // Drained concurrently: a full stderr pipe would block git before stdout hits EOF.
        let stderr = child.stderr.take().map(|pipe| drain_pipe(pipe, MAX_STDERR));

        let child = Arc::new(Mutex::new(child));
        let finished = Arc::new(AtomicBool::new(false));
        spawn_watchdog(Arc::clone(&child), cancel.clone(), Arc::clone(&finished));

        Ok(Self {
            records: LogRecordReader::new(BufReader::new(stdout)),
            child,
            cancel,
            finished,
            stderr,
            exhausted: false,
        })
    }

    /// Reap the child after stdout hit EOF and turn a failure into an error.
    fn finish(&mut self) -> Result<(), SearchError> {
        self.finished.store(true, Ordering::Release);
        let status = self
            .child
            .lock()
            .map_err(|e| SearchError::Traversal(format!("git child lock poisoned: {}", e)))?
            .wait()?;
        let stderr = match self.stderr.take() {
            Some(handle) => join_pipe(handle)?,
            None => Vec::new(),
        };
        if self.cancel.is_cancelled() {
            return Err(SearchError::Cancelled);
        }
        if !status.success() {
            return Err(SearchError::Traversal(format!(
                "git log failed: {}",
                String::from_utf8_lossy(&stderr).trim()
            )));
        }
        debug!("git log finished");
        Ok(())
    }
}

/// Read a child pipe to EOF on its own thread, keeping at most `limit` bytes.
pub(super) fn drain_pipe<R: Read + Send + 'static>(mut pipe: R, limit: u64) -> JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut kept = Vec::new();
        if let Err(e) = pipe.by_ref().take(limit).read_to_end(&mut kept) {
            debug!(error = %e, "git pipe read failed");
        }
        let _ = io::copy(&mut pipe, &mut io::sink());
        kept
    })
}

pub(super) fn join_pipe(handle: JoinHandle<Vec<u8>>) -> Result<Vec<u8>, SearchError> {
    handle
        .join()
        .map_err(|_| SearchError::Traversal("git output reader thread panicked".to_string()))
}

fn spawn_watchdog(child: Arc<Mutex<Child>>, cancel: CancelFlag, finished: Arc<AtomicBool>) {
    std::thread::spawn(move || {
        while !finished.load(Ordering::Acquire) {
            if cancel.is_cancelled() {
                if let Ok(mut child) = child.lock() {
                    let _ = child.kill();
                }
                return;
            }
            std::thread::sleep(CANCEL_POLL_INTERVAL);
        }
    });
}

impl Iterator for CommitStream {
    type Item = Result<CommitRecord, SearchError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        if self.cancel.is_cancelled() {
            self.exhausted = true;
            return Some(Err(SearchError::Cancelled));
        }
        match self.records.next() {
            // A killed child can leave a truncated record behind.
            Some(_) if self.cancel.is_cancelled() => {
                self.exhausted = true;
                Some(Err(SearchError::Cancelled))
            }
            Some(item) => {
                if item.is_err() {
                    self.exhausted = true;
                }
                Some(item)
            }
            None => {
                self.exhausted = true;
                self.finish().err().map(Err)
            }
        }
    }
}

impl Drop for CommitStream {
    fn drop(&mut self) {
        if self.finished.swap(true, Ordering::AcqRel) {
            return;
        }
        // Stopped early (bound reached or error): don't leave git running.
        match self.child.lock() {
            Ok(mut child) => {
                let _ = child.kill();
                let _ = child.wait();
            }
            Err(e) => warn!(error = %e, "git child lock poisoned, leaving process to exit on SIGPIPE"),
        }
    }
}
