//! Unified error type for the diff search engine.

use std::sync::Arc;

use thiserror::Error;

/// All errors that can occur in search, parse, apply and pagination operations.
///
/// `Clone` so that a memoized failure can be handed to every caller that
/// raced on the same lazy computation.
#[derive(Error, Debug, Clone)]
pub enum SearchError {
    /// The history traversal capability (the `git` process) failed.
    #[error("Traversal failed: {0}")]
    Traversal(String),

    /// The caller aborted the traversal.
    #[error("Traversal cancelled")]
    Cancelled,

    /// Malformed unified diff text. `line` is 1-based.
    #[error("Diff parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// A hunk could not be applied to the content it was given.
    #[error("Cannot apply hunk at original line {start_line}: {message}")]
    PatchApply { start_line: usize, message: String },

    /// Pagination cursor was not numeric or pointed past the end.
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    /// Invalid regex pattern
    #[error("Invalid regex pattern '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// I/O error (file read, process pipes)
    #[error("I/O error: {0}")]
    Io(Arc<std::io::Error>),

    /// Mutually exclusive flags or other argument validation error
    #[error("{0}")]
    InvalidArgs(String),
}

impl From<std::io::Error> for SearchError {
    fn from(err: std::io::Error) -> Self {
        SearchError::Io(Arc::new(err))
    }
}

impl SearchError {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        SearchError::Parse { line, message: message.into() }
    }
}
