//! Patches: stored multi-file diffs against a base revision, resolved
//! lazily into file diffs, stats, pages and reconstructed file content.
//!
//! A [`PatchResolver`] is created per request. Its parse runs at most once
//! no matter how many accessors (or threads) ask for derived values.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::diff::stat::sum_file_diffs;
use crate::diff::{parse_multi_file_diff, DiffStat, FileDiff};
use crate::git::ContentReader;
use crate::memo::Memo;
use crate::{CancelFlag, SearchError};

mod apply;
mod connection;

pub use apply::apply_hunks;
pub use connection::{ConnectionPage, FileDiffConnection, FileDiffNode, PageInfo};

/// A multi-file unified diff tied to a repository and base revision.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Patch {
    pub repository: String,
    pub base_revision: String,
    pub base_ref: String,
    pub raw_diff: String,
    /// Stat persisted alongside the patch; used instead of parsing.
    pub stored_stat: Option<DiffStat>,
}

impl Patch {
    pub fn new(raw_diff: impl Into<String>) -> Self {
        Self { raw_diff: raw_diff.into(), ..Default::default() }
    }

    pub fn with_base(mut self, repository: &str, base_revision: &str, base_ref: &str) -> Self {
        self.repository = repository.to_string();
        self.base_revision = base_revision.to_string();
        self.base_ref = base_ref.to_string();
        self
    }

    pub fn with_stored_stat(mut self, stat: DiffStat) -> Self {
        self.stored_stat = Some(stat);
        self
    }
}

pub struct PatchResolver {
    patch: Patch,
    reader: Option<Arc<dyn ContentReader>>,
    file_diffs: Memo<Vec<FileDiff>>,
    parses: AtomicUsize,
}

impl PatchResolver {
    pub fn new(patch: Patch) -> Self {
        Self { patch, reader: None, file_diffs: Memo::new(), parses: AtomicUsize::new(0) }
    }

    /// Attach the repository reader used for old/new file content.
    pub fn with_reader(mut self, reader: Arc<dyn ContentReader>) -> Self {
        self.reader = Some(reader);
        self
    }

    pub fn patch(&self) -> &Patch {
        &self.patch
    }

    /// The parsed file diffs, parsed on first access.
    pub fn file_diffs(&self) -> Result<&[FileDiff], SearchError> {
        self.file_diffs
            .get_or_try_init(|| {
                self.parses.fetch_add(1, Ordering::SeqCst);
                let start = Instant::now();
                let diffs = parse_multi_file_diff(&self.patch.raw_diff)?;
                info!(
                    repo = %self.patch.repository,
                    rev = %self.patch.base_revision,
                    files = diffs.len(),
                    bytes = self.patch.raw_diff.len(),
                    elapsed_ms = format_args!("{:.2}", start.elapsed().as_secs_f64() * 1000.0),
                    "Parsed patch"
                );
                Ok(diffs)
            })
            .map(Vec::as_slice)
    }

    /// How many times the raw diff has actually been parsed (0 or 1).
    pub fn parse_count(&self) -> usize {
        self.parses.load(Ordering::SeqCst)
    }

    /// Stored stat when present, otherwise the sum over the parsed diffs.
    pub fn diff_stat(&self) -> Result<DiffStat, SearchError> {
        if let Some(stat) = self.patch.stored_stat {
            return Ok(stat);
        }
        Ok(sum_file_diffs(self.file_diffs()?))
    }

    /// A page of file diffs. `after` of `None` or `""` starts at the
    /// beginning; `first` of `None` takes everything remaining.
    pub fn file_diff_connection(&self, first: Option<usize>, after: Option<String>) -> FileDiffConnection<'_> {
        FileDiffConnection::new(self, first, after)
    }

    /// File diff whose old or new path equals `path`.
    pub fn find_file_diff(&self, path: &str) -> Result<Option<&FileDiff>, SearchError> {
        Ok(self
            .file_diffs()?
            .iter()
            .find(|d| d.new_path() == Some(path) || d.old_path() == Some(path)))
    }

    fn reader(&self) -> Result<&dyn ContentReader, SearchError> {
        self.reader
            .as_deref()
            .ok_or_else(|| SearchError::InvalidArgs("patch resolver has no repository reader".to_string()))
    }

    /// Content of the file before the patch, `None` for an added file.
    pub fn old_file_content(&self, diff: &FileDiff, cancel: &CancelFlag) -> Result<Option<String>, SearchError> {
        let Some(path) = diff.old_path() else {
            return Ok(None);
        };
        let bytes = self.reader()?.read_file(&self.patch.base_revision, path, cancel)?;
        Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// Content of the file after the patch, `None` for a deleted file.
    /// Added files are built from empty content.
    pub fn new_file_content(&self, diff: &FileDiff, cancel: &CancelFlag) -> Result<Option<String>, SearchError> {
        if diff.is_deletion() {
            return Ok(None);
        }
        let original = match self.old_file_content(diff, cancel)? {
            Some(content) => content,
            None => String::new(),
        };
        debug!(path = %diff.path(), hunks = diff.hunks.len(), "Applying hunks to base content");
        apply_hunks(&original, &diff.hunks).map(Some)
    }
}

/// Roll up the stats of a set of patches.
pub fn sum_patch_stats(resolvers: &[PatchResolver]) -> Result<DiffStat, SearchError> {
    resolvers.iter().map(PatchResolver::diff_stat).sum()
}

#[cfg(test)]
#[path = "patch_tests.rs"]
mod tests;
