//! Cursor pagination over the file diffs of one patch.
//!
//! A cursor is the decimal count of file diffs returned so far. `totalCount`
//! is only disclosed on the page that reaches the end of the sequence.

use serde::Serialize;

use super::PatchResolver;
use crate::diff::{DiffStat, FileDiff, Hunk};
use crate::memo::Memo;
use crate::SearchError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    /// Present iff `has_next_page`.
    pub end_cursor: Option<String>,
}

/// Half-open window `[start, end)` into the parsed file diffs.
#[derive(Clone, Copy, Debug)]
struct Window {
    start: usize,
    end: usize,
    total: usize,
}

impl Window {
    fn has_next_page(&self) -> bool {
        self.end < self.total
    }
}

/// Parse a cursor. Empty means "from the start".
fn parse_cursor(after: Option<&str>, total: usize) -> Result<usize, SearchError> {
    let Some(cursor) = after.filter(|c| !c.is_empty()) else {
        return Ok(0);
    };
    // Only the canonical form `end_cursor` emits: no sign, no leading zeros.
    let canonical = cursor.bytes().all(|b| b.is_ascii_digit()) && (cursor == "0" || !cursor.starts_with('0'));
    let position: usize = canonical
        .then(|| cursor.parse().ok())
        .flatten()
        .ok_or_else(|| SearchError::InvalidCursor(format!("cursor {:?} is not a non-negative integer", cursor)))?;
    if position > total {
        return Err(SearchError::InvalidCursor(format!(
            "cursor {} is past the end of {} file diffs",
            position, total
        )));
    }
    Ok(position)
}

/// One page request against a [`PatchResolver`]. Every accessor derives
/// from the same memoized parse and the same memoized window.
pub struct FileDiffConnection<'r> {
    resolver: &'r PatchResolver,
    first: Option<usize>,
    after: Option<String>,
    window: Memo<Window>,
}

impl<'r> FileDiffConnection<'r> {
    pub(crate) fn new(resolver: &'r PatchResolver, first: Option<usize>, after: Option<String>) -> Self {
        Self { resolver, first, after, window: Memo::new() }
    }

    fn window(&self) -> Result<Window, SearchError> {
        self.window
            .get_or_try_init(|| {
                let total = self.resolver.file_diffs()?.len();
                let start = parse_cursor(self.after.as_deref(), total)?;
                let end = match self.first {
                    Some(first) => start.saturating_add(first).min(total),
                    None => total,
                };
                Ok(Window { start, end, total })
            })
            .copied()
    }

    /// File diffs strictly after the cursor, at most `first` of them.
    pub fn nodes(&self) -> Result<&'r [FileDiff], SearchError> {
        let window = self.window()?;
        Ok(&self.resolver.file_diffs()?[window.start..window.end])
    }

    pub fn page_info(&self) -> Result<PageInfo, SearchError> {
        let window = self.window()?;
        let has_next_page = window.has_next_page();
        Ok(PageInfo {
            has_next_page,
            end_cursor: has_next_page.then(|| window.end.to_string()),
        })
    }

    /// Number of file diffs in the patch, withheld while pages remain.
    pub fn total_count(&self) -> Result<Option<usize>, SearchError> {
        let window = self.window()?;
        Ok((!window.has_next_page()).then_some(window.total))
    }

    /// The patch text exactly as stored.
    pub fn raw_diff(&self) -> &'r str {
        &self.resolver.patch().raw_diff
    }

    /// Stat of the whole patch, not just this page.
    pub fn diff_stat(&self) -> Result<DiffStat, SearchError> {
        self.resolver.diff_stat()
    }

    /// Everything a page response carries, ready for serialization.
    pub fn to_page(&self, include_raw_diff: bool) -> Result<ConnectionPage<'r>, SearchError> {
        Ok(ConnectionPage {
            nodes: self.nodes()?.iter().map(FileDiffNode::from).collect(),
            page_info: self.page_info()?,
            total_count: self.total_count()?,
            diff_stat: self.diff_stat()?,
            raw_diff: include_raw_diff.then(|| self.raw_diff()),
        })
    }
}

/// Serializable view of a [`FileDiff`].
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDiffNode<'a> {
    pub old_path: Option<&'a str>,
    pub new_path: Option<&'a str>,
    pub hunks: &'a [Hunk],
    pub stat: DiffStat,
}

impl<'a> From<&'a FileDiff> for FileDiffNode<'a> {
    fn from(diff: &'a FileDiff) -> Self {
        Self {
            old_path: diff.old_path(),
            new_path: diff.new_path(),
            hunks: &diff.hunks,
            stat: diff.stat,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionPage<'a> {
    pub nodes: Vec<FileDiffNode<'a>>,
    pub page_info: PageInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_count: Option<usize>,
    pub diff_stat: DiffStat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_diff: Option<&'a str>,
}
