//! Diff search over commit history.
//!
//! One streaming pass per search: commits come from a [`HistoryWalker`],
//! their diffs are parsed and path-filtered, the text pattern is matched
//! against the message and the added/removed lines, and every hit is
//! annotated with ref provenance. The scan ends either `Exhausted` (history
//! ran out, `complete = true`) or `Bounded` (result count or deadline hit,
//! `complete = false`); results already emitted are kept as they are.

use std::collections::BTreeSet;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use regex::{Regex, RegexBuilder};
use serde::Serialize;
use tracing::{debug, info};

use crate::diff::{parse_multi_file_diff, print_file_diffs, FileDiff, LineKind};
use crate::git::{HistoryWalker, RefResolver, RefStore, WalkOptions};
use crate::{CancelFlag, Commit, SearchError};

// ─── Options ────────────────────────────────────────────────────────

/// Text query. An empty pattern matches every commit.
#[derive(Clone, Debug, Default)]
pub struct TextSearchOptions {
    pub pattern: String,
    pub is_regexp: bool,
    pub is_case_sensitive: bool,
}

/// Path filters applied to the file diffs of each commit.
#[derive(Clone, Debug, Default)]
pub struct PathOptions {
    /// A file diff must match all of these.
    pub include_patterns: Vec<String>,
    /// A file diff must not match this.
    pub exclude_pattern: Option<String>,
    pub is_regexp: bool,
    pub is_case_sensitive: bool,
}

impl PathOptions {
    pub fn is_active(&self) -> bool {
        !self.include_patterns.is_empty() || self.exclude_pattern.as_deref().is_some_and(|p| !p.is_empty())
    }
}

/// Stop the scan early. `None` means unbounded.
#[derive(Clone, Debug, Default)]
pub struct SearchBound {
    pub max_results: Option<usize>,
    pub max_duration: Option<Duration>,
}

#[derive(Clone, Debug)]
pub struct SearchOptions {
    /// Starting revisions; empty means all branch heads.
    pub refs: Vec<String>,
    pub query: TextSearchOptions,
    pub paths: PathOptions,
    /// Match the pattern against commit messages.
    pub match_message: bool,
    /// Match the pattern against added/removed diff lines.
    pub match_diff: bool,
    /// Attach the (path-filtered) raw diff to each result.
    pub include_diff: bool,
    pub bound: SearchBound,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            refs: Vec::new(),
            query: TextSearchOptions::default(),
            paths: PathOptions::default(),
            match_message: true,
            match_diff: true,
            include_diff: false,
            bound: SearchBound::default(),
        }
    }
}

// ─── Results ────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub commit: Commit,
    pub diff: Option<String>,
    /// Refs pointing exactly at the commit.
    pub refs: BTreeSet<String>,
    /// Branch heads the commit is reachable from.
    pub source_refs: BTreeSet<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SearchOutcome {
    pub results: Vec<SearchResult>,
    /// False when a bound stopped the scan before history ran out.
    pub complete: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ScanState {
    Scanning,
    Bounded,
    Exhausted,
}

// ─── Matchers ───────────────────────────────────────────────────────

fn build_regex(pattern: &str, is_regexp: bool, case_sensitive: bool) -> Result<Regex, SearchError> {
    let source = if is_regexp { pattern.to_string() } else { regex::escape(pattern) };
    RegexBuilder::new(&source)
        .case_insensitive(!case_sensitive)
        .build()
        .map_err(|e| SearchError::InvalidRegex { pattern: pattern.to_string(), source: e })
}

struct PathFilter {
    include: Vec<Regex>,
    exclude: Option<Regex>,
}

impl PathFilter {
    fn new(opts: &PathOptions) -> Result<Option<Self>, SearchError> {
        if !opts.is_active() {
            return Ok(None);
        }
        let include = opts
            .include_patterns
            .iter()
            .map(|p| build_regex(p, opts.is_regexp, opts.is_case_sensitive))
            .collect::<Result<Vec<_>, _>>()?;
        let exclude = match opts.exclude_pattern.as_deref() {
            Some(p) if !p.is_empty() => Some(build_regex(p, opts.is_regexp, opts.is_case_sensitive)?),
            _ => None,
        };
        Ok(Some(Self { include, exclude }))
    }

    fn matches_path(&self, path: &str) -> bool {
        self.include.iter().all(|re| re.is_match(path))
            && !self.exclude.as_ref().is_some_and(|re| re.is_match(path))
    }

    /// A file diff passes if either of its paths does (renames).
    fn matches(&self, diff: &FileDiff) -> bool {
        [diff.new_path(), diff.old_path()]
            .into_iter()
            .flatten()
            .any(|p| self.matches_path(p))
    }
}

fn diff_lines_match(re: &Regex, diffs: &[FileDiff]) -> bool {
    diffs.iter().flat_map(|d| d.hunks.iter()).any(|h| {
        h.lines()
            .any(|(kind, text)| matches!(kind, LineKind::Added | LineKind::Removed) && re.is_match(text))
    })
}

// ─── Engine ─────────────────────────────────────────────────────────

/// Search engine bound to one repository's capabilities.
pub struct DiffSearch<'a> {
    walker: &'a dyn HistoryWalker,
    refs: &'a dyn RefStore,
}

impl<'a> DiffSearch<'a> {
    pub fn new(walker: &'a dyn HistoryWalker, refs: &'a dyn RefStore) -> Self {
        Self { walker, refs }
    }

    pub fn search(&self, opts: &SearchOptions, cancel: &CancelFlag) -> Result<SearchOutcome, SearchError> {
        let start = Instant::now();
        let matcher = if opts.query.pattern.is_empty() {
            None
        } else {
            Some(build_regex(&opts.query.pattern, opts.query.is_regexp, opts.query.is_case_sensitive)?)
        };
        let path_filter = PathFilter::new(&opts.paths)?;
        let need_diff = opts.include_diff || path_filter.is_some() || (matcher.is_some() && opts.match_diff);

        let resolver = RefResolver::load(self.refs)?;

        // The deadline fires a child scope so a read blocked on the walker
        // is interrupted too; the caller's own flag stays untouched.
        let scan_cancel = cancel.child();
        let _deadline = opts.bound.max_duration.map(|d| DeadlineTimer::start(d, scan_cancel.clone()));
        let deadline_hit = |now: Instant| opts.bound.max_duration.is_some_and(|d| now.duration_since(start) >= d);

        let walk = WalkOptions { refs: opts.refs.clone(), include_diff: need_diff };
        let stream = self.walker.walk(&walk, &scan_cancel)?;

        let mut results: Vec<SearchResult> = Vec::new();
        let mut state = ScanState::Scanning;
        let mut scanned = 0usize;

        for item in stream {
            if deadline_hit(Instant::now()) {
                state = ScanState::Bounded;
                break;
            }
            let record = match item {
                Ok(record) => record,
                Err(SearchError::Cancelled) if !cancel.is_cancelled() && deadline_hit(Instant::now()) => {
                    state = ScanState::Bounded;
                    break;
                }
                Err(e) => return Err(e),
            };
            scanned += 1;

            let mut file_diffs = match record.diff.as_deref() {
                Some(raw) => parse_multi_file_diff(raw)?,
                None => Vec::new(),
            };
            if let Some(filter) = &path_filter {
                file_diffs.retain(|d| filter.matches(d));
                if file_diffs.is_empty() {
                    continue;
                }
            }

            let matched = match &matcher {
                None => true,
                Some(re) => {
                    (opts.match_message && re.is_match(&record.commit.message))
                        || (opts.match_diff && diff_lines_match(re, &file_diffs))
                }
            };
            if !matched {
                continue;
            }

            let provenance = resolver.resolve(&record.commit.id)?;
            let diff = if !opts.include_diff {
                None
            } else if path_filter.is_some() {
                Some(print_file_diffs(&file_diffs))
            } else {
                record.diff
            };

            results.push(SearchResult {
                commit: record.commit,
                diff,
                refs: provenance.refs,
                source_refs: provenance.source_refs,
            });

            if opts.bound.max_results.is_some_and(|max| results.len() >= max) {
                state = ScanState::Bounded;
                break;
            }
        }

        if state == ScanState::Scanning {
            state = ScanState::Exhausted;
        }
        if state == ScanState::Bounded {
            debug!(results = results.len(), scanned, "Search bound reached, stopping walk");
        }
        info!(
            results = results.len(),
            scanned,
            complete = state == ScanState::Exhausted,
            elapsed_ms = format_args!("{:.1}", start.elapsed().as_secs_f64() * 1000.0),
            "Diff search finished"
        );

        Ok(SearchOutcome { results, complete: state == ScanState::Exhausted })
    }
}

/// Cancels a scope once `after` elapses, unless dropped first.
struct DeadlineTimer {
    _stop: mpsc::Sender<()>,
}

impl DeadlineTimer {
    fn start(after: Duration, scope: CancelFlag) -> Self {
        let (stop, stopped) = mpsc::channel::<()>();
        std::thread::spawn(move || {
            if let Err(mpsc::RecvTimeoutError::Timeout) = stopped.recv_timeout(after) {
                scope.cancel();
            }
        });
        Self { _stop: stop }
    }
}

// ─── Multi-repository search ────────────────────────────────────────

/// Search several repositories concurrently, one thread and one child
/// cancellation scope per repository. Results come back in input order.
pub fn search_many<R>(repos: &[R], opts: &SearchOptions, cancel: &CancelFlag) -> Vec<Result<SearchOutcome, SearchError>>
where
    R: HistoryWalker + RefStore,
{
    std::thread::scope(|scope| {
        let handles: Vec<_> = repos
            .iter()
            .map(|repo| {
                let scope_cancel = cancel.child();
                scope.spawn(move || DiffSearch::new(repo, repo).search(opts, &scope_cancel))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| {
                h.join()
                    .unwrap_or_else(|_| Err(SearchError::Traversal("search thread panicked".to_string())))
            })
            .collect()
    })
}

#[cfg(test)]
#[path = "search_tests.rs"]
mod tests;
