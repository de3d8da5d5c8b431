//! In-memory repository implementing every capability, for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{CommitIter, CommitRecord, ContentReader, HistoryWalker, RefEntry, RefStore, WalkOptions};
use crate::{CancelFlag, Commit, SearchError, Signature};

/// Deterministic 40-hex-char commit id for test commit number `n`.
pub(crate) fn oid(n: u32) -> String {
    format!("{:040x}", n)
}

#[derive(Default)]
pub(crate) struct FakeRepo {
    /// Newest first, as a walk emits them.
    pub commits: Vec<CommitRecord>,
    pub refs: Vec<RefEntry>,
    pub files: HashMap<(String, String), Vec<u8>>,
    /// Emit a traversal error after this many commits.
    pub fail_after: Option<usize>,
    pub walks: AtomicUsize,
    pub reads: AtomicUsize,
    pub ancestry_queries: AtomicUsize,
}

impl FakeRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a commit. Add them newest first, the order a walk emits.
    pub fn commit(mut self, id: &str, parents: &[&str], message: &str, timestamp: i64, diff: Option<&str>) -> Self {
        let sig = Signature { name: "a".to_string(), email: "a@a.com".to_string(), timestamp };
        self.commits.push(CommitRecord {
            commit: Commit {
                id: id.to_string(),
                author: sig.clone(),
                committer: Some(sig),
                message: message.to_string(),
                parents: parents.iter().map(|p| p.to_string()).collect(),
            },
            diff: diff.map(str::to_string),
        });
        self
    }

    pub fn with_ref(mut self, name: &str, target: &str) -> Self {
        self.refs.push(RefEntry { name: name.to_string(), target: target.to_string() });
        self
    }

    pub fn with_file(mut self, revision: &str, path: &str, content: &str) -> Self {
        self.files.insert((revision.to_string(), path.to_string()), content.as_bytes().to_vec());
        self
    }

    fn parents_of(&self, id: &str) -> &[String] {
        self.commits
            .iter()
            .find(|c| c.commit.id == id)
            .map(|c| c.commit.parents.as_slice())
            .unwrap_or(&[])
    }

    fn reachable_from(&self, starts: &[String]) -> HashSet<String> {
        let mut seen = HashSet::new();
        let mut stack: Vec<String> = starts.to_vec();
        while let Some(id) = stack.pop() {
            if seen.insert(id.clone()) {
                stack.extend(self.parents_of(&id).iter().cloned());
            }
        }
        seen
    }

    fn resolve_rev(&self, rev: &str) -> String {
        self.refs
            .iter()
            .find(|r| r.name == rev || r.name == format!("refs/heads/{}", rev))
            .map(|r| r.target.clone())
            .unwrap_or_else(|| rev.to_string())
    }
}

impl HistoryWalker for FakeRepo {
    fn walk<'a>(&'a self, opts: &WalkOptions, cancel: &CancelFlag) -> Result<CommitIter<'a>, SearchError> {
        self.walks.fetch_add(1, Ordering::SeqCst);
        let starts: Vec<String> = if opts.refs.is_empty() {
            self.refs
                .iter()
                .filter(|r| r.name.starts_with("refs/heads/"))
                .map(|r| r.target.clone())
                .collect()
        } else {
            opts.refs.iter().map(|r| self.resolve_rev(r)).collect()
        };
        let reachable = self.reachable_from(&starts);

        let mut records: Vec<CommitRecord> = self
            .commits
            .iter()
            .filter(|c| reachable.contains(&c.commit.id))
            .cloned()
            .collect();
        if !opts.include_diff {
            for r in &mut records {
                r.diff = None;
            }
        }

        let cancel = cancel.clone();
        let fail_after = self.fail_after;
        let mut emitted = 0usize;
        let mut records = records.into_iter();
        let mut stopped = false;
        Ok(Box::new(std::iter::from_fn(move || {
            if stopped {
                return None;
            }
            if cancel.is_cancelled() {
                stopped = true;
                return Some(Err(SearchError::Cancelled));
            }
            if fail_after == Some(emitted) {
                stopped = true;
                return Some(Err(SearchError::Traversal("injected failure".to_string())));
            }
            emitted += 1;
            records.next().map(Ok)
        })))
    }
}

impl RefStore for FakeRepo {
    fn list_refs(&self) -> Result<Vec<RefEntry>, SearchError> {
        Ok(self.refs.clone())
    }

    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool, SearchError> {
        self.ancestry_queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.reachable_from(&[descendant.to_string()]).contains(ancestor))
    }
}

impl ContentReader for FakeRepo {
    fn read_file(&self, revision: &str, path: &str, cancel: &CancelFlag) -> Result<Vec<u8>, SearchError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if cancel.is_cancelled() {
            return Err(SearchError::Cancelled);
        }
        self.files
            .get(&(revision.to_string(), path.to_string()))
            .cloned()
            .ok_or_else(|| SearchError::Traversal(format!("path {} does not exist at {}", path, revision)))
    }
}
