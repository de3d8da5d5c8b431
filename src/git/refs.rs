//! Ref provenance for commits: which refs point at a commit, and which
//! branch heads can reach it.
//!
//! The ref list is fetched once per resolver (one resolver per search), so
//! every commit in a search is annotated against the same snapshot.

use std::collections::BTreeSet;

use serde::Serialize;

use super::{RefStore, FIELD_SEP};
use crate::SearchError;

/// Prefix of branch head refs.
pub const BRANCH_PREFIX: &str = "refs/heads/";

/// A ref name and the commit it resolves to (annotated tags peeled).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RefEntry {
    pub name: String,
    pub target: String,
}

/// Parse `%(objectname)␞%(*objectname)␞%(refname)`; the peeled object
/// name wins when present.
pub(crate) fn parse_ref_line(line: &str) -> Result<RefEntry, SearchError> {
    let fields: Vec<&str> = line.splitn(3, FIELD_SEP).collect();
    if fields.len() != 3 {
        return Err(SearchError::Traversal(format!("malformed for-each-ref line: {:?}", line)));
    }
    let target = if fields[1].trim().is_empty() { fields[0] } else { fields[1] };
    Ok(RefEntry {
        name: fields[2].trim().to_string(),
        target: target.trim().to_lowercase(),
    })
}

/// Direct refs and source refs of one commit. Never absent, possibly empty.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Provenance {
    pub refs: BTreeSet<String>,
    pub source_refs: BTreeSet<String>,
}

pub struct RefResolver<'a> {
    store: &'a dyn RefStore,
    refs: Vec<RefEntry>,
}

impl<'a> RefResolver<'a> {
    /// Snapshot the repository's refs.
    pub fn load(store: &'a dyn RefStore) -> Result<Self, SearchError> {
        let mut refs = store.list_refs()?;
        refs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(Self { store, refs })
    }

    /// Names of refs whose target is exactly `commit_id`.
    pub fn direct_refs(&self, commit_id: &str) -> BTreeSet<String> {
        self.refs
            .iter()
            .filter(|r| r.target == commit_id)
            .map(|r| r.name.clone())
            .collect()
    }

    /// Names of branch heads from which `commit_id` is reachable.
    pub fn source_refs(&self, commit_id: &str) -> Result<BTreeSet<String>, SearchError> {
        let mut sources = BTreeSet::new();
        for head in self.refs.iter().filter(|r| r.name.starts_with(BRANCH_PREFIX)) {
            if head.target == commit_id || self.store.is_ancestor(commit_id, &head.target)? {
                sources.insert(head.name.clone());
            }
        }
        Ok(sources)
    }

    pub fn resolve(&self, commit_id: &str) -> Result<Provenance, SearchError> {
        Ok(Provenance {
            refs: self.direct_refs(commit_id),
            source_refs: self.source_refs(commit_id)?,
        })
    }
}
