//! Diff statistics and their aggregation across file diffs and patches.
//!
//! A single file's stat pairs up removed and added lines: every pair counts
//! as one *changed* line, whatever is left over is purely added or deleted.
//! Aggregated stats are plain field-wise sums.

use std::iter::Sum;
use std::ops::{Add, AddAssign};

use serde::Serialize;

use super::{FileDiff, Hunk};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DiffStat {
    pub added: u32,
    pub deleted: u32,
    pub changed: u32,
}

impl DiffStat {
    /// Pair raw `+`/`-` counts: `changed = min(added, deleted)`.
    #[must_use]
    pub fn from_raw_counts(raw_added: u32, raw_deleted: u32) -> Self {
        let changed = raw_added.min(raw_deleted);
        DiffStat {
            added: raw_added - changed,
            deleted: raw_deleted - changed,
            changed,
        }
    }

    /// Stat for one file, pairing across all of its hunks.
    #[must_use]
    pub fn for_hunks(hunks: &[Hunk]) -> Self {
        let (added, deleted) = hunks.iter().map(Hunk::raw_counts).fold((0, 0), |(a, d), (ha, hd)| (a + ha, d + hd));
        Self::from_raw_counts(added, deleted)
    }

    /// Total number of lines touched.
    pub fn total(&self) -> u32 {
        self.added + self.deleted + self.changed
    }
}

impl Add for DiffStat {
    type Output = DiffStat;

    fn add(self, rhs: DiffStat) -> DiffStat {
        DiffStat {
            added: self.added + rhs.added,
            deleted: self.deleted + rhs.deleted,
            changed: self.changed + rhs.changed,
        }
    }
}

impl AddAssign for DiffStat {
    fn add_assign(&mut self, rhs: DiffStat) {
        *self = *self + rhs;
    }
}

impl Sum for DiffStat {
    fn sum<I: Iterator<Item = DiffStat>>(iter: I) -> DiffStat {
        iter.fold(DiffStat::default(), Add::add)
    }
}

impl<'a> Sum<&'a DiffStat> for DiffStat {
    fn sum<I: Iterator<Item = &'a DiffStat>>(iter: I) -> DiffStat {
        iter.copied().sum()
    }
}

/// Roll up the per-file stats of a parsed diff.
#[must_use]
pub fn sum_file_diffs(diffs: &[FileDiff]) -> DiffStat {
    diffs.iter().map(|d| d.stat).sum()
}
