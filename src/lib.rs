//! # diffsearch: commit history diff search and patch reconstruction
//!
//! Streams commit history out of `git`, filters it by message and diff
//! content, and annotates every hit with the refs that point at it or reach
//! it. Independently parses unified diffs, paginates the file diffs of a
//! patch, rolls up diff stats and reconstructs post-patch file content
//! without a working copy.
//!
//! ## Library usage
//!
//! The `diffsearch` binary is a thin CLI over this library. History
//! traversal, ref listing and file reads go through the traits in [`git`],
//! so every engine in here can be driven by an in-memory fake.

use serde::{Serialize, Serializer};

pub mod cancel;
pub mod diff;
pub mod error;
pub mod git;
pub mod memo;
pub mod patch;
pub mod search;

pub use cancel::CancelFlag;
pub use diff::{parse_multi_file_diff, print_file_diffs, DiffStat, FileDiff, Hunk, LineKind};
pub use error::SearchError;
pub use patch::{apply_hunks, FileDiffConnection, PageInfo, Patch, PatchResolver};
pub use search::{DiffSearch, PathOptions, SearchBound, SearchOptions, SearchOutcome, SearchResult, TextSearchOptions};

// ─── Commit model ───────────────────────────────────────────────────

/// Author or committer identity plus the moment it was recorded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Signature {
    pub name: String,
    pub email: String,
    /// Unix timestamp (seconds since epoch, UTC).
    #[serde(rename = "date", serialize_with = "serialize_rfc3339")]
    pub timestamp: i64,
}

/// A single commit as streamed by the walker. Never mutated after creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Commit {
    /// 40-char lowercase hex object name.
    pub id: String,
    pub author: Signature,
    pub committer: Option<Signature>,
    pub message: String,
    pub parents: Vec<String>,
}

/// True if `s` looks like a full SHA-1 object name (40 hex chars).
#[must_use]
pub fn is_commit_id(s: &str) -> bool {
    s.len() == 40 && s.chars().all(|c| c.is_ascii_hexdigit())
}

// ─── Time formatting ────────────────────────────────────────────────

/// Format a Unix timestamp as an RFC 3339 UTC string (`YYYY-MM-DDTHH:MM:SSZ`).
#[must_use]
pub fn format_rfc3339(timestamp: i64) -> String {
    let secs_per_day: i64 = 86400;
    let days = timestamp.div_euclid(secs_per_day);
    let time_of_day = timestamp.rem_euclid(secs_per_day);
    let hours = time_of_day / 3600;
    let minutes = (time_of_day % 3600) / 60;
    let seconds = time_of_day % 60;

    // Civil-from-days (proleptic Gregorian)
    let days_civil = days + 719468;
    let era = days_civil.div_euclid(146097);
    let doe = (days_civil - era * 146097) as u32;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };

    format!("{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z", y, m, d, hours, minutes, seconds)
}

fn serialize_rfc3339<S: Serializer>(timestamp: &i64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_rfc3339(*timestamp))
}
