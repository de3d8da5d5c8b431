//! Unified diff model: per-file diffs, hunks and their change statistics.
//!
//! Parsed diffs keep every header line and hunk body line verbatim, so
//! [`print_file_diffs`] reproduces the input byte for byte.

use serde::Serialize;

mod parser;
pub mod stat;

pub use parser::{parse_file_diff, parse_multi_file_diff};
pub use stat::DiffStat;

/// Path sentinel for "this side of the diff does not exist".
pub const DEV_NULL: &str = "/dev/null";

// ─── Types ──────────────────────────────────────────────────────────

/// All changes to a single file inside a (possibly multi-file) diff.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileDiff {
    /// Old file name as written in the `--- ` header (`/dev/null` for additions).
    pub orig_name: String,
    /// New file name as written in the `+++ ` header (`/dev/null` for deletions).
    pub new_name: String,
    /// Header lines preceding the first hunk (`diff --git`, `index`, modes,
    /// `---`/`+++`), verbatim including line terminators.
    pub header: Vec<String>,
    pub hunks: Vec<Hunk>,
    pub stat: DiffStat,
}

/// One contiguous region of change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Hunk {
    pub orig_start_line: usize,
    pub orig_lines: usize,
    pub new_start_line: usize,
    pub new_lines: usize,
    /// Text after the closing `@@`, usually the enclosing function.
    pub section: Option<String>,
    /// The `@@ ... @@` line, verbatim.
    #[serde(skip)]
    pub header: String,
    /// Body lines including their `' '`/`+`/`-`/`\` markers and terminators.
    pub body: String,
    /// A `\ No newline at end of file` marker appears in the body.
    pub no_newline_at_end: bool,
}

/// Classification of a hunk body line by its leading marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineKind {
    Context,
    Added,
    Removed,
    /// `\ No newline at end of file`
    NoNewline,
}

// ─── Hunk ───────────────────────────────────────────────────────────

impl Hunk {
    /// Build a hunk from its original start line and a raw body, deriving
    /// the line counts from the body. The new start line is assumed equal
    /// to the original one.
    pub fn from_body(orig_start_line: usize, body: &str) -> Self {
        let mut hunk = Hunk {
            orig_start_line,
            orig_lines: 0,
            new_start_line: orig_start_line,
            new_lines: 0,
            section: None,
            header: String::new(),
            body: body.to_string(),
            no_newline_at_end: false,
        };
        let kinds: Vec<LineKind> = hunk.lines().map(|(kind, _)| kind).collect();
        for kind in kinds {
            match kind {
                LineKind::Context => {
                    hunk.orig_lines += 1;
                    hunk.new_lines += 1;
                }
                LineKind::Removed => hunk.orig_lines += 1,
                LineKind::Added => hunk.new_lines += 1,
                LineKind::NoNewline => hunk.no_newline_at_end = true,
            }
        }
        hunk.header = format!(
            "@@ -{},{} +{},{} @@\n",
            hunk.orig_start_line, hunk.orig_lines, hunk.new_start_line, hunk.new_lines
        );
        hunk
    }

    /// Iterate body lines as `(kind, content)`, content without marker or
    /// line terminator. An empty body line counts as empty context.
    pub fn lines(&self) -> impl Iterator<Item = (LineKind, &str)> {
        self.body.split_inclusive('\n').map(|raw| {
            let line = raw.strip_suffix('\n').unwrap_or(raw);
            match line.as_bytes().first() {
                Some(b'+') => (LineKind::Added, &line[1..]),
                Some(b'-') => (LineKind::Removed, &line[1..]),
                Some(b'\\') => (LineKind::NoNewline, &line[1..]),
                Some(b' ') => (LineKind::Context, &line[1..]),
                _ => (LineKind::Context, line),
            }
        })
    }

    /// Raw `+`/`-` line counts in the body.
    pub fn raw_counts(&self) -> (u32, u32) {
        self.lines().fold((0, 0), |(added, removed), (kind, _)| match kind {
            LineKind::Added => (added + 1, removed),
            LineKind::Removed => (added, removed + 1),
            _ => (added, removed),
        })
    }
}

// ─── FileDiff ───────────────────────────────────────────────────────

/// Strip a `a/`-style prefix and any tab-separated timestamp from a header name.
fn display_path<'a>(name: &'a str, prefix: &str) -> Option<&'a str> {
    if name == DEV_NULL {
        return None;
    }
    Some(name.strip_prefix(prefix).unwrap_or(name))
}

impl FileDiff {
    /// Old path without the `a/` prefix, `None` if the file was added.
    pub fn old_path(&self) -> Option<&str> {
        display_path(&self.orig_name, "a/")
    }

    /// New path without the `b/` prefix, `None` if the file was deleted.
    pub fn new_path(&self) -> Option<&str> {
        display_path(&self.new_name, "b/")
    }

    /// The path used for filtering and display: new path, else old path.
    pub fn path(&self) -> &str {
        self.new_path().or_else(|| self.old_path()).unwrap_or(DEV_NULL)
    }

    pub fn is_addition(&self) -> bool {
        self.orig_name == DEV_NULL
    }

    pub fn is_deletion(&self) -> bool {
        self.new_name == DEV_NULL
    }

    /// Append this file diff's exact text to `out`.
    pub fn write_raw(&self, out: &mut String) {
        for line in &self.header {
            out.push_str(line);
        }
        for hunk in &self.hunks {
            out.push_str(&hunk.header);
            out.push_str(&hunk.body);
        }
    }

    pub fn to_raw(&self) -> String {
        let mut out = String::new();
        self.write_raw(&mut out);
        out
    }
}

/// Re-serialize parsed file diffs. For the output of
/// [`parse_multi_file_diff`] this is byte-identical to the input.
pub fn print_file_diffs(diffs: &[FileDiff]) -> String {
    let mut out = String::new();
    for diff in diffs {
        diff.write_raw(&mut out);
    }
    out
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
#[path = "diff_tests.rs"]
mod tests;
