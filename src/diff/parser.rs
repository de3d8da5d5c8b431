//! Unified diff parser.
//!
//! Grammar, per file:
//! ```text
//! [diff <old> <new>          extended header, optional
//!  <index/mode/rename lines>]
//! [--- <old>                 required before any hunk
//!  +++ <new>]
//! (@@ -A[,B] +C[,D] @@[ section]
//!  <body lines: ' ', '+', '-', '\'>)*
//! ```
//!
//! Hunk bodies are consumed by the counts in their header, so a removed
//! line that happens to start with `-- ` is never mistaken for a file
//! header. Anything that does not fit the grammar is a parse error with the
//! 1-based line number; nothing is skipped.

use crate::SearchError;

use super::{DiffStat, FileDiff, Hunk, DEV_NULL};

/// Longest excerpt of an offending line quoted in an error message.
const MAX_EXCERPT: usize = 80;

// ─── Line cursor ────────────────────────────────────────────────────

struct LineCursor<'a> {
    /// Lines with their terminators (`split_inclusive`).
    lines: Vec<&'a str>,
    pos: usize,
}

impl<'a> LineCursor<'a> {
    fn new(text: &'a str) -> Self {
        Self { lines: text.split_inclusive('\n').collect(), pos: 0 }
    }

    fn peek(&self) -> Option<&'a str> {
        self.lines.get(self.pos).copied()
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    /// 1-based number of the line `peek` would return.
    fn line_no(&self) -> usize {
        self.pos + 1
    }
}

fn strip_eol(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

fn excerpt(line: &str) -> &str {
    let line = strip_eol(line);
    match line.char_indices().nth(MAX_EXCERPT) {
        Some((idx, _)) => &line[..idx],
        None => line,
    }
}

fn is_file_start(line: &str) -> bool {
    line.starts_with("diff ") || line.starts_with("--- ")
}

// ─── Public entry points ────────────────────────────────────────────

/// Parse a multi-file unified diff into its file diffs, in input order.
///
/// Empty input yields no file diffs.
pub fn parse_multi_file_diff(text: &str) -> Result<Vec<FileDiff>, SearchError> {
    let mut cursor = LineCursor::new(text);
    let mut diffs = Vec::new();

    while let Some(line) = cursor.peek() {
        if !is_file_start(line) {
            return Err(SearchError::parse(
                cursor.line_no(),
                format!("expected a file header ('diff ' or '--- '), found {:?}", excerpt(line)),
            ));
        }
        diffs.push(parse_one(&mut cursor)?);
    }

    Ok(diffs)
}

/// Parse text that must contain exactly one file diff.
pub fn parse_file_diff(text: &str) -> Result<FileDiff, SearchError> {
    let mut diffs = parse_multi_file_diff(text)?;
    match diffs.len() {
        1 => Ok(diffs.remove(0)),
        n => Err(SearchError::parse(1, format!("expected exactly one file diff, found {}", n))),
    }
}

// ─── File diff ──────────────────────────────────────────────────────

fn parse_one(cursor: &mut LineCursor<'_>) -> Result<FileDiff, SearchError> {
    let start_line = cursor.line_no();
    let mut header: Vec<String> = Vec::new();
    let mut git_names: Option<(String, String)> = None;
    let mut created = false;
    let mut deleted = false;

    // Extended header: "diff ..." plus index/mode/rename lines
    if let Some(line) = cursor.peek().filter(|l| l.starts_with("diff ")) {
        git_names = parse_diff_line_names(strip_eol(line));
        header.push(line.to_string());
        cursor.advance();

        while let Some(line) = cursor.peek() {
            if line.starts_with("--- ") || line.starts_with("diff ") || line.starts_with("@@") {
                break;
            }
            let text = strip_eol(line);
            if text.starts_with("new file mode") {
                created = true;
            } else if text.starts_with("deleted file mode") {
                deleted = true;
            }
            header.push(line.to_string());
            cursor.advance();
        }
    }

    let mut names: Option<(String, String)> = None;
    if let Some(line) = cursor.peek().filter(|l| l.starts_with("--- ")) {
        let orig = header_name(&strip_eol(line)[4..]);
        header.push(line.to_string());
        cursor.advance();

        let new = match cursor.peek() {
            Some(l) if l.starts_with("+++ ") => {
                header.push(l.to_string());
                cursor.advance();
                header_name(&strip_eol(l)[4..])
            }
            Some(l) => {
                return Err(SearchError::parse(
                    cursor.line_no(),
                    format!("expected '+++ ' after '--- ', found {:?}", excerpt(l)),
                ));
            }
            None => return Err(SearchError::parse(cursor.line_no(), "expected '+++ ' after '--- ', found end of input")),
        };
        names = Some((orig, new));
    }

    let (orig_name, new_name) = match (names, git_names) {
        (Some(names), _) => names,
        (None, Some((orig, new))) => (
            if created { DEV_NULL.to_string() } else { orig },
            if deleted { DEV_NULL.to_string() } else { new },
        ),
        (None, None) => return Err(SearchError::parse(start_line, "cannot determine file names from diff header")),
    };

    let mut hunks = Vec::new();
    while let Some(line) = cursor.peek() {
        if !line.starts_with("@@") {
            break;
        }
        hunks.push(parse_hunk(cursor)?);
    }

    if let Some(line) = cursor.peek() {
        if !is_file_start(line) {
            return Err(SearchError::parse(
                cursor.line_no(),
                format!("unexpected line after hunk: {:?}", excerpt(line)),
            ));
        }
    }

    let stat = DiffStat::for_hunks(&hunks);
    Ok(FileDiff { orig_name, new_name, header, hunks, stat })
}

/// File name from a `---`/`+++` header, dropping a tab-separated timestamp.
fn header_name(rest: &str) -> String {
    rest.split('\t').next().unwrap_or(rest).to_string()
}

/// Extract `(old, new)` from `diff --git a/x b/x`.
///
/// Names without `a/`/`b/` prefixes (`diff --git x x`) are split in the
/// middle when both halves agree.
fn parse_diff_line_names(line: &str) -> Option<(String, String)> {
    let rest = line.strip_prefix("diff --git ")?;
    if rest.starts_with("a/") {
        if let Some(idx) = rest.find(" b/") {
            return Some((rest[..idx].to_string(), rest[idx + 1..].to_string()));
        }
    }
    if rest.len() % 2 == 1 {
        let mid = rest.len() / 2;
        if rest.is_char_boundary(mid) && rest.as_bytes()[mid] == b' ' && rest[..mid] == rest[mid + 1..] {
            return Some((rest[..mid].to_string(), rest[mid + 1..].to_string()));
        }
    }
    rest.split_once(' ').map(|(a, b)| (a.to_string(), b.to_string()))
}

// ─── Hunks ──────────────────────────────────────────────────────────

fn parse_hunk(cursor: &mut LineCursor<'_>) -> Result<Hunk, SearchError> {
    let header_line_no = cursor.line_no();
    let header = cursor.peek().unwrap_or_default();
    let (orig_start_line, orig_lines, new_start_line, new_lines, section) =
        parse_hunk_header(strip_eol(header)).map_err(|msg| SearchError::parse(header_line_no, msg))?;
    cursor.advance();

    let mut body = String::new();
    let mut orig_seen = 0usize;
    let mut new_seen = 0usize;
    let mut no_newline_at_end = false;

    while orig_seen < orig_lines || new_seen < new_lines {
        let Some(line) = cursor.peek() else {
            return Err(SearchError::parse(
                cursor.line_no(),
                format!(
                    "unexpected end of diff: hunk at line {} is missing {} original and {} new lines",
                    header_line_no,
                    orig_lines - orig_seen,
                    new_lines - new_seen
                ),
            ));
        };
        match line.as_bytes().first() {
            Some(b' ') | Some(b'\n') | Some(b'\r') => {
                orig_seen += 1;
                new_seen += 1;
            }
            Some(b'-') => orig_seen += 1,
            Some(b'+') => new_seen += 1,
            Some(b'\\') => no_newline_at_end = true,
            _ => {
                return Err(SearchError::parse(
                    cursor.line_no(),
                    format!("unexpected line in hunk body: {:?}", excerpt(line)),
                ));
            }
        }
        if orig_seen > orig_lines || new_seen > new_lines {
            return Err(SearchError::parse(
                cursor.line_no(),
                format!(
                    "hunk body exceeds header counts (-{} +{}) declared at line {}",
                    orig_lines, new_lines, header_line_no
                ),
            ));
        }
        body.push_str(line);
        cursor.advance();
    }

    // A marker may trail the last counted line
    if let Some(line) = cursor.peek().filter(|l| l.starts_with('\\')) {
        no_newline_at_end = true;
        body.push_str(line);
        cursor.advance();
    }

    Ok(Hunk {
        orig_start_line,
        orig_lines,
        new_start_line,
        new_lines,
        section,
        header: header.to_string(),
        body,
        no_newline_at_end,
    })
}

type HunkRanges = (usize, usize, usize, usize, Option<String>);

/// Parse `@@ -A[,B] +C[,D] @@[ section]`.
pub(crate) fn parse_hunk_header(line: &str) -> Result<HunkRanges, String> {
    let rest = line
        .strip_prefix("@@ ")
        .ok_or_else(|| format!("hunk header must start with '@@ ': {:?}", excerpt(line)))?;
    let (ranges, tail) = rest
        .split_once(" @@")
        .ok_or_else(|| format!("hunk header is missing the closing '@@': {:?}", excerpt(line)))?;
    let (orig, new) = ranges
        .split_once(' ')
        .ok_or_else(|| format!("hunk header needs two ranges: {:?}", excerpt(line)))?;
    let orig = orig
        .strip_prefix('-')
        .ok_or_else(|| format!("original range must start with '-': {:?}", orig))?;
    let new = new
        .strip_prefix('+')
        .ok_or_else(|| format!("new range must start with '+': {:?}", new))?;

    let (orig_start, orig_lines) = parse_range(orig)?;
    let (new_start, new_lines) = parse_range(new)?;

    let section = tail.strip_prefix(' ').unwrap_or(tail);
    let section = if section.is_empty() { None } else { Some(section.to_string()) };

    Ok((orig_start, orig_lines, new_start, new_lines, section))
}

/// `A` means one line starting at A; `A,B` means B lines starting at A.
fn parse_range(s: &str) -> Result<(usize, usize), String> {
    let (start, len) = match s.split_once(',') {
        Some((start, len)) => (start, Some(len)),
        None => (s, None),
    };
    let start: usize = start.parse().map_err(|_| format!("invalid range start {:?}", start))?;
    let len: usize = match len {
        Some(len) => len.parse().map_err(|_| format!("invalid range length {:?}", len))?,
        None => 1,
    };
    Ok((start, len))
}
