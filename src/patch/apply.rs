//! Reconstruct post-patch file content from the original content and hunks.
//!
//! Works on an ordered line sequence with two cursors: `read` indexes the
//! original lines, the output vector's length is the write cursor. Hunks
//! are applied in ascending order of the first original line they touch.
//! `delta` tracks inserted minus deleted lines so far, which is where the
//! write cursor must stand when a hunk's original start line is reached.
//!
//! Context lines are taken from the original, not from the hunk; a context
//! mismatch is not detected.
//!
//! A `\ No newline at end of file` marker belongs to the line before it. A
//! hunk that reaches the end of the content uses the markers to decide
//! whether the result ends with `'\n'`.

use tracing::trace;

use crate::diff::{Hunk, LineKind};
use crate::SearchError;

/// Apply `hunks` to `original` and return the patched content.
///
/// The original is split on `'\n'` and re-joined with `'\n'`, so a trailing
/// newline (an empty final segment) survives and none is invented, unless
/// the last hunk's end-of-file markers add or remove it. Fails without
/// output if a hunk starts outside the content or overlaps the previous one.
pub fn apply_hunks(original: &str, hunks: &[Hunk]) -> Result<String, SearchError> {
    let lines: Vec<&str> = original.split('\n').collect();

    let mut ordered: Vec<&Hunk> = hunks.iter().collect();
    ordered.sort_by_key(|h| start_index(h));

    let mut out: Vec<&str> = Vec::with_capacity(lines.len());
    let mut read = 0usize;
    let mut delta: isize = 0;

    for hunk in ordered {
        let start = start_index(hunk);
        if start < read {
            return Err(apply_error(
                hunk,
                format!("hunk overlaps the previous hunk, which consumed through line {}", read),
            ));
        }
        if start > lines.len() {
            return Err(apply_error(hunk, format!("content has only {} lines", lines.len())));
        }

        out.extend_from_slice(&lines[read..start]);
        read = start;
        debug_assert_eq!(out.len() as isize, start as isize + delta);

        for (kind, text) in hunk.lines() {
            match kind {
                LineKind::Context => {
                    let line = lines
                        .get(read)
                        .copied()
                        .ok_or_else(|| apply_error(hunk, "context line past end of content".to_string()))?;
                    out.push(line);
                    read += 1;
                }
                LineKind::Removed => {
                    if read >= lines.len() {
                        return Err(apply_error(hunk, "removed line past end of content".to_string()));
                    }
                    read += 1;
                    delta -= 1;
                }
                LineKind::Added => {
                    out.push(text);
                    delta += 1;
                }
                LineKind::NoNewline => {}
            }
        }

        // A trailing newline is the empty segment after the last line.
        let (old_unterminated, new_unterminated) = eof_markers(hunk);
        if new_unterminated && read + 1 == lines.len() && lines[read].is_empty() {
            read += 1;
        } else if old_unterminated && !new_unterminated && read == lines.len() {
            out.push("");
        }
        trace!(start_line = hunk.orig_start_line, read, delta, "Applied hunk");
    }

    out.extend_from_slice(&lines[read..]);
    Ok(out.join("\n"))
}

/// 0-based index of the first original line a hunk touches. A hunk with no
/// original lines inserts *after* its start line (`-5,0` inserts after line 5).
fn start_index(hunk: &Hunk) -> usize {
    if hunk.orig_lines == 0 {
        hunk.orig_start_line
    } else {
        hunk.orig_start_line.saturating_sub(1)
    }
}

/// Which side's last line lacks a newline: `(old, new)`. The marker
/// follows a removed line (old), an added line (new) or context (both).
fn eof_markers(hunk: &Hunk) -> (bool, bool) {
    let mut prev = None;
    let (mut old, mut new) = (false, false);
    for (kind, _) in hunk.lines() {
        match (kind, prev) {
            (LineKind::NoNewline, Some(LineKind::Removed)) => old = true,
            (LineKind::NoNewline, Some(LineKind::Added)) => new = true,
            (LineKind::NoNewline, Some(LineKind::Context)) => {
                old = true;
                new = true;
            }
            _ => {}
        }
        prev = Some(kind);
    }
    (old, new)
}

fn apply_error(hunk: &Hunk, message: String) -> SearchError {
    SearchError::PatchApply { start_line: hunk.orig_start_line, message }
}
