//! Unit tests for the unified diff parser, printer and stats.

use super::parser::parse_hunk_header;
use super::stat::sum_file_diffs;
use super::*;
use crate::SearchError;

// ─── Fixtures ───────────────────────────────────────────────────────

/// Three files, mixed paired and unpaired changes, one section label and
/// one context line whose leading space was stripped.
const THREE_FILE_DIFF: &str = concat!(
    "diff --git INSTALL.md INSTALL.md\n",
    "index e5af166..d44c3fc 100644\n",
    "--- INSTALL.md\n",
    "+++ INSTALL.md\n",
    "@@ -3,10 +3,10 @@\n",
    " Line 1\n",
    " Line 2\n",
    " Line 3\n",
    "-Line 4\n",
    "+This is cool: Line 4\n",
    " Line 5\n",
    " Line 6\n",
    "-Line 7\n",
    "-Line 8\n",
    "+Another Line 7\n",
    "+Foobar Line 8\n",
    " Line 9\n",
    " Line 10\n",
    "diff --git JOKES.md JOKES.md\n",
    "index ea80abf..1b86505 100644\n",
    "--- JOKES.md\n",
    "+++ JOKES.md\n",
    "@@ -4,10 +4,10 @@ Joke #1\n",
    " Joke #2\n",
    " Joke #3\n",
    " Joke #4\n",
    "-Joke #5\n",
    "+This is not funny: Joke #5\n",
    " Joke #6\n",
    "-Joke #7\n",
    "+This one is good: Joke #7\n",
    " Joke #8\n",
    "-Joke #9\n",
    "+Waffle: Joke #9\n",
    " Joke #10\n",
    " Joke #11\n",
    "diff --git README.md README.md\n",
    "index 9bd8209..d2acfa9 100644\n",
    "--- README.md\n",
    "+++ README.md\n",
    "@@ -1,12 +1,13 @@\n",
    " # README\n",
    "\n",
    "-Line 1\n",
    "+Foobar Line 1\n",
    " Line 2\n",
    " Line 3\n",
    " Line 4\n",
    " Line 5\n",
    "-Line 6\n",
    "+Barfoo Line 6\n",
    " Line 7\n",
    " Line 8\n",
    " Line 9\n",
    " Line 10\n",
    "+Another line\n",
);

const NEW_FILE_DIFF: &str = concat!(
    "diff --git a/f b/f\n",
    "new file mode 100644\n",
    "index 0000000..d8649da\n",
    "--- /dev/null\n",
    "+++ b/f\n",
    "@@ -0,0 +1,1 @@\n",
    "+root\n",
);

/// One file with two paired single-line replacements.
fn two_pair_file(name: &str) -> String {
    format!(
        "diff --git a/{n} b/{n}\n--- a/{n}\n+++ b/{n}\n@@ -1,2 +1,2 @@\n-a\n+A\n b\n@@ -10,2 +10,2 @@\n x\n-y\n+Y\n",
        n = name
    )
}

// ─── Parsing ────────────────────────────────────────────────────────

#[test]
fn test_parse_three_files_in_order() {
    let diffs = parse_multi_file_diff(THREE_FILE_DIFF).unwrap();
    let names: Vec<&str> = diffs.iter().map(|d| d.path()).collect();
    assert_eq!(names, vec!["INSTALL.md", "JOKES.md", "README.md"]);
    assert!(diffs.iter().all(|d| d.hunks.len() == 1));
}

#[test]
fn test_parse_hunk_ranges_and_section() {
    let diffs = parse_multi_file_diff(THREE_FILE_DIFF).unwrap();
    let jokes = &diffs[1].hunks[0];
    assert_eq!((jokes.orig_start_line, jokes.orig_lines), (4, 10));
    assert_eq!((jokes.new_start_line, jokes.new_lines), (4, 10));
    assert_eq!(jokes.section.as_deref(), Some("Joke #1"));
    assert!(diffs[0].hunks[0].section.is_none());
}

#[test]
fn test_parse_blank_context_line() {
    let diffs = parse_multi_file_diff(THREE_FILE_DIFF).unwrap();
    let readme = &diffs[2].hunks[0];
    assert_eq!((readme.orig_lines, readme.new_lines), (12, 13));
    let second = readme.lines().nth(1).unwrap();
    assert_eq!(second, (LineKind::Context, ""));
}

#[test]
fn test_round_trip_is_byte_exact() {
    let diffs = parse_multi_file_diff(THREE_FILE_DIFF).unwrap();
    assert_eq!(print_file_diffs(&diffs), THREE_FILE_DIFF);

    let diffs = parse_multi_file_diff(NEW_FILE_DIFF).unwrap();
    assert_eq!(print_file_diffs(&diffs), NEW_FILE_DIFF);
}

#[test]
fn test_round_trip_crlf() {
    let text = "--- a/w.txt\r\n+++ b/w.txt\r\n@@ -1,2 +1,2 @@\r\n keep\r\n-old\r\n+new\r\n";
    let diffs = parse_multi_file_diff(text).unwrap();
    assert_eq!(diffs[0].old_path(), Some("w.txt"));
    assert_eq!(print_file_diffs(&diffs), text);
}

#[test]
fn test_parse_new_file() {
    let diff = parse_file_diff(NEW_FILE_DIFF).unwrap();
    assert!(diff.is_addition());
    assert!(!diff.is_deletion());
    assert_eq!(diff.old_path(), None);
    assert_eq!(diff.new_path(), Some("f"));
    assert_eq!(diff.hunks[0].orig_start_line, 0);
    assert_eq!(diff.stat, DiffStat { added: 1, deleted: 0, changed: 0 });
}

#[test]
fn test_parse_deleted_file() {
    let text = "diff --git a/gone b/gone\ndeleted file mode 100644\nindex 1193ff4..0000000\n--- a/gone\n+++ /dev/null\n@@ -1,2 +0,0 @@\n-one\n-two\n";
    let diff = parse_file_diff(text).unwrap();
    assert!(diff.is_deletion());
    assert_eq!(diff.old_path(), Some("gone"));
    assert_eq!(diff.new_path(), None);
    assert_eq!(diff.path(), "gone");
    assert_eq!(diff.stat, DiffStat { added: 0, deleted: 2, changed: 0 });
}

#[test]
fn test_parse_header_only_mode_change() {
    let text = "diff --git a/run.sh b/run.sh\nold mode 100644\nnew mode 100755\n";
    let diffs = parse_multi_file_diff(text).unwrap();
    assert_eq!(diffs.len(), 1);
    assert!(diffs[0].hunks.is_empty());
    assert_eq!(diffs[0].old_path(), Some("run.sh"));
    assert_eq!(diffs[0].new_path(), Some("run.sh"));
    assert_eq!(print_file_diffs(&diffs), text);
}

#[test]
fn test_parse_binary_addition_without_names() {
    let text = "diff --git a/img.png b/img.png\nnew file mode 100644\nindex 0000000..abcdef0\nBinary files /dev/null and b/img.png differ\n";
    let diff = parse_file_diff(text).unwrap();
    assert!(diff.is_addition());
    assert_eq!(diff.new_path(), Some("img.png"));
    assert_eq!(diff.stat, DiffStat::default());
}

#[test]
fn test_parse_header_timestamps_are_dropped_from_names() {
    let text = "--- a/x.c\t2020-01-01 00:00:00\n+++ b/x.c\t2020-01-02 00:00:00\n@@ -1 +1 @@\n-a\n+b\n";
    let diff = parse_file_diff(text).unwrap();
    assert_eq!(diff.orig_name, "a/x.c");
    assert_eq!(diff.new_path(), Some("x.c"));
    assert_eq!(diff.to_raw(), text);
}

#[test]
fn test_parse_no_newline_markers() {
    let text = concat!(
        "--- a/x\n",
        "+++ b/x\n",
        "@@ -1 +1 @@\n",
        "-old\n",
        "\\ No newline at end of file\n",
        "+new\n",
        "\\ No newline at end of file\n",
    );
    let diff = parse_file_diff(text).unwrap();
    let hunk = &diff.hunks[0];
    assert!(hunk.no_newline_at_end);
    assert_eq!(hunk.lines().filter(|(k, _)| *k == LineKind::NoNewline).count(), 2);
    assert_eq!(diff.stat, DiffStat { added: 0, deleted: 0, changed: 1 });
    assert_eq!(diff.to_raw(), text);
}

#[test]
fn test_parse_removed_line_that_looks_like_header() {
    let text = "--- a/notes\n+++ b/notes\n@@ -1,2 +1,1 @@\n--- dashes\n keep\n";
    let diff = parse_file_diff(text).unwrap();
    assert_eq!(diff.hunks[0].lines().next(), Some((LineKind::Removed, "-- dashes")));
}

#[test]
fn test_parse_empty_input() {
    assert!(parse_multi_file_diff("").unwrap().is_empty());
}

// ─── Parse errors ───────────────────────────────────────────────────

fn parse_error_line(text: &str) -> usize {
    match parse_multi_file_diff(text) {
        Err(SearchError::Parse { line, .. }) => line,
        other => panic!("expected parse error, got {:?}", other),
    }
}

#[test]
fn test_error_malformed_hunk_range() {
    assert_eq!(parse_error_line("--- a/x\n+++ b/x\n@@ -a,1 +1,1 @@\n-a\n+b\n"), 3);
}

#[test]
fn test_error_missing_closing_marker() {
    assert_eq!(parse_error_line("--- a/x\n+++ b/x\n@@ -1,1 +1,1\n-a\n+b\n"), 3);
}

#[test]
fn test_error_missing_new_name() {
    assert_eq!(parse_error_line("--- a/x\n@@ -1 +1 @@\n-a\n+b\n"), 2);
}

#[test]
fn test_error_truncated_hunk_body() {
    assert_eq!(parse_error_line("--- a/x\n+++ b/x\n@@ -1,3 +1,3 @@\n a\n b\n"), 6);
}

#[test]
fn test_error_garbage_inside_hunk() {
    assert_eq!(parse_error_line("--- a/x\n+++ b/x\n@@ -1,2 +1,2 @@\n a\n?? b\n"), 5);
}

#[test]
fn test_error_garbage_between_files() {
    let mut text = two_pair_file("a.txt");
    text.push_str("this is not a diff\n");
    text.push_str(&two_pair_file("b.txt"));
    assert_eq!(parse_error_line(&text), 12);
}

#[test]
fn test_error_leading_garbage() {
    assert_eq!(parse_error_line("hello\n--- a/x\n+++ b/x\n"), 1);
}

#[test]
fn test_parse_file_diff_rejects_multiple() {
    assert!(parse_file_diff(THREE_FILE_DIFF).is_err());
}

// ─── Hunk helpers ───────────────────────────────────────────────────

#[test]
fn test_hunk_header_single_line_ranges() {
    let (os, ol, ns, nl, section) = parse_hunk_header("@@ -1 +1 @@").unwrap();
    assert_eq!((os, ol, ns, nl), (1, 1, 1, 1));
    assert!(section.is_none());
}

#[test]
fn test_hunk_header_with_section() {
    let (os, ol, ns, nl, section) = parse_hunk_header("@@ -12,7 +12,8 @@ fn main() {").unwrap();
    assert_eq!((os, ol, ns, nl), (12, 7, 12, 8));
    assert_eq!(section.as_deref(), Some("fn main() {"));
}

#[test]
fn test_hunk_from_body_counts() {
    let hunk = Hunk::from_body(4, " 4\n 5\n-7 super awesome\n+7 super mega awesome\n 8\n");
    assert_eq!((hunk.orig_lines, hunk.new_lines), (4, 4));
    assert_eq!(hunk.header, "@@ -4,4 +4,4 @@\n");
    assert_eq!(hunk.raw_counts(), (1, 1));
}

#[test]
fn test_hunk_from_body_marker_is_not_counted() {
    let hunk = Hunk::from_body(1, " a\n-b\n\\ No newline at end of file\n+b\n");
    assert_eq!((hunk.orig_lines, hunk.new_lines), (2, 2));
    assert!(hunk.no_newline_at_end);
    assert_eq!(hunk.header, "@@ -1,2 +1,2 @@\n");
}

// ─── Stats ──────────────────────────────────────────────────────────

#[test]
fn test_stat_single_paired_replacement() {
    let hunk = Hunk::from_body(1, "-old\n+new\n");
    assert_eq!(DiffStat::for_hunks(&[hunk]), DiffStat { added: 0, deleted: 0, changed: 1 });
}

#[test]
fn test_stat_two_paired_replacements() {
    let diff = parse_file_diff(&two_pair_file("a.txt")).unwrap();
    assert_eq!(diff.stat, DiffStat { added: 0, deleted: 0, changed: 2 });
}

#[test]
fn test_stat_three_files_sum_to_twice_file_count() {
    let text: String = ["a", "b", "c"].iter().map(|n| two_pair_file(n)).collect();
    let diffs = parse_multi_file_diff(&text).unwrap();
    let total = sum_file_diffs(&diffs);
    assert_eq!(total.changed, 2 * diffs.len() as u32);
    assert_eq!((total.added, total.deleted), (0, 0));
}

#[test]
fn test_stat_unequal_counts_pair_only_the_overlap() {
    let hunk = Hunk::from_body(1, "-gone\n+one\n+two\n+three\n+four\n+five\n");
    assert_eq!(DiffStat::for_hunks(&[hunk]), DiffStat { added: 4, deleted: 0, changed: 1 });

    let hunk = Hunk::from_body(1, "-a\n-b\n-c\n+z\n");
    assert_eq!(DiffStat::for_hunks(&[hunk]), DiffStat { added: 0, deleted: 2, changed: 1 });
}

#[test]
fn test_stat_three_file_fixture() {
    let diffs = parse_multi_file_diff(THREE_FILE_DIFF).unwrap();
    assert_eq!(diffs[0].stat, DiffStat { added: 0, deleted: 0, changed: 3 });
    assert_eq!(diffs[1].stat, DiffStat { added: 0, deleted: 0, changed: 3 });
    assert_eq!(diffs[2].stat, DiffStat { added: 1, deleted: 0, changed: 2 });
    assert_eq!(sum_file_diffs(&diffs), DiffStat { added: 1, deleted: 0, changed: 8 });
}

#[test]
fn test_stat_sum_is_fieldwise() {
    let a = DiffStat { added: 1, deleted: 2, changed: 3 };
    let b = DiffStat { added: 10, deleted: 20, changed: 30 };
    let total: DiffStat = [a, b].iter().sum();
    assert_eq!(total, DiffStat { added: 11, deleted: 22, changed: 33 });
    assert_eq!(total.total(), 66);
}
