//! CLI argument structs for all subcommands.

use std::time::Duration;

use clap::Parser;

use diffsearch::{PathOptions, SearchBound, SearchError, SearchOptions, TextSearchOptions};

#[derive(Parser, Debug)]
#[command(after_long_help = r#"EXAMPLES:
  Messages and diffs:  diffsearch log "connection pool" --repo ~/src/app
  Regex, diffs only:   diffsearch log "fn \w+_v2\(" --regex --diffs-only
  Several repos:       diffsearch log TODO --repo ./a --repo ./b --max-results 20
  Path filters:        diffsearch log retry --include src/ --exclude _test.rs
  Everything on a ref: diffsearch log --ref refs/heads/release --diff

NOTES:
  - Without --ref every branch head is walked
  - An empty pattern matches every commit (path filters still apply)
  - Include patterns must all match a file path; the exclude pattern must not
  - "complete": false means --max-results or --timeout-ms stopped the walk"#)]
pub struct LogArgs {
    /// Text to look for in commit messages and added/removed diff lines
    pub pattern: Option<String>,

    /// Repository to search (repeatable; repositories are searched concurrently)
    #[arg(long, default_value = ".")]
    pub repo: Vec<String>,

    /// Starting ref or revision (repeatable; default: all branch heads)
    #[arg(long = "ref")]
    pub refs: Vec<String>,

    /// Treat pattern as a regular expression
    #[arg(short, long)]
    pub regex: bool,

    /// Match pattern case-sensitively
    #[arg(short = 's', long)]
    pub case_sensitive: bool,

    /// Match the pattern against commit messages only
    #[arg(long)]
    pub messages_only: bool,

    /// Match the pattern against diff lines only
    #[arg(long)]
    pub diffs_only: bool,

    /// Keep only file diffs whose path matches (repeatable, all must match)
    #[arg(long)]
    pub include: Vec<String>,

    /// Drop file diffs whose path matches
    #[arg(long)]
    pub exclude: Option<String>,

    /// Treat --include/--exclude as regular expressions
    #[arg(long)]
    pub path_regex: bool,

    /// Include the (path-filtered) diff text in each result
    #[arg(long)]
    pub diff: bool,

    /// Stop after this many results
    #[arg(long)]
    pub max_results: Option<usize>,

    /// Stop walking after this many milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

impl LogArgs {
    pub fn to_search_options(&self) -> Result<SearchOptions, SearchError> {
        if self.messages_only && self.diffs_only {
            return Err(SearchError::InvalidArgs(
                "--messages-only and --diffs-only are mutually exclusive".to_string(),
            ));
        }
        if self.max_results == Some(0) {
            return Err(SearchError::InvalidArgs("--max-results must be at least 1".to_string()));
        }
        Ok(SearchOptions {
            refs: self.refs.clone(),
            query: TextSearchOptions {
                pattern: self.pattern.clone().unwrap_or_default(),
                is_regexp: self.regex,
                is_case_sensitive: self.case_sensitive,
            },
            paths: PathOptions {
                include_patterns: self.include.clone(),
                exclude_pattern: self.exclude.clone(),
                is_regexp: self.path_regex,
                is_case_sensitive: self.case_sensitive,
            },
            match_message: !self.diffs_only,
            match_diff: !self.messages_only,
            include_diff: self.diff,
            bound: SearchBound {
                max_results: self.max_results,
                max_duration: self.timeout_ms.map(Duration::from_millis),
            },
        })
    }
}

#[derive(Parser, Debug)]
pub struct FileDiffsArgs {
    /// File containing a multi-file unified diff
    pub patch_file: String,

    /// Page size (default: all remaining file diffs)
    #[arg(long)]
    pub first: Option<usize>,

    /// Cursor returned as pageInfo.endCursor by the previous page
    #[arg(long)]
    pub after: Option<String>,

    /// Repository the patch applies to (enables --new-content)
    #[arg(long)]
    pub repo: Option<String>,

    /// Base revision the patch applies to
    #[arg(long, default_value = "HEAD")]
    pub rev: String,

    /// Base ref name recorded with the patch
    #[arg(long)]
    pub base_ref: Option<String>,

    /// Also print the raw patch text
    #[arg(long)]
    pub raw: bool,

    /// Reconstruct the post-patch content of every file on the page (needs --repo)
    #[arg(long)]
    pub new_content: bool,
}

#[derive(Parser, Debug)]
pub struct ApplyArgs {
    /// Original file content
    pub original: String,

    /// File containing the unified diff
    pub patch_file: String,

    /// Which file diff of the patch to apply (default: the first)
    #[arg(long)]
    pub path: Option<String>,
}

#[derive(Parser, Debug)]
pub struct StatArgs {
    /// Patch files to summarize
    #[arg(required = true)]
    pub patch_files: Vec<String>,
}

#[cfg(test)]
#[path = "args_tests.rs"]
mod tests;
