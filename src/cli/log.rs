//! `diffsearch log`: search one or more repositories concurrently.

use serde_json::{json, Value};
use tracing::info;

use diffsearch::git::GitCli;
use diffsearch::search::search_many;
use diffsearch::{CancelFlag, SearchError};

use super::args::LogArgs;

pub fn cmd_log(args: LogArgs, cancel: &CancelFlag) -> Result<(), SearchError> {
    let opts = args.to_search_options()?;
    let repos: Vec<GitCli> = args.repo.iter().map(GitCli::new).collect();
    info!(repos = repos.len(), pattern = %opts.query.pattern, "Searching history");

    let outcomes = search_many(&repos, &opts, cancel);

    let mut first_error: Option<SearchError> = None;
    let entries: Vec<Value> = repos
        .iter()
        .zip(outcomes)
        .map(|(repo, outcome)| {
            let path = repo.repo_path().display().to_string();
            match outcome {
                Ok(outcome) => json!({
                    "repo": path,
                    "complete": outcome.complete,
                    "results": outcome.results,
                }),
                Err(e) => {
                    let entry = json!({ "repo": path, "error": e.to_string() });
                    first_error.get_or_insert(e);
                    entry
                }
            }
        })
        .collect();

    println!("{:#}", Value::Array(entries));

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
