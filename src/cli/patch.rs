//! Patch subcommands: `file-diffs`, `apply` and `stat`.

use std::fs;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::debug;

use diffsearch::git::GitCli;
use diffsearch::patch::sum_patch_stats;
use diffsearch::{apply_hunks, CancelFlag, Patch, PatchResolver, SearchError};

use super::args::{ApplyArgs, FileDiffsArgs, StatArgs};

fn read_text(path: &str) -> Result<String, SearchError> {
    let bytes = fs::read(path)?;
    debug!(path, bytes = bytes.len(), "Read input file");
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub fn cmd_file_diffs(args: FileDiffsArgs, cancel: &CancelFlag) -> Result<(), SearchError> {
    if args.new_content && args.repo.is_none() {
        return Err(SearchError::InvalidArgs("--new-content needs --repo".to_string()));
    }

    let raw = read_text(&args.patch_file)?;
    let repo_name = args.repo.clone().unwrap_or_default();
    let patch = Patch::new(raw).with_base(&repo_name, &args.rev, args.base_ref.as_deref().unwrap_or_default());
    let mut resolver = PatchResolver::new(patch);
    if let Some(repo) = &args.repo {
        resolver = resolver.with_reader(Arc::new(GitCli::new(repo)));
    }

    let conn = resolver.file_diff_connection(args.first, args.after.clone());
    let mut page = serde_json::to_value(conn.to_page(args.raw)?)
        .map_err(|e| SearchError::InvalidArgs(format!("cannot encode page: {}", e)))?;

    if args.new_content {
        let mut contents = Vec::new();
        for diff in conn.nodes()? {
            contents.push(json!({
                "path": diff.path(),
                "newContent": resolver.new_file_content(diff, cancel)?,
            }));
        }
        page["newContents"] = Value::Array(contents);
    }

    println!("{:#}", page);
    Ok(())
}

pub fn cmd_apply(args: ApplyArgs) -> Result<(), SearchError> {
    let original = read_text(&args.original)?;
    let resolver = PatchResolver::new(Patch::new(read_text(&args.patch_file)?));

    let diff = match &args.path {
        Some(path) => resolver
            .find_file_diff(path)?
            .ok_or_else(|| SearchError::InvalidArgs(format!("patch has no file diff for {}", path)))?,
        None => resolver
            .file_diffs()?
            .first()
            .ok_or_else(|| SearchError::InvalidArgs("patch contains no file diffs".to_string()))?,
    };

    print!("{}", apply_hunks(&original, &diff.hunks)?);
    Ok(())
}

pub fn cmd_stat(args: StatArgs) -> Result<(), SearchError> {
    let resolvers = args
        .patch_files
        .iter()
        .map(|path| read_text(path).map(|raw| PatchResolver::new(Patch::new(raw))))
        .collect::<Result<Vec<_>, _>>()?;

    let mut patches = Vec::new();
    for (path, resolver) in args.patch_files.iter().zip(&resolvers) {
        patches.push(json!({
            "patch": path,
            "files": resolver.file_diffs()?.len(),
            "diffStat": resolver.diff_stat()?,
        }));
    }

    println!(
        "{:#}",
        json!({
            "patches": patches,
            "total": sum_patch_stats(&resolvers)?,
        })
    );
    Ok(())
}
