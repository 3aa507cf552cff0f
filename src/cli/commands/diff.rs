//! Diff Command
//!
//! Compare the working tree against a baseline snapshot. The baseline is an
//! explicit snapshot file, else the snapshot recorded in the wiki cache,
//! else empty (every file is new).

use std::path::Path;

use tracing::debug;

use crate::cli::ui::Output;
use crate::cli::util::{CommandContext, read_snapshot};
use crate::snapshot::{ChangeSummary, RepoSnapshot, detect_changes_from};
use crate::types::Result;

pub fn run(
    ctx: &CommandContext,
    repo_root: &Path,
    baseline_file: Option<&Path>,
    language: Option<&str>,
    json: bool,
) -> Result<()> {
    let current = ctx.scan(repo_root)?;
    let baseline = match baseline_file {
        Some(path) => Some(read_snapshot(path)?),
        None => cached_baseline(ctx, &current, language)?,
    };
    let changes = detect_changes_from(baseline.as_ref(), &current)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&changes)?);
    } else {
        print_changes(&changes, baseline.is_some());
    }
    Ok(())
}

fn cached_baseline(
    ctx: &CommandContext,
    current: &RepoSnapshot,
    language: Option<&str>,
) -> Result<Option<RepoSnapshot>> {
    let language = ctx.language(language);
    let cached = ctx.store.load(&current.repo, language)?;
    let baseline = cached.and_then(|data| data.snapshot);
    if baseline.is_none() {
        debug!("No cached snapshot for {} ({}); diffing against empty", current.repo, language);
    }
    Ok(baseline)
}

fn print_changes(changes: &ChangeSummary, had_baseline: bool) {
    let out = Output::new();
    if !had_baseline {
        out.warning("No baseline snapshot; every file counts as new");
    }
    if changes.is_empty() {
        out.success("No changes");
        return;
    }

    out.section(&format!("Changes ({})", changes.describe()));
    for path in &changes.new_files {
        out.change('+', path);
    }
    for path in &changes.changed_files {
        out.change('~', path);
    }
    for path in &changes.deleted_files {
        out.change('-', path);
    }
}
