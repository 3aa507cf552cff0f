//! Sync Command
//!
//! Write hand edits from an exported workspace back into the wiki cache.

use std::path::{Path, PathBuf};

use crate::cli::ui::Output;
use crate::cli::util::{CommandContext, manifest_path};
use crate::types::Result;
use crate::wiki::{SyncSummary, sync_manifest_with};

pub fn run(ctx: &CommandContext, target: &Path, files: &[PathBuf], json: bool) -> Result<()> {
    let manifest = manifest_path(target);
    let changed = (!files.is_empty()).then_some(files);
    let summary = sync_manifest_with(&manifest, changed, &ctx.config.retry_policy())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        report(&summary);
    }
    Ok(())
}

pub(crate) fn report(summary: &SyncSummary) {
    let out = Output::new();
    if summary.updated == 0 {
        out.info("No edited pages");
        return;
    }
    out.success(&format!(
        "Synced {} page(s) at {}",
        summary.updated,
        summary.timestamp.format("%H:%M:%S")
    ));
    for id in &summary.pages {
        out.item(id);
    }
}
