//! Snapshot Command
//!
//! Scan a local checkout and print (or save) its fingerprint.

use std::path::Path;

use crate::cli::ui::{Output, format_bytes};
use crate::cli::util::{CommandContext, write_snapshot};
use crate::types::Result;

pub fn run(ctx: &CommandContext, repo_root: &Path, out_file: Option<&Path>, json: bool) -> Result<()> {
    let snapshot = ctx.scan(repo_root)?;

    if let Some(path) = out_file {
        write_snapshot(path, &snapshot)?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    let out = Output::new();
    out.header(&format!("Snapshot of {}", snapshot.repo));
    out.field("Files", snapshot.len());
    out.field("Size", format_bytes(snapshot.total_size()));
    out.field("Taken", snapshot.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
    if let Some(path) = out_file {
        out.success(&format!("Saved to {}", path.display()));
    }
    Ok(())
}
