//! Manifests Command
//!
//! Find exported workspaces below a directory.

use std::path::Path;

use serde_json::json;

use crate::cli::ui::Output;
use crate::types::Result;
use crate::wiki::list_manifests;

pub fn run(base_dir: &Path, json: bool) -> Result<()> {
    let manifests = list_manifests(base_dir)?;

    if json {
        let value: Vec<_> = manifests
            .iter()
            .map(|(path, m)| {
                json!({
                    "manifest": path,
                    "repo": m.repo,
                    "layout": m.layout,
                    "pages": m.pages.len(),
                    "cache_file": m.cache_file,
                    "exported_at": m.exported_at,
                    "last_synced_at": m.last_synced_at,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let out = Output::new();
    if manifests.is_empty() {
        out.info(&format!("No workspaces found under {}", base_dir.display()));
        return Ok(());
    }
    out.header(&format!("Workspaces under {}", base_dir.display()));
    for (path, manifest) in &manifests {
        println!("  {}", path.display());
        out.field("Repo", &manifest.repo);
        out.field("Layout", manifest.layout);
        out.field("Pages", manifest.pages.len());
        let synced = manifest
            .last_synced_at
            .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
            .unwrap_or_else(|| "never".to_string());
        out.field("Synced", synced);
    }
    Ok(())
}
