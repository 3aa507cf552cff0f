//! Plan Command
//!
//! Show which cached wiki pages the current working tree invalidates.

use std::path::Path;

use serde_json::json;

use crate::cli::ui::Output;
use crate::cli::util::CommandContext;
use crate::types::Result;
use crate::wiki::{RegenerationPlan, plan_regeneration};

pub fn run(ctx: &CommandContext, repo_root: &Path, language: Option<&str>, json: bool) -> Result<()> {
    let current = ctx.scan(repo_root)?;
    let language = ctx.language(language);
    let cached = ctx.store.load(&current.repo, language)?;
    let plan = plan_regeneration(cached.as_ref(), &current)?;

    let pages: Vec<String> = match &cached {
        Some(data) => plan.pages_to_regenerate(&data.structure).into_iter().collect(),
        None => Vec::new(),
    };

    if json {
        let value = match &plan {
            RegenerationPlan::UpToDate => json!({ "plan": "up-to-date", "pages": [] }),
            RegenerationPlan::Full { reason } => json!({
                "plan": "full",
                "reason": reason.to_string(),
                "pages": pages,
            }),
            RegenerationPlan::Incremental { changes, .. } => json!({
                "plan": "incremental",
                "changes": changes,
                "pages": pages,
            }),
        };
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let out = Output::new();
    out.header(&format!("Regeneration plan for {} ({})", current.repo, language));
    match &plan {
        RegenerationPlan::UpToDate => out.success("Wiki is up to date"),
        RegenerationPlan::Full { reason } => {
            out.warning(&format!("Full regeneration needed: {}", reason));
            if !pages.is_empty() {
                out.field("Pages", pages.len());
            }
        }
        RegenerationPlan::Incremental { changes, .. } => {
            out.info(&format!("Changes: {}", changes.describe()));
            if pages.is_empty() {
                out.success("No cached page depends on the changed files");
            } else {
                out.section(&format!("Pages to regenerate ({})", pages.len()));
                for id in &pages {
                    let title = cached
                        .as_ref()
                        .and_then(|data| data.structure.page(id))
                        .map(|p| p.title.as_str())
                        .unwrap_or("");
                    out.item(&format!("{} {}", id, title));
                }
            }
        }
    }
    Ok(())
}
