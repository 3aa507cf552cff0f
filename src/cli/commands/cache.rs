//! Cache Command
//!
//! Inspect and clean the wiki cache directory.

use serde_json::json;

use crate::cli::ui::{Output, format_bytes};
use crate::cli::util::CommandContext;
use crate::types::{RepoIdentity, Result};

pub fn list(ctx: &CommandContext, json: bool) -> Result<()> {
    let entries = ctx.store.list_all()?;
    let stats = ctx.store.stats()?;

    if json {
        let value = json!({
            "cache_dir": ctx.store.cache_dir(),
            "entries": entries,
            "stats": stats,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let out = Output::new();
    out.header(&format!("Wiki cache: {}", ctx.store.cache_dir().display()));
    if entries.is_empty() {
        out.info("No cache entries");
    }
    for entry in &entries {
        let stale = if entry.is_current() { "" } else { " (stale schema)" };
        println!(
            "  {} [{}] v{}{}  {}",
            entry.repo,
            entry.language,
            entry.version,
            stale,
            format_bytes(entry.size_bytes)
        );
        if let Some(modified) = entry.modified {
            println!("    Modified: {}", modified.format("%Y-%m-%d %H:%M UTC"));
        }
    }

    println!();
    println!(
        "  Total: {} entries, {}",
        stats.entry_count,
        format_bytes(stats.total_size_bytes)
    );
    if stats.stale_version_count > 0 {
        out.warning(&format!(
            "{} entries use another schema version; 'wikidelta cache clean --stale' removes them",
            stats.stale_version_count
        ));
    }
    if stats.quarantined_count > 0 {
        out.warning(&format!(
            "{} quarantined files; 'wikidelta cache clean' removes them",
            stats.quarantined_count
        ));
    }
    Ok(())
}

pub fn show(ctx: &CommandContext, repo: &RepoIdentity, language: Option<&str>, json: bool) -> Result<()> {
    let language = ctx.language(language);
    let out = Output::new();
    let Some(data) = ctx.store.load(repo, language)? else {
        out.warning(&format!("No usable cache for {} ({})", repo, language));
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    out.header(&format!("{} ({})", data.structure.title, repo));
    out.field("Cache file", ctx.store.cache_path(repo, language).display());
    out.field("Language", &data.language);
    out.field("Generated", data.generated_at.format("%Y-%m-%d %H:%M UTC"));
    out.field(
        "Pages",
        format!("{} of {} generated", data.generated_pages.len(), data.structure.pages.len()),
    );
    match &data.snapshot {
        Some(snapshot) => out.field("Snapshot", format!("{} files", snapshot.len())),
        None => out.field("Snapshot", "none (next plan is a full regeneration)"),
    }

    let missing = data.missing_pages();
    if !missing.is_empty() {
        out.section(&format!("Not yet generated ({})", missing.len()));
        for id in missing {
            out.item(id);
        }
    }
    Ok(())
}

/// With no flags, removes quarantined files and stale schema versions
pub fn clean(ctx: &CommandContext, all: bool, quarantined: bool, stale: bool) -> Result<()> {
    let out = Output::new();
    if all {
        let count = ctx.store.clear_all()?;
        out.success(&format!("Removed {} cache files", count));
        return Ok(());
    }

    let (quarantined, stale) = if quarantined || stale {
        (quarantined, stale)
    } else {
        (true, true)
    };
    if quarantined {
        let count = ctx.store.purge_quarantined()?;
        out.success(&format!("Removed {} quarantined files", count));
    }
    if stale {
        let count = ctx.store.purge_stale_versions()?;
        out.success(&format!("Removed {} stale-schema entries", count));
    }
    Ok(())
}
