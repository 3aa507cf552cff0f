//! Export Command
//!
//! Write the cached wiki of a repository into an editable Markdown workspace.

use std::path::Path;

use crate::cli::ui::Output;
use crate::cli::util::CommandContext;
use crate::types::{RepoIdentity, Result, WikiError};
use crate::wiki::{ExportLayout, export_markdown_workspace};

pub fn run(
    ctx: &CommandContext,
    repo: &RepoIdentity,
    language: Option<&str>,
    out_dir: &Path,
    layout: Option<ExportLayout>,
) -> Result<()> {
    let language = ctx.language(language);
    let layout = layout.unwrap_or(ctx.config.workspace.layout);
    let cache_file = ctx.store.cache_path(repo, language);

    let data = ctx.store.load(repo, language)?.ok_or_else(|| {
        WikiError::Workspace(format!(
            "No usable wiki cache for {} ({}) in {}",
            repo,
            language,
            ctx.store.cache_dir().display()
        ))
    })?;

    let manifest = export_markdown_workspace(&data, &cache_file, out_dir, layout)?;

    let out = Output::new();
    out.success(&format!(
        "Exported {} pages to {} ({})",
        manifest.pages.len(),
        out_dir.display(),
        layout
    ));
    out.info("Edit the files, then run 'wikidelta sync' or 'wikidelta watch' to write changes back");
    Ok(())
}
