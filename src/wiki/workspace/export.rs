//! Markdown export
//!
//! Writes cached pages into an editable workspace and records what was
//! written in the manifest. Re-exporting over a workspace with unsynced
//! edits overwrites them; callers sync first.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use chrono::Utc;
use tracing::info;

use super::format::{check_marker_id, render_marked_page, render_page_file};
use super::manifest::{ExportFormat, ExportLayout, ExportManifest, ExportedPage};
use crate::constants::workspace::SINGLE_FILE_NAME;
use crate::types::{Result, sha256_hex, slugify, write_atomic};
use crate::wiki::types::WikiCacheData;

fn unique_file_name(id: &str, taken: &mut HashSet<String>) -> String {
    let base = slugify(id);
    let mut name = format!("{}.md", base);
    let mut n = 2;
    while !taken.insert(name.clone()) {
        name = format!("{}-{}.md", base, n);
        n += 1;
    }
    name
}

/// Export every page of `data` into `out_dir` and write the manifest there.
///
/// Pages are written in table-of-contents order. Pages without generated
/// content are exported with an empty body so they can be written by hand.
pub fn export_markdown_workspace(
    data: &WikiCacheData,
    cache_file: &Path,
    out_dir: &Path,
    layout: ExportLayout,
) -> Result<ExportManifest> {
    fs::create_dir_all(out_dir)?;
    // Sync runs from the workspace, so a cwd-relative cache path would dangle
    let cache_file = std::path::absolute(cache_file)?;
    let now = Utc::now();

    let index = data.structure.index();
    let order = index.ordered_page_ids(&data.structure);
    let mut pages = Vec::with_capacity(order.len());

    match layout {
        ExportLayout::MultiFile => {
            let mut taken = HashSet::new();
            for id in order {
                let Some(page) = data.page(id) else {
                    continue;
                };
                let file_name = unique_file_name(id, &mut taken);
                let text = render_page_file(&page.title, &page.content);
                write_atomic(&out_dir.join(&file_name), text.as_bytes())?;

                pages.push(ExportedPage {
                    page_id: id.to_string(),
                    title: page.title.clone(),
                    relative_path: file_name,
                    content_hash: sha256_hex(text.as_bytes()),
                    modified_time: Some(now),
                });
            }
        }
        ExportLayout::SingleFile => {
            let mut text = format!("# {}\n\n", data.structure.title);
            if !data.structure.description.is_empty() {
                text.push_str(&data.structure.description);
                text.push_str("\n\n");
            }
            for id in order {
                let Some(page) = data.page(id) else {
                    continue;
                };
                check_marker_id(id)?;
                text.push_str(&render_marked_page(id, &page.title, &page.content));
                pages.push(ExportedPage {
                    page_id: id.to_string(),
                    title: page.title.clone(),
                    relative_path: SINGLE_FILE_NAME.to_string(),
                    content_hash: sha256_hex(page.content.as_bytes()),
                    modified_time: Some(now),
                });
            }
            write_atomic(&out_dir.join(SINGLE_FILE_NAME), text.as_bytes())?;
        }
    }

    let manifest = ExportManifest {
        repo: data.repo.clone(),
        version: data.version,
        cache_file,
        layout,
        format: ExportFormat::Markdown,
        root_dir: out_dir.to_path_buf(),
        pages,
        exported_at: now,
        last_synced_at: None,
    };
    manifest.save(&ExportManifest::path_in(out_dir))?;

    info!(
        "Exported {} pages of {} to {} ({})",
        manifest.pages.len(),
        data.repo,
        out_dir.display(),
        layout
    );
    Ok(manifest)
}
