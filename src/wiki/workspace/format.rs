//! Markdown layout of exported pages
//!
//! Multi-file pages are `# {title}` followed by the body. Single-file
//! workspaces wrap each body in id markers:
//!
//! ```text
//! ## Overview
//!
//! <!-- wikidelta:page-begin id="overview" -->
//! body
//! <!-- wikidelta:page-end id="overview" -->
//! ```
//!
//! Text outside the markers (headings included) is never synced back.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use crate::constants::workspace::{PAGE_BEGIN_MARKER, PAGE_END_MARKER};
use crate::types::{Result, WikiError};

const ID_PLACEHOLDER: &str = "{id}";

static BEGIN_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    let (before, after) = PAGE_BEGIN_MARKER
        .split_once(ID_PLACEHOLDER)
        .unwrap_or((PAGE_BEGIN_MARKER, ""));
    Regex::new(&format!(
        "{}([^\"\\r\\n]*){}",
        regex::escape(before),
        regex::escape(after)
    ))
    .expect("valid page marker regex")
});

pub fn begin_marker(id: &str) -> String {
    PAGE_BEGIN_MARKER.replace(ID_PLACEHOLDER, id)
}

pub fn end_marker(id: &str) -> String {
    PAGE_END_MARKER.replace(ID_PLACEHOLDER, id)
}

/// Page ids end up inside an HTML comment attribute
pub fn check_marker_id(id: &str) -> Result<()> {
    if id.is_empty() || id.contains('"') || id.contains("--") || id.contains(['\r', '\n']) {
        return Err(WikiError::Workspace(format!(
            "Page id {:?} cannot be used in a single-file export",
            id
        )));
    }
    Ok(())
}

/// Body of a multi-file page
pub fn render_page_file(title: &str, content: &str) -> String {
    format!("# {}\n\n{}", title, content)
}

/// Split a multi-file page into `(title, body)`.
///
/// The title comes from a leading `# ` heading; without one the whole text
/// is the body and the title is unchanged.
pub fn parse_page_file(text: &str) -> (Option<String>, String) {
    let trimmed = text.trim_start_matches(['\n', '\r']);
    let (first, rest) = trimmed.split_once('\n').unwrap_or((trimmed, ""));

    match first.trim_end_matches('\r').strip_prefix("# ") {
        Some(title) if !title.trim().is_empty() => {
            // Only the blank line written after the heading belongs to the frame
            let body = strip_one_newline_start(rest);
            (Some(title.trim().to_string()), body.to_string())
        }
        _ => (None, text.to_string()),
    }
}

/// One page block of a single-file export
pub fn render_marked_page(id: &str, title: &str, content: &str) -> String {
    format!(
        "## {}\n\n{}\n{}\n{}\n\n",
        title,
        begin_marker(id),
        content,
        end_marker(id)
    )
}

fn strip_one_newline_start(s: &str) -> &str {
    s.strip_prefix("\r\n")
        .or_else(|| s.strip_prefix('\n'))
        .unwrap_or(s)
}

fn strip_one_newline_end(s: &str) -> &str {
    s.strip_suffix("\r\n")
        .or_else(|| s.strip_suffix('\n'))
        .unwrap_or(s)
}

/// Locate every marked page body in a single-file export.
///
/// Boundaries are found from the markers on every call, so edits that shift
/// offsets are fine. A page with a missing end marker is skipped; a repeated
/// id keeps its first block.
pub fn parse_marked_pages(text: &str) -> BTreeMap<String, String> {
    let mut pages = BTreeMap::new();
    let mut cursor = 0;

    while let Some(caps) = BEGIN_MARKER.captures_at(text, cursor) {
        let (Some(whole), Some(id)) = (caps.get(0), caps.get(1)) else {
            break;
        };
        let id = id.as_str();
        let body_start = whole.end();
        let end = end_marker(id);

        let Some(offset) = text[body_start..].find(&end) else {
            warn!("Page '{}' has no end marker; leaving it untouched", id);
            cursor = body_start;
            continue;
        };

        let raw = &text[body_start..body_start + offset];
        let body = strip_one_newline_end(strip_one_newline_start(raw));
        if pages.contains_key(id) {
            warn!("Page '{}' appears twice; keeping the first block", id);
        } else {
            pages.insert(id.to_string(), body.to_string());
        }
        cursor = body_start + offset + end.len();
    }

    pages
}
