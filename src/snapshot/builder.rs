//! Snapshot Builder
//!
//! Turns a scanner listing into a [`RepoSnapshot`]. Digests are computed over
//! raw bytes, so the same tree yields the same snapshot on every platform
//! regardless of mtimes or checkout order.

use chrono::Utc;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::path::Path;
use tracing::{debug, info};

use super::model::{RepoSnapshot, RepoSnapshotFile};
use crate::analyzer::scanner::{FileSource, ScannedFile, ensure_readable_root};
use crate::types::{RepoIdentity, Result, normalize_repo_path, sha256_hex};

/// Build a snapshot from an already filtered `(path, bytes)` listing.
///
/// `root` must be an existing, readable directory. A duplicated path keeps
/// its first occurrence.
pub fn build_snapshot<I>(repo: RepoIdentity, root: &Path, files: I) -> Result<RepoSnapshot>
where
    I: IntoIterator<Item = ScannedFile>,
{
    ensure_readable_root(root)?;

    let mut map = BTreeMap::new();
    for file in files {
        let path = normalize_repo_path(&file.path);
        if path.is_empty() {
            continue;
        }
        match map.entry(path) {
            Entry::Occupied(existing) => {
                debug!("Duplicate path in scan listing: {}", existing.key());
            }
            Entry::Vacant(slot) => {
                let record = RepoSnapshotFile {
                    path: slot.key().clone(),
                    content_hash: sha256_hex(&file.bytes),
                    size: file.bytes.len() as u64,
                    modified_time: file.modified_time,
                };
                slot.insert(record);
            }
        }
    }

    Ok(RepoSnapshot {
        repo,
        files: map,
        created_at: Utc::now(),
    })
}

/// Scan a source and snapshot the result
pub fn snapshot_source<S: FileSource>(repo: RepoIdentity, source: &S) -> Result<RepoSnapshot> {
    let files = source.scan()?;
    let snapshot = build_snapshot(repo, source.root(), files)?;
    info!(
        "Snapshot of {}: {} files, {} bytes",
        snapshot.repo,
        snapshot.len(),
        snapshot.total_size()
    );
    Ok(snapshot)
}
