//! Workspace sync
//!
//! Per page, across export/sync cycles:
//!
//! | on-disk state          | action                                    |
//! |------------------------|-------------------------------------------|
//! | hash equals manifest   | nothing                                   |
//! | hash differs           | write back to the cache, update manifest  |
//! | file missing           | nothing (never a deletion request)        |
//!
//! A sync is all-or-nothing. Every file is read and diffed first, the cache
//! is written (with retries), and only then is the manifest rewritten. If
//! the cache write fails the manifest keeps its old hashes, so the same
//! edits are picked up again by the next sync.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use backon::{BlockingRetryable, ExponentialBuilder};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::format::{parse_marked_pages, parse_page_file};
use super::manifest::{ExportLayout, ExportManifest};
use crate::constants::retry::{BASE_DELAY_MS, DEFAULT_MAX_ATTEMPTS, MAX_DELAY_MS};
use crate::types::{
    Result, WikiError, normalize_repo_path, redact_secrets, relative_repo_path, sha256_hex,
};
use crate::wiki::cache::{read_cache_file, write_cache_file};
use crate::wiki::types::{WikiCacheData, WikiPage};

/// Backoff for cache writes during sync
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first one included
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(BASE_DELAY_MS),
            max_delay: Duration::from_millis(MAX_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.base_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_attempts.saturating_sub(1))
    }
}

/// Outcome of one sync call
#[derive(Debug, Clone, Serialize)]
pub struct SyncSummary {
    pub updated: usize,
    pub timestamp: DateTime<Utc>,
    /// Ids of the pages written back
    pub pages: Vec<String>,
}

/// One detected local edit, not yet committed
struct PendingUpdate {
    page_id: String,
    title: Option<String>,
    content: String,
    hash: String,
    modified: Option<DateTime<Utc>>,
}

fn file_mtime(path: &Path) -> Option<DateTime<Utc>> {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .map(DateTime::<Utc>::from)
}

/// Workspace-relative form of a caller-supplied path
fn to_relative(root: &Path, canonical_root: Option<&Path>, path: &Path) -> Option<String> {
    if path.is_absolute() {
        relative_repo_path(root, path)
            .or_else(|| canonical_root.and_then(|r| relative_repo_path(r, path)))
            .or_else(|| {
                let canonical = path.canonicalize().ok()?;
                canonical_root.and_then(|r| relative_repo_path(r, &canonical))
            })
    } else {
        Some(normalize_repo_path(&path.to_string_lossy()))
    }
}

/// Files to hash-check: all tracked files, or the tracked subset of
/// `changed_paths`
fn files_to_check(
    manifest: &ExportManifest,
    root: &Path,
    changed_paths: Option<&[PathBuf]>,
) -> BTreeSet<String> {
    let tracked = manifest.tracked_files();
    let Some(changed) = changed_paths else {
        return tracked;
    };

    let canonical_root = root.canonicalize().ok();
    changed
        .iter()
        .filter_map(|p| to_relative(root, canonical_root.as_deref(), p))
        .filter(|rel| tracked.contains(rel))
        .collect()
}

fn detect_updates(
    manifest: &ExportManifest,
    root: &Path,
    relative_path: &str,
) -> Result<Vec<PendingUpdate>> {
    let path = root.join(relative_path);
    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("{} is missing; treating as unchanged", relative_path);
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };
    let text = String::from_utf8(bytes).map_err(|_| {
        WikiError::Workspace(format!("{} is not valid UTF-8", path.display()))
    })?;
    let modified = file_mtime(&path);

    let mut updates = Vec::new();
    match manifest.layout {
        ExportLayout::MultiFile => {
            let hash = sha256_hex(text.as_bytes());
            for entry in manifest.pages_in(relative_path) {
                if entry.content_hash == hash {
                    continue;
                }
                let (title, content) = parse_page_file(&text);
                updates.push(PendingUpdate {
                    page_id: entry.page_id.clone(),
                    title,
                    content,
                    hash: hash.clone(),
                    modified,
                });
            }
        }
        ExportLayout::SingleFile => {
            let blocks = parse_marked_pages(&text);
            for entry in manifest.pages_in(relative_path) {
                let Some(content) = blocks.get(&entry.page_id) else {
                    warn!(
                        "Markers for page '{}' not found in {}; leaving it untouched",
                        entry.page_id, relative_path
                    );
                    continue;
                };
                let hash = sha256_hex(content.as_bytes());
                if entry.content_hash != hash {
                    updates.push(PendingUpdate {
                        page_id: entry.page_id.clone(),
                        title: None,
                        content: content.clone(),
                        hash,
                        modified,
                    });
                }
            }
        }
    }
    Ok(updates)
}

fn apply_update(data: &mut WikiCacheData, update: &PendingUpdate) {
    let mut page = data
        .page(&update.page_id)
        .cloned()
        .unwrap_or_else(|| WikiPage::new(update.page_id.clone(), update.page_id.clone()));
    if let Some(title) = &update.title {
        page.title = title.clone();
    }
    page.content = update.content.clone();
    data.upsert_page(page);
}

/// Sync hand edits from a workspace back into its cache with the default
/// retry policy.
pub fn sync_manifest(manifest_path: &Path, changed_paths: Option<&[PathBuf]>) -> Result<SyncSummary> {
    sync_manifest_with(manifest_path, changed_paths, &RetryPolicy::default())
}

/// Sync hand edits back into the cache.
///
/// With `changed_paths`, only those files (absolute, or relative to the
/// workspace root) are hash-checked; untracked paths are ignored.
///
/// # Errors
///
/// - [`WikiError::ManifestCorrupt`] when the manifest does not parse
/// - [`WikiError::CacheMissing`] when the cache file it points to is gone
///   or unreadable
pub fn sync_manifest_with(
    manifest_path: &Path,
    changed_paths: Option<&[PathBuf]>,
    retry: &RetryPolicy,
) -> Result<SyncSummary> {
    let mut manifest = ExportManifest::load(manifest_path)?;
    let root = match manifest_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let cache_path = manifest.resolve_cache_file(&root);
    if !cache_path.is_file() {
        return Err(WikiError::CacheMissing { path: cache_path });
    }

    let files = files_to_check(&manifest, &root, changed_paths);
    let mut pending = Vec::new();
    for relative_path in &files {
        pending.extend(detect_updates(&manifest, &root, relative_path)?);
    }

    let timestamp = Utc::now();
    if pending.is_empty() {
        debug!("Sync of {}: {} files checked, no edits", root.display(), files.len());
        return Ok(SyncSummary {
            updated: 0,
            timestamp,
            pages: Vec::new(),
        });
    }

    let Some(mut data) = read_cache_file(&cache_path)? else {
        return Err(WikiError::CacheMissing { path: cache_path });
    };
    for update in &pending {
        apply_update(&mut data, update);
    }

    let write = || write_cache_file(&cache_path, &data);
    write
        .retry(retry.backoff())
        .sleep(std::thread::sleep)
        .when(|e| matches!(e, WikiError::Io(_)))
        .notify(|e, delay| {
            warn!(
                "Cache write to {} failed ({}); retrying in {:?}",
                cache_path.display(),
                redact_secrets(&e.to_string()),
                delay
            );
        })
        .call()?;

    for update in &pending {
        if let Some(entry) = manifest.pages.iter_mut().find(|p| p.page_id == update.page_id) {
            entry.content_hash = update.hash.clone();
            entry.modified_time = update.modified;
            if let Some(title) = &update.title {
                entry.title = title.clone();
            }
        }
    }
    manifest.last_synced_at = Some(timestamp);
    manifest.save(manifest_path)?;

    let pages: Vec<String> = pending.into_iter().map(|u| u.page_id).collect();
    info!(
        "Synced {} edited pages from {} into {}",
        pages.len(),
        root.display(),
        cache_path.display()
    );
    Ok(SyncSummary {
        updated: pages.len(),
        timestamp,
        pages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::workspace::SINGLE_FILE_NAME;
    use crate::types::{RepoIdentity, RepoType};
    use crate::wiki::WikiCacheStore;
    use crate::wiki::types::WikiStructureModel;
    use crate::wiki::workspace::export::export_markdown_workspace;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        store: WikiCacheStore,
        workspace: PathBuf,
        manifest_path: PathBuf,
        repo: RepoIdentity,
    }

    fn fixture(layout: ExportLayout) -> Fixture {
        let dir = TempDir::new().unwrap();
        let store = WikiCacheStore::new(dir.path().join("cache"));
        let repo = RepoIdentity::new("o", "r", RepoType::Github);

        let mut structure = WikiStructureModel::new("wiki", "Demo");
        structure.pages = vec![
            WikiPage::new("intro", "Intro"),
            WikiPage::new("usage", "Usage"),
        ];
        let mut data = WikiCacheData::new(repo.clone(), "en", structure);
        data.upsert_page(WikiPage::new("intro", "Intro").with_content("Hello\n"));
        data.upsert_page(WikiPage::new("usage", "Usage").with_content("Run it.\n"));
        let cache_file = store.save(&data).unwrap();

        let workspace = dir.path().join("ws");
        export_markdown_workspace(&data, &cache_file, &workspace, layout).unwrap();
        let manifest_path = ExportManifest::path_in(&workspace);

        Fixture {
            _dir: dir,
            store,
            workspace,
            manifest_path,
            repo,
        }
    }

    impl Fixture {
        fn cached(&self) -> WikiCacheData {
            self.store.load(&self.repo, "en").unwrap().unwrap()
        }
    }

    #[test]
    fn test_export_then_sync_updates_nothing() {
        for layout in [ExportLayout::MultiFile, ExportLayout::SingleFile] {
            let fx = fixture(layout);
            let summary = sync_manifest(&fx.manifest_path, None).unwrap();
            assert_eq!(summary.updated, 0);
        }
    }

    #[test]
    fn test_edit_one_file_restricted_sync() {
        let fx = fixture(ExportLayout::MultiFile);
        let before = fx.cached();
        let file = fx.workspace.join("intro.md");
        fs::write(&file, "# Introduction\n\nEdited by hand.\n").unwrap();

        let summary = sync_manifest(&fx.manifest_path, Some(&[file.clone()])).unwrap();
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.pages, vec!["intro".to_string()]);

        let after = fx.cached();
        let intro = after.page("intro").unwrap();
        assert_eq!(intro.content, "Edited by hand.\n");
        assert_eq!(intro.title, "Introduction");
        assert_eq!(after.page("usage"), before.page("usage"));

        let manifest = ExportManifest::load(&fx.manifest_path).unwrap();
        assert!(manifest.last_synced_at.is_some());
        assert_eq!(manifest.page("intro").unwrap().title, "Introduction");

        assert_eq!(sync_manifest(&fx.manifest_path, None).unwrap().updated, 0);
    }

    #[test]
    fn test_restricted_sync_ignores_other_edits() {
        let fx = fixture(ExportLayout::MultiFile);
        fs::write(fx.workspace.join("intro.md"), "# Intro\n\nchanged").unwrap();

        let only_usage = [PathBuf::from("usage.md")];
        assert_eq!(sync_manifest(&fx.manifest_path, Some(&only_usage)).unwrap().updated, 0);
        let untracked = [fx.workspace.join("notes.txt")];
        assert_eq!(sync_manifest(&fx.manifest_path, Some(&untracked)).unwrap().updated, 0);
        assert_eq!(sync_manifest(&fx.manifest_path, None).unwrap().updated, 1);
    }

    #[test]
    fn test_single_file_edit_reparses_markers() {
        let fx = fixture(ExportLayout::SingleFile);
        let file = fx.workspace.join(SINGLE_FILE_NAME);
        let text = fs::read_to_string(&file).unwrap();
        let edited = text
            .replace("# Demo\n", "# Demo\n\nA new preface that shifts every offset.\n")
            .replace("Run it.\n", "Run it with --release.\n");
        fs::write(&file, edited).unwrap();

        let summary = sync_manifest(&fx.manifest_path, Some(&[file])).unwrap();
        assert_eq!(summary.updated, 1);
        let data = fx.cached();
        assert_eq!(data.page("usage").unwrap().content, "Run it with --release.\n");
        assert_eq!(data.page("intro").unwrap().content, "Hello\n");
    }

    /// `cache_dir` as a path relative to the process working directory
    #[cfg(unix)]
    fn cwd_relative(path: &Path) -> PathBuf {
        let cwd = std::env::current_dir().unwrap();
        let mut relative: PathBuf = cwd.components().skip(1).map(|_| "..").collect();
        relative.push(path.strip_prefix("/").unwrap());
        relative
    }

    #[cfg(unix)]
    #[test]
    fn test_sync_with_cwd_relative_cache_dir() {
        let dir = TempDir::new().unwrap();
        let store = WikiCacheStore::new(cwd_relative(&dir.path().join(".cache")));
        let repo = RepoIdentity::new("o", "r", RepoType::Github);

        let mut structure = WikiStructureModel::new("wiki", "Demo");
        structure.pages = vec![WikiPage::new("intro", "Intro")];
        let mut data = WikiCacheData::new(repo.clone(), "en", structure);
        data.upsert_page(WikiPage::new("intro", "Intro").with_content("Hello\n"));
        let cache_file = store.save(&data).unwrap();
        assert!(cache_file.is_relative());

        let workspace = dir.path().join("docs");
        export_markdown_workspace(&data, &cache_file, &workspace, ExportLayout::MultiFile).unwrap();
        fs::write(workspace.join("intro.md"), "# Intro\n\nEdited.\n").unwrap();

        let summary = sync_manifest(&ExportManifest::path_in(&workspace), None).unwrap();
        assert_eq!(summary.updated, 1);
        assert_eq!(store.load(&repo, "en").unwrap().unwrap().page("intro").unwrap().content, "Edited.\n");
    }

    #[test]
    fn test_deleted_file_is_no_change() {
        let fx = fixture(ExportLayout::MultiFile);
        fs::remove_file(fx.workspace.join("usage.md")).unwrap();

        assert_eq!(sync_manifest(&fx.manifest_path, None).unwrap().updated, 0);
        assert_eq!(fx.cached().page("usage").unwrap().content, "Run it.\n");
    }

    #[test]
    fn test_corrupt_manifest() {
        let fx = fixture(ExportLayout::MultiFile);
        fs::write(&fx.manifest_path, "{ definitely not json").unwrap();
        let err = sync_manifest(&fx.manifest_path, None).unwrap_err();
        assert!(matches!(err, WikiError::ManifestCorrupt { .. }));
    }

    #[test]
    fn test_missing_cache() {
        let fx = fixture(ExportLayout::MultiFile);
        assert!(fx.store.delete(&fx.repo, "en").unwrap());
        let err = sync_manifest(&fx.manifest_path, None).unwrap_err();
        assert!(matches!(err, WikiError::CacheMissing { .. }));
    }

    #[test]
    fn test_corrupt_cache_with_pending_edits_keeps_manifest() {
        let fx = fixture(ExportLayout::MultiFile);
        fs::write(fx.workspace.join("intro.md"), "# Intro\n\nnew").unwrap();
        let before = ExportManifest::load(&fx.manifest_path).unwrap();
        let cache_path = before.resolve_cache_file(&fx.workspace);
        fs::write(&cache_path, "{\"checksum\": 1, \"data\": ").unwrap();

        let err = sync_manifest(&fx.manifest_path, None).unwrap_err();
        assert!(matches!(err, WikiError::CacheMissing { .. }));
        assert_eq!(ExportManifest::load(&fx.manifest_path).unwrap(), before);
        assert_eq!(fx.store.quarantined().unwrap().len(), 1);
    }

    #[test]
    fn test_retry_policy_attempts() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        };
        let mut calls = 0;
        let result: Result<()> = (|| {
            calls += 1;
            Err(WikiError::Io(std::io::Error::other("disk busy")))
        })
        .retry(policy.backoff())
        .sleep(std::thread::sleep)
        .when(|e| matches!(e, WikiError::Io(_)))
        .call();
        assert!(result.is_err());
        assert_eq!(calls, 3);
    }
}
