//! Export manifest
//!
//! The manifest is the only record of which workspace file holds which
//! cached page. It is never rebuilt automatically: a malformed manifest is
//! reported as [`WikiError::ManifestCorrupt`] and the user re-exports.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use ignore::WalkBuilder;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::constants::workspace::{MANIFEST_FILE, MANIFEST_SEARCH_DEPTH};
use crate::types::{RepoIdentity, Result, WikiError, normalize_repo_path, write_atomic};

/// How pages are laid out on disk
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ExportLayout {
    /// Every page in one file, delimited by id markers
    SingleFile,
    /// One file per page
    #[default]
    MultiFile,
}

impl ExportLayout {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportLayout::SingleFile => "single-file",
            ExportLayout::MultiFile => "multi-file",
        }
    }
}

impl fmt::Display for ExportLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportLayout {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "single-file" | "single" => Ok(ExportLayout::SingleFile),
            "multi-file" | "multi" => Ok(ExportLayout::MultiFile),
            _ => Err(format!(
                "Unknown layout: {}. Valid values: single-file, multi-file",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Markdown,
}

/// One page as it was last exported or synced
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExportedPage {
    pub page_id: String,
    pub title: String,
    /// Path relative to the workspace root, forward slashes
    pub relative_path: String,
    /// SHA-256 of the page's synced text. Whole file for multi-file
    /// layouts, marker body for single-file layouts.
    pub content_hash: String,
    #[serde(default)]
    pub modified_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExportManifest {
    pub repo: RepoIdentity,
    /// Schema version of the cache this workspace was exported from
    pub version: u32,
    pub cache_file: PathBuf,
    pub layout: ExportLayout,
    #[serde(default)]
    pub format: ExportFormat,
    /// Workspace root at export time. Sync resolves files against the
    /// manifest's own directory, so moved workspaces keep working.
    pub root_dir: PathBuf,
    pub pages: Vec<ExportedPage>,
    pub exported_at: DateTime<Utc>,
    #[serde(default)]
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl ExportManifest {
    /// Manifest location for a workspace root
    pub fn path_in(root: &Path) -> PathBuf {
        root.join(MANIFEST_FILE)
    }

    /// Read a manifest.
    ///
    /// A missing file is a workspace error; unparseable content is
    /// [`WikiError::ManifestCorrupt`].
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(WikiError::Workspace(format!(
                    "No export manifest at {}",
                    path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes).map_err(|e| WikiError::manifest_corrupt(path, e.to_string()))
    }

    /// Atomically replace the manifest at `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(self)?;
        write_atomic(path, &bytes)?;
        debug!("Wrote manifest {}", path.display());
        Ok(())
    }

    /// Entries stored in the normalized `relative_path`
    pub fn pages_in<'a>(&'a self, relative_path: &'a str) -> impl Iterator<Item = &'a ExportedPage> {
        self.pages
            .iter()
            .filter(move |p| normalize_repo_path(&p.relative_path) == relative_path)
    }

    pub fn page(&self, page_id: &str) -> Option<&ExportedPage> {
        self.pages.iter().find(|p| p.page_id == page_id)
    }

    /// Distinct workspace-relative files referenced by the manifest
    pub fn tracked_files(&self) -> BTreeSet<String> {
        self.pages
            .iter()
            .map(|p| normalize_repo_path(&p.relative_path))
            .collect()
    }

    /// Cache file path, relative entries resolved against `root`
    pub fn resolve_cache_file(&self, root: &Path) -> PathBuf {
        if self.cache_file.is_absolute() {
            self.cache_file.clone()
        } else {
            root.join(&self.cache_file)
        }
    }
}

/// Find every manifest under `base_dir`.
///
/// Unreadable or corrupt manifests are logged and skipped; this is a
/// listing for selection, not a sync.
pub fn list_manifests(base_dir: &Path) -> Result<Vec<(PathBuf, ExportManifest)>> {
    if !base_dir.is_dir() {
        return Err(WikiError::Workspace(format!(
            "Not a directory: {}",
            base_dir.display()
        )));
    }

    let walker = WalkBuilder::new(base_dir)
        .hidden(false)
        .git_ignore(false)
        .follow_links(false)
        .max_depth(Some(MANIFEST_SEARCH_DEPTH))
        .build();

    let mut found = Vec::new();
    for entry in walker.filter_map(|e| e.ok()) {
        if entry.file_type().is_none_or(|t| !t.is_file())
            || entry.file_name() != MANIFEST_FILE
        {
            continue;
        }
        let path = entry.into_path();
        match ExportManifest::load(&path) {
            Ok(manifest) => found.push((path, manifest)),
            Err(e) => warn!("Skipping manifest {}: {}", path.display(), e),
        }
    }

    found.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RepoType;
    use tempfile::TempDir;

    fn manifest(root: &Path) -> ExportManifest {
        ExportManifest {
            repo: RepoIdentity::new("o", "r", RepoType::Github),
            version: 2,
            cache_file: root.join("cache.json"),
            layout: ExportLayout::MultiFile,
            format: ExportFormat::Markdown,
            root_dir: root.to_path_buf(),
            pages: vec![
                ExportedPage {
                    page_id: "a".into(),
                    title: "A".into(),
                    relative_path: "a.md".into(),
                    content_hash: "h".into(),
                    modified_time: None,
                },
                ExportedPage {
                    page_id: "b".into(),
                    title: "B".into(),
                    relative_path: "./b.md".into(),
                    content_hash: "h".into(),
                    modified_time: None,
                },
            ],
            exported_at: Utc::now(),
            last_synced_at: None,
        }
    }

    #[test]
    fn test_layout_parsing() {
        assert_eq!("single-file".parse::<ExportLayout>().unwrap(), ExportLayout::SingleFile);
        assert_eq!("MULTI_FILE".parse::<ExportLayout>().unwrap(), ExportLayout::MultiFile);
        assert!("pdf".parse::<ExportLayout>().is_err());
        assert_eq!(
            serde_json::to_string(&ExportLayout::SingleFile).unwrap(),
            "\"single-file\""
        );
    }

    #[test]
    fn test_save_load_and_lookups() {
        let dir = TempDir::new().unwrap();
        let path = ExportManifest::path_in(dir.path());
        let m = manifest(dir.path());
        m.save(&path).unwrap();

        let loaded = ExportManifest::load(&path).unwrap();
        assert_eq!(loaded, m);
        assert_eq!(loaded.pages_in("a.md").count(), 1);
        assert_eq!(loaded.page("b").unwrap().title, "B");
        assert_eq!(
            loaded.tracked_files().into_iter().collect::<Vec<_>>(),
            vec!["a.md".to_string(), "b.md".to_string()]
        );
    }

    #[test]
    fn test_malformed_manifest_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = ExportManifest::path_in(dir.path());
        fs::write(&path, "{\"repo\": ").unwrap();

        let err = ExportManifest::load(&path).unwrap_err();
        assert!(matches!(err, WikiError::ManifestCorrupt { .. }));
        assert!(err.remediation().is_some());
    }

    #[test]
    fn test_missing_manifest_is_workspace_error() {
        let dir = TempDir::new().unwrap();
        let err = ExportManifest::load(&ExportManifest::path_in(dir.path())).unwrap_err();
        assert!(matches!(err, WikiError::Workspace(_)));
    }

    #[test]
    fn test_list_manifests_skips_corrupt() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("docs");
        let bad = dir.path().join("broken");
        fs::create_dir_all(&good).unwrap();
        fs::create_dir_all(&bad).unwrap();
        manifest(&good).save(&ExportManifest::path_in(&good)).unwrap();
        fs::write(ExportManifest::path_in(&bad), "not json").unwrap();

        let found = list_manifests(dir.path()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0, ExportManifest::path_in(&good));
    }
}
