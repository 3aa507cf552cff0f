use chrono::{DateTime, Utc};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::constants::scan::{
    ALWAYS_EXCLUDED_DIRS, DEFAULT_EXCLUDED_DIRS, DEFAULT_EXCLUDED_FILES, DEFAULT_MAX_FILE_SIZE,
};
use crate::types::{Result, WikiError, log_filter_warn, normalize_repo_path, relative_repo_path};

/// One file produced by a scan: repo-relative path plus raw bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    pub path: String,
    pub bytes: Vec<u8>,
    pub modified_time: Option<DateTime<Utc>>,
}

impl ScannedFile {
    pub fn new(path: impl AsRef<str>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            path: normalize_repo_path(path.as_ref()),
            bytes: bytes.into(),
            modified_time: None,
        }
    }
}

/// Anything that can list a repository's files in a stable order
pub trait FileSource {
    /// Root the listed paths are relative to
    fn root(&self) -> &Path;

    /// Ordered, filtered `(path, bytes)` listing
    fn scan(&self) -> Result<Vec<ScannedFile>>;
}

/// Inclusion/exclusion rules applied during a scan.
///
/// When any inclusion list is non-empty the filter runs in inclusion mode
/// and exclusion lists are ignored. VCS and dependency directories stay
/// out in both modes unless an included dir rule points inside one.
#[derive(Debug, Clone, Default)]
pub struct ScanFilter {
    pub included_dirs: Vec<String>,
    pub excluded_dirs: Vec<String>,
    pub included_files: Vec<String>,
    pub excluded_files: Vec<String>,
}

impl ScanFilter {
    /// Filter with the built-in VCS/build/binary exclusions
    pub fn with_defaults() -> Self {
        Self {
            excluded_dirs: DEFAULT_EXCLUDED_DIRS.iter().map(|s| s.to_string()).collect(),
            excluded_files: DEFAULT_EXCLUDED_FILES.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    fn inclusion_mode(&self) -> bool {
        !self.included_dirs.is_empty() || !self.included_files.is_empty()
    }

    /// Decide whether a repo-relative path is part of the snapshot
    pub fn accepts(&self, rel_path: &str) -> bool {
        if self.inclusion_mode() {
            let dir_hit = self
                .included_dirs
                .iter()
                .any(|d| dir_rule_matches(d, rel_path));
            if dir_hit {
                return true;
            }
            if ALWAYS_EXCLUDED_DIRS
                .iter()
                .any(|d| dir_rule_matches(d, rel_path))
            {
                return false;
            }
            return self
                .included_files
                .iter()
                .any(|p| file_rule_matches(p, rel_path));
        }

        let dir_hit = self
            .excluded_dirs
            .iter()
            .any(|d| dir_rule_matches(d, rel_path));
        let file_hit = self
            .excluded_files
            .iter()
            .any(|p| file_rule_matches(p, rel_path));
        !(dir_hit || file_hit)
    }
}

/// A dir rule with a slash is a prefix of the path; a bare name matches
/// any directory component.
fn dir_rule_matches(rule: &str, rel_path: &str) -> bool {
    let rule = normalize_repo_path(rule);
    if rule.is_empty() {
        return false;
    }
    if rule.contains('/') {
        return rel_path.starts_with(&format!("{}/", rule));
    }
    let mut components: Vec<&str> = rel_path.split('/').collect();
    components.pop();
    components.iter().any(|c| *c == rule)
}

/// File rules are globs matched against the file name and the full path
fn file_rule_matches(rule: &str, rel_path: &str) -> bool {
    let Ok(pattern) = glob::Pattern::new(rule) else {
        return false;
    };
    let file_name = rel_path.rsplit('/').next().unwrap_or(rel_path);
    pattern.matches(file_name) || pattern.matches(rel_path)
}

/// Walks a local checkout
pub struct RepoScanner {
    root: PathBuf,
    filter: ScanFilter,
    max_file_size: u64,
}

impl RepoScanner {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            filter: ScanFilter::with_defaults(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    pub fn with_filter(mut self, filter: ScanFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_max_file_size(mut self, size: u64) -> Self {
        self.max_file_size = size;
        self
    }

    /// Fails when the root is missing, not a directory, or not listable.
    /// A missing `.git` is fine.
    pub fn ensure_root(&self) -> Result<()> {
        ensure_readable_root(&self.root)
    }

    /// Relative paths only, without reading contents
    pub fn paths(&self) -> Result<Vec<String>> {
        Ok(self.walk()?.into_iter().map(|(rel, _)| rel).collect())
    }

    fn walk(&self) -> Result<Vec<(String, PathBuf)>> {
        self.ensure_root()?;

        let walker = WalkBuilder::new(&self.root)
            .hidden(false)
            .git_ignore(true)
            .git_global(false)
            .git_exclude(true)
            .require_git(false)
            .follow_links(false)
            .build();

        let mut files = Vec::new();
        for entry in walker.filter_map(|e| log_filter_warn(e, "Skipping unreadable entry")) {
            let path = entry.path();
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let Some(rel) = relative_repo_path(&self.root, path) else {
                continue;
            };
            if !self.filter.accepts(&rel) {
                continue;
            }
            if let Ok(metadata) = entry.metadata()
                && metadata.len() > self.max_file_size
            {
                debug!("Skipping {} ({} bytes over limit)", rel, metadata.len());
                continue;
            }
            files.push((rel, path.to_path_buf()));
        }

        files.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(files)
    }
}

impl FileSource for RepoScanner {
    fn root(&self) -> &Path {
        &self.root
    }

    fn scan(&self) -> Result<Vec<ScannedFile>> {
        let mut scanned = Vec::new();
        for (rel, abs) in self.walk()? {
            let Some(bytes) = log_filter_warn(std::fs::read(&abs), &format!("Skipping {}", rel))
            else {
                continue;
            };
            let modified_time = std::fs::metadata(&abs)
                .and_then(|m| m.modified())
                .ok()
                .map(DateTime::<Utc>::from);
            scanned.push(ScannedFile {
                path: rel,
                bytes,
                modified_time,
            });
        }
        debug!("Scanned {} files under {}", scanned.len(), self.root.display());
        Ok(scanned)
    }
}

/// Shared root check for scanners and snapshot builders
pub fn ensure_readable_root(root: &Path) -> Result<()> {
    let metadata = std::fs::metadata(root)
        .map_err(|e| WikiError::scan(root.to_string_lossy(), e.to_string()))?;
    if !metadata.is_dir() {
        return Err(WikiError::scan(root.to_string_lossy(), "not a directory"));
    }
    std::fs::read_dir(root)
        .map_err(|e| WikiError::scan(root.to_string_lossy(), format!("not readable: {}", e)))?;
    Ok(())
}
