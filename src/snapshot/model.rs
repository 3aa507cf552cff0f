//! Snapshot data model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::types::RepoIdentity;

/// One tracked file. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoSnapshotFile {
    /// Repo-relative, forward-slash path
    pub path: String,
    /// SHA-256 hex of the file bytes
    pub content_hash: String,
    pub size: u64,
    /// Informational only; never part of equality checks in diffs
    #[serde(default)]
    pub modified_time: Option<DateTime<Utc>>,
}

/// Point-in-time fingerprint of a repository's file set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoSnapshot {
    pub repo: RepoIdentity,
    /// Sole source of truth for "does this path exist in the snapshot"
    pub files: BTreeMap<String, RepoSnapshotFile>,
    pub created_at: DateTime<Utc>,
}

impl RepoSnapshot {
    /// Snapshot with no files: the baseline used when nothing was cached
    pub fn empty(repo: RepoIdentity) -> Self {
        Self {
            repo,
            files: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn get(&self, path: &str) -> Option<&RepoSnapshotFile> {
        self.files.get(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// Total size of tracked content in bytes
    pub fn total_size(&self) -> u64 {
        self.files.values().map(|f| f.size).sum()
    }
}

/// New, deleted and changed paths between a baseline and a target snapshot.
///
/// The three sets are disjoint. Unchanged paths appear in none of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSummary {
    pub new_files: BTreeSet<String>,
    pub deleted_files: BTreeSet<String>,
    pub changed_files: BTreeSet<String>,
}

impl ChangeSummary {
    pub fn is_empty(&self) -> bool {
        self.new_files.is_empty() && self.deleted_files.is_empty() && self.changed_files.is_empty()
    }

    /// Total number of touched paths
    pub fn len(&self) -> usize {
        self.new_files.len() + self.deleted_files.len() + self.changed_files.len()
    }

    /// Whether the path was changed or deleted (the edges that invalidate a page)
    pub fn invalidates(&self, path: &str) -> bool {
        self.changed_files.contains(path) || self.deleted_files.contains(path)
    }

    /// Every touched path, sorted
    pub fn all_paths(&self) -> BTreeSet<&str> {
        self.new_files
            .iter()
            .chain(&self.deleted_files)
            .chain(&self.changed_files)
            .map(String::as_str)
            .collect()
    }

    /// One-line summary for logs and CLI output
    pub fn describe(&self) -> String {
        format!(
            "{} new, {} deleted, {} changed",
            self.new_files.len(),
            self.deleted_files.len(),
            self.changed_files.len()
        )
    }
}
