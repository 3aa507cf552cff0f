//! Change Detector
//!
//! Compares two snapshots of the same repository. Only `content_hash` decides
//! whether a shared path changed; size and mtime differ across checkouts and
//! platforms and are ignored.

use tracing::debug;

use super::model::{ChangeSummary, RepoSnapshot};
use crate::types::{Result, WikiError};

/// Diff `baseline` against `target`.
///
/// Fails with [`WikiError::IdentityMismatch`] when the snapshots belong to
/// different repositories. An empty baseline yields "every file is new".
pub fn detect_changes(baseline: &RepoSnapshot, target: &RepoSnapshot) -> Result<ChangeSummary> {
    if baseline.repo != target.repo {
        return Err(WikiError::IdentityMismatch {
            baseline: baseline.repo.to_string(),
            target: target.repo.to_string(),
        });
    }

    let mut summary = ChangeSummary::default();

    for (path, file) in &target.files {
        match baseline.files.get(path) {
            None => {
                summary.new_files.insert(path.clone());
            }
            Some(previous) if previous.content_hash != file.content_hash => {
                summary.changed_files.insert(path.clone());
            }
            Some(_) => {}
        }
    }

    for path in baseline.files.keys() {
        if !target.files.contains_key(path) {
            summary.deleted_files.insert(path.clone());
        }
    }

    debug!("Changes for {}: {}", target.repo, summary.describe());
    Ok(summary)
}

/// Diff against an optional baseline; `None` is treated as an empty snapshot
pub fn detect_changes_from(
    baseline: Option<&RepoSnapshot>,
    target: &RepoSnapshot,
) -> Result<ChangeSummary> {
    match baseline {
        Some(baseline) => detect_changes(baseline, target),
        None => detect_changes(&RepoSnapshot::empty(target.repo.clone()), target),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::model::RepoSnapshotFile;
    use crate::types::{RepoIdentity, RepoType};
    use chrono::Utc;
    use proptest::prelude::*;
    use std::collections::{BTreeMap, BTreeSet};

    fn repo(name: &str) -> RepoIdentity {
        RepoIdentity::new("owner", name, RepoType::Github)
    }

    fn snapshot(name: &str, files: &[(&str, &str)]) -> RepoSnapshot {
        let files = files
            .iter()
            .map(|(path, hash)| {
                (
                    path.to_string(),
                    RepoSnapshotFile {
                        path: path.to_string(),
                        content_hash: hash.to_string(),
                        size: 1,
                        modified_time: None,
                    },
                )
            })
            .collect();
        RepoSnapshot {
            repo: repo(name),
            files,
            created_at: Utc::now(),
        }
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_scenario_new_and_changed() {
        let baseline = snapshot("r", &[("a.py", "h1"), ("b.py", "h2")]);
        let target = snapshot("r", &[("a.py", "h1"), ("b.py", "h3"), ("c.py", "h4")]);

        let changes = detect_changes(&baseline, &target).unwrap();
        assert_eq!(changes.new_files, set(&["c.py"]));
        assert!(changes.deleted_files.is_empty());
        assert_eq!(changes.changed_files, set(&["b.py"]));
    }

    #[test]
    fn test_size_and_mtime_are_ignored() {
        let baseline = snapshot("r", &[("a.py", "h1")]);
        let mut target = baseline.clone();
        let file = target.files.get_mut("a.py").unwrap();
        file.size = 999;
        file.modified_time = Some(Utc::now());

        assert!(detect_changes(&baseline, &target).unwrap().is_empty());
    }

    #[test]
    fn test_identity_mismatch() {
        let a = snapshot("one", &[]);
        let b = snapshot("two", &[]);
        let err = detect_changes(&a, &b).unwrap_err();
        assert!(matches!(err, WikiError::IdentityMismatch { .. }));
    }

    #[test]
    fn test_missing_baseline_means_all_new() {
        let target = snapshot("r", &[("a.py", "h1"), ("b.py", "h2")]);
        let changes = detect_changes_from(None, &target).unwrap();
        assert_eq!(changes.new_files, set(&["a.py", "b.py"]));
        assert!(changes.deleted_files.is_empty());
        assert!(changes.changed_files.is_empty());
    }

    fn arb_files() -> impl Strategy<Value = BTreeMap<String, String>> {
        prop::collection::btree_map("[a-d]{1,2}\\.py", "h[0-2]", 0..8)
    }

    fn from_map(name: &str, files: &BTreeMap<String, String>) -> RepoSnapshot {
        let pairs: Vec<(&str, &str)> = files.iter().map(|(p, h)| (p.as_str(), h.as_str())).collect();
        snapshot(name, &pairs)
    }

    proptest! {
        #[test]
        fn prop_self_diff_is_empty(files in arb_files()) {
            let s = from_map("r", &files);
            prop_assert!(detect_changes(&s, &s).unwrap().is_empty());
        }

        #[test]
        fn prop_diff_is_antisymmetric(a in arb_files(), b in arb_files()) {
            let sa = from_map("r", &a);
            let sb = from_map("r", &b);
            let ab = detect_changes(&sa, &sb).unwrap();
            let ba = detect_changes(&sb, &sa).unwrap();
            prop_assert_eq!(&ab.new_files, &ba.deleted_files);
            prop_assert_eq!(&ab.deleted_files, &ba.new_files);
            prop_assert_eq!(&ab.changed_files, &ba.changed_files);
        }

        #[test]
        fn prop_sets_partition_touched_paths(a in arb_files(), b in arb_files()) {
            let changes = detect_changes(&from_map("r", &a), &from_map("r", &b)).unwrap();
            prop_assert!(changes.new_files.is_disjoint(&changes.deleted_files));
            prop_assert!(changes.new_files.is_disjoint(&changes.changed_files));
            prop_assert!(changes.deleted_files.is_disjoint(&changes.changed_files));

            let union: BTreeSet<&String> = a.keys().chain(b.keys()).collect();
            let unchanged: BTreeSet<&String> = a
                .iter()
                .filter(|(p, h)| b.get(*p) == Some(*h))
                .map(|(p, _)| p)
                .collect();
            let expected: BTreeSet<&str> = union
                .difference(&unchanged)
                .map(|p| p.as_str())
                .collect();
            prop_assert_eq!(changes.all_paths(), expected);
        }

        #[test]
        fn prop_mismatched_identity_always_fails(a in arb_files(), b in arb_files()) {
            let result = detect_changes(&from_map("left", &a), &from_map("right", &b));
            let is_mismatch = matches!(result, Err(WikiError::IdentityMismatch { .. }));
            prop_assert!(is_mismatch);
        }
    }
}
