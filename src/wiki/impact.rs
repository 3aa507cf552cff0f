//! Page-Impact Resolver
//!
//! Maps a [`ChangeSummary`] onto the pages whose content may now be stale.
//!
//! A page is affected when:
//! - one of its `file_paths` was changed or deleted, or
//! - the repository gained files and the page declares no `file_paths`.
//!   Such pages may state that something does not exist; any new file can
//!   falsify that, so they are always regenerated when the tree grows.
//!
//! Deleted dependencies mark a page affected but never remove it.

use std::collections::BTreeSet;
use tracing::{debug, info};

use super::types::{WikiCacheData, WikiStructureModel};
use crate::snapshot::{ChangeSummary, RepoSnapshot, detect_changes};
use crate::types::{Result, normalize_repo_path};

/// Ids of pages invalidated by `changes`.
///
/// Empty only when `changes` is empty. A missing baseline must be handled by
/// the caller as "everything affected" (see [`plan_regeneration`]).
pub fn find_affected_pages(
    structure: &WikiStructureModel,
    changes: &ChangeSummary,
) -> BTreeSet<String> {
    let repo_grew = !changes.new_files.is_empty();
    let mut affected = BTreeSet::new();

    for page in &structure.pages {
        if page.file_paths.is_empty() {
            if repo_grew {
                debug!("Page '{}' has no dependencies and the repo grew", page.id);
                affected.insert(page.id.clone());
            }
            continue;
        }

        if let Some(path) = page
            .file_paths
            .iter()
            .map(|p| normalize_repo_path(p))
            .find(|p| changes.invalidates(p))
        {
            debug!("Page '{}' depends on touched file {}", page.id, path);
            affected.insert(page.id.clone());
        }
    }

    affected
}

/// What a regeneration run has to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegenerationPlan {
    /// Cached snapshot matches the current tree
    UpToDate,
    /// Regenerate structure and every page
    Full { reason: FullRegenerationReason },
    /// Regenerate only the listed pages
    Incremental {
        changes: ChangeSummary,
        affected: BTreeSet<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FullRegenerationReason {
    /// No cache file (or an incompatible/quarantined one)
    NoCache,
    /// Cache exists but records no snapshot to diff against
    NoBaselineSnapshot,
    /// Cached structure has no pages
    EmptyStructure,
}

impl std::fmt::Display for FullRegenerationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoCache => write!(f, "no usable cache"),
            Self::NoBaselineSnapshot => write!(f, "cache has no baseline snapshot"),
            Self::EmptyStructure => write!(f, "cached structure has no pages"),
        }
    }
}

impl RegenerationPlan {
    pub fn is_up_to_date(&self) -> bool {
        matches!(self, RegenerationPlan::UpToDate)
    }

    /// Pages to regenerate, given the structure in use.
    ///
    /// For a full plan this is every page of `structure`.
    pub fn pages_to_regenerate(&self, structure: &WikiStructureModel) -> BTreeSet<String> {
        match self {
            RegenerationPlan::UpToDate => BTreeSet::new(),
            RegenerationPlan::Full { .. } => structure.page_ids().map(String::from).collect(),
            RegenerationPlan::Incremental { affected, .. } => affected.clone(),
        }
    }
}

/// Decide between no-op, incremental and full regeneration.
///
/// A missing cache or a cache without a recorded snapshot always plans a
/// full run; it is never read as "nothing changed".
pub fn plan_regeneration(
    cached: Option<&WikiCacheData>,
    current: &RepoSnapshot,
) -> Result<RegenerationPlan> {
    let Some(cached) = cached else {
        return Ok(RegenerationPlan::Full {
            reason: FullRegenerationReason::NoCache,
        });
    };
    let Some(baseline) = cached.snapshot.as_ref() else {
        return Ok(RegenerationPlan::Full {
            reason: FullRegenerationReason::NoBaselineSnapshot,
        });
    };
    if cached.structure.pages.is_empty() {
        return Ok(RegenerationPlan::Full {
            reason: FullRegenerationReason::EmptyStructure,
        });
    }

    let changes = detect_changes(baseline, current)?;
    if changes.is_empty() {
        info!("{} is up to date", current.repo);
        return Ok(RegenerationPlan::UpToDate);
    }

    let affected = find_affected_pages(&cached.structure, &changes);
    info!(
        "{}: {} -> {} of {} pages affected",
        current.repo,
        changes.describe(),
        affected.len(),
        cached.structure.pages.len()
    );
    Ok(RegenerationPlan::Incremental { changes, affected })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::RepoSnapshotFile;
    use crate::types::{RepoIdentity, RepoType};
    use crate::wiki::types::WikiPage;
    use proptest::prelude::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn structure() -> WikiStructureModel {
        let mut s = WikiStructureModel::new("wiki", "Demo");
        s.pages = vec![
            WikiPage::new("P1", "One").with_files(["a.py"]),
            WikiPage::new("P2", "Two"),
        ];
        s
    }

    fn repo() -> RepoIdentity {
        RepoIdentity::new("o", "r", RepoType::Github)
    }

    fn snapshot(files: &[(&str, &str)]) -> RepoSnapshot {
        let mut s = RepoSnapshot::empty(repo());
        for (path, hash) in files {
            s.files.insert(
                path.to_string(),
                RepoSnapshotFile {
                    path: path.to_string(),
                    content_hash: hash.to_string(),
                    size: 0,
                    modified_time: None,
                },
            );
        }
        s
    }

    #[test]
    fn test_scenario_changed_dependency() {
        let changes = ChangeSummary {
            changed_files: set(&["a.py"]),
            ..Default::default()
        };
        assert_eq!(find_affected_pages(&structure(), &changes), set(&["P1"]));
    }

    #[test]
    fn test_scenario_new_file_hits_dependency_less_pages() {
        let changes = ChangeSummary {
            new_files: set(&["z.py"]),
            ..Default::default()
        };
        assert_eq!(find_affected_pages(&structure(), &changes), set(&["P2"]));
    }

    #[test]
    fn test_deleted_dependency_marks_affected() {
        let changes = ChangeSummary {
            deleted_files: set(&["a.py"]),
            ..Default::default()
        };
        let s = structure();
        assert_eq!(find_affected_pages(&s, &changes), set(&["P1"]));
        assert_eq!(s.pages.len(), 2);
    }

    #[test]
    fn test_dependency_paths_are_normalized() {
        let mut s = structure();
        s.pages[0].file_paths = vec!["./src\\a.py".into()];
        let changes = ChangeSummary {
            changed_files: set(&["src/a.py"]),
            ..Default::default()
        };
        assert_eq!(find_affected_pages(&s, &changes), set(&["P1"]));
    }

    #[test]
    fn test_empty_changes_affect_nothing() {
        assert!(find_affected_pages(&structure(), &ChangeSummary::default()).is_empty());
    }

    #[test]
    fn test_plan_without_cache_is_full() {
        let plan = plan_regeneration(None, &snapshot(&[("a.py", "h")])).unwrap();
        assert_eq!(
            plan,
            RegenerationPlan::Full {
                reason: FullRegenerationReason::NoCache
            }
        );
        assert_eq!(plan.pages_to_regenerate(&structure()), set(&["P1", "P2"]));
    }

    #[test]
    fn test_plan_without_baseline_is_full() {
        let data = WikiCacheData::new(repo(), "en", structure());
        let plan = plan_regeneration(Some(&data), &snapshot(&[])).unwrap();
        assert!(matches!(
            plan,
            RegenerationPlan::Full {
                reason: FullRegenerationReason::NoBaselineSnapshot
            }
        ));
    }

    #[test]
    fn test_plan_incremental_and_up_to_date() {
        let baseline = snapshot(&[("a.py", "h1"), ("b.py", "h2")]);
        let data = WikiCacheData::new(repo(), "en", structure()).with_snapshot(baseline.clone());

        let plan = plan_regeneration(Some(&data), &baseline).unwrap();
        assert!(plan.is_up_to_date());

        let current = snapshot(&[("a.py", "h9"), ("b.py", "h2")]);
        match plan_regeneration(Some(&data), &current).unwrap() {
            RegenerationPlan::Incremental { changes, affected } => {
                assert_eq!(changes.changed_files, set(&["a.py"]));
                assert_eq!(affected, set(&["P1"]));
            }
            other => panic!("unexpected plan: {:?}", other),
        }
    }

    #[test]
    fn test_plan_rejects_foreign_snapshot() {
        let data = WikiCacheData::new(repo(), "en", structure()).with_snapshot(snapshot(&[]));
        let foreign = RepoSnapshot::empty(RepoIdentity::new("x", "y", RepoType::Gitlab));
        assert!(plan_regeneration(Some(&data), &foreign).is_err());
    }

    proptest! {
        #[test]
        fn prop_single_dependency_page(
            changed in prop::collection::btree_set("[a-c]\\.py", 0..3),
            deleted in prop::collection::btree_set("[d-f]\\.py", 0..3),
            added in prop::collection::btree_set("[g-i]\\.py", 0..3),
        ) {
            let mut s = WikiStructureModel::new("w", "W");
            s.pages = vec![WikiPage::new("P", "P").with_files(["a.py"])];
            let changes = ChangeSummary {
                new_files: added,
                deleted_files: deleted,
                changed_files: changed,
            };
            let expected = changes.invalidates("a.py");
            prop_assert_eq!(find_affected_pages(&s, &changes).contains("P"), expected);
        }

        #[test]
        fn prop_dependency_less_page(
            added in prop::collection::btree_set("[a-z]\\.py", 0..3),
            changed in prop::collection::btree_set("[a-z]\\.rs", 0..3),
        ) {
            let mut s = WikiStructureModel::new("w", "W");
            s.pages = vec![WikiPage::new("P", "P")];
            let grew = !added.is_empty();
            let changes = ChangeSummary {
                new_files: added,
                changed_files: changed,
                ..Default::default()
            };
            prop_assert_eq!(find_affected_pages(&s, &changes).contains("P"), grew);
        }
    }
}
