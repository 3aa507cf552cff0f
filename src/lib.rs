//! wikidelta - Incremental wiki maintenance for source repositories
//!
//! Keeps a generated wiki consistent with the repository it documents:
//! fingerprints the file set, works out which pages a change invalidates,
//! and syncs hand edits from an exported Markdown workspace back into the
//! machine-owned cache.
//!
//! ## Quick Start
//!
//! ```ignore
//! use wikidelta::{RepoScanner, WikiCacheStore, plan_regeneration, snapshot_source};
//!
//! let repo = RepoIdentity::from_local_path(root)?;
//! let current = snapshot_source(repo.clone(), &RepoScanner::new(root))?;
//! let store = WikiCacheStore::new(cache_dir);
//! let cached = store.load(&repo, "en")?;
//! let plan = plan_regeneration(cached.as_ref(), &current)?;
//! ```
//!
//! ## Modules
//!
//! - [`analyzer`]: gitignore-aware repository scanning
//! - [`snapshot`]: file fingerprints and change detection
//! - [`wiki`]: cache store, page impact, workspace export/sync/watch
//! - [`ai`]: page regeneration over pluggable completion backends
//! - [`config`]: layered configuration

pub mod ai;
pub mod analyzer;
pub mod cli;
pub mod config;
pub mod constants;
pub mod snapshot;
pub mod types;
pub mod wiki;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{Config, ConfigLoader};

// Error Types
pub use types::error::{CorruptionKind, Result, ResultExt, WikiError};
pub use types::{RepoIdentity, RepoLocator, RepoType};

// =============================================================================
// Change Detection Re-exports
// =============================================================================

pub use analyzer::{FileSource, RepoScanner, ScanFilter, ScannedFile};
pub use snapshot::{
    ChangeSummary, RepoSnapshot, RepoSnapshotFile, build_snapshot, detect_changes, snapshot_source,
};

// =============================================================================
// Wiki Re-exports
// =============================================================================

pub use wiki::{
    ExportLayout, ExportManifest, RegenerationPlan, SyncSummary, WikiCacheData, WikiCacheStore,
    WikiPage, WikiStructureModel, WorkspaceWatcher, export_markdown_workspace, find_affected_pages,
    plan_regeneration, sync_manifest,
};

// =============================================================================
// AI Re-exports
// =============================================================================

pub use ai::{BackendSlot, CompletionBackend, PageRegenerator, with_timeout};
