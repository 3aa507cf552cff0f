//! Wiki Cache Consistency
//!
//! ```text
//! RepoSnapshot ─┐
//!               ├→ plan_regeneration → UpToDate | Full | Incremental{affected}
//! cached data ──┘                                          │
//!                                        PageRegenerator ◀─┘
//!                                               │
//!                         apply_regenerated → WikiCacheStore::save
//!                                               │
//!                         export ⇄ sync (editable workspace)
//! ```

pub mod cache;
pub mod impact;
pub mod types;
pub mod workspace;

pub use cache::{CacheDescriptor, CacheStats, WikiCacheStore, cache_file_name, parse_cache_file_name};
pub use impact::{FullRegenerationReason, RegenerationPlan, find_affected_pages, plan_regeneration};
pub use types::{Importance, StructureIndex, WikiCacheData, WikiPage, WikiSection, WikiStructureModel};
pub use workspace::{
    ExportLayout, ExportManifest, ExportedPage, RetryPolicy, SyncSummary, WatchHandle,
    WorkspaceWatcher, export_markdown_workspace, list_manifests, sync_manifest, sync_manifest_with,
};
