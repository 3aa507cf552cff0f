//! Editable Markdown Workspaces
//!
//! ```text
//! WikiCacheData ──export──▶ *.md + manifest
//!       ▲                        │ (hand edits)
//!       └──────────sync──────────┘
//! ```
//!
//! The cache stays authoritative. Sync only copies edited page bodies back;
//! it never deletes cache content.

pub mod export;
pub mod format;
pub mod manifest;
pub mod sync;
pub mod watch;

pub use export::export_markdown_workspace;
pub use manifest::{ExportFormat, ExportLayout, ExportManifest, ExportedPage, list_manifests};
pub use sync::{RetryPolicy, SyncSummary, sync_manifest, sync_manifest_with};
pub use watch::{WatchHandle, WorkspaceWatcher};
