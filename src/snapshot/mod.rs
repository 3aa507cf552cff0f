//! Repository Snapshots
//!
//! ```text
//! Scanner → build_snapshot → RepoSnapshot ─┐
//!                                          ├→ detect_changes → ChangeSummary
//!            cached RepoSnapshot (or empty)┘
//! ```

pub mod builder;
pub mod diff;
pub mod model;

pub use builder::{build_snapshot, snapshot_source};
pub use diff::{detect_changes, detect_changes_from};
pub use model::{ChangeSummary, RepoSnapshot, RepoSnapshotFile};
