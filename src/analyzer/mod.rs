//! Repository Analyzer Module
//!
//! Produces the ordered, filtered file listing that snapshots are built from:
//! - gitignore-aware walking of local checkouts
//! - directory/file inclusion and exclusion rules

pub mod scanner;

pub use scanner::{FileSource, RepoScanner, ScanFilter, ScannedFile};
