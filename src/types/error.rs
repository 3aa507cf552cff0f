//! Unified Error Type System
//!
//! Centralized error types for the entire application.
//!
//! ## Propagation Policy
//!
//! - **Self-healing**: corruption of the machine-owned wiki cache never
//!   leaves the cache store. It is quarantined and reported as "no cache".
//! - **Fatal for the run**: unreadable repository roots, snapshot identity
//!   mismatches (a programming error).
//! - **Fatal for a workspace**: corrupt manifests and vanished cache files.
//!   Both need the user to re-export; nothing retries them automatically.

use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::types::utils::redact_secrets;

// =============================================================================
// Corruption Classification
// =============================================================================

/// Why a persisted cache file could not be read back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorruptionKind {
    /// Well-formed JSON whose shape no longer matches the current types
    /// (unknown variant, missing field, wrong type)
    SchemaDrift,
    /// Syntactically broken or truncated content
    Truncated,
    /// Payload checksum does not match the stored one
    ChecksumMismatch,
}

impl CorruptionKind {
    /// Classify a serde_json failure
    pub fn from_json_error(err: &serde_json::Error) -> Self {
        use serde_json::error::Category;
        match err.classify() {
            Category::Data => Self::SchemaDrift,
            Category::Syntax | Category::Eof | Category::Io => Self::Truncated,
        }
    }
}

impl std::fmt::Display for CorruptionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SchemaDrift => write!(f, "SCHEMA_DRIFT"),
            Self::Truncated => write!(f, "TRUNCATED"),
            Self::ChecksumMismatch => write!(f, "CHECKSUM_MISMATCH"),
        }
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum WikiError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    // -------------------------------------------------------------------------
    // Change Detection Errors
    // -------------------------------------------------------------------------
    /// Repository root missing or unreadable
    #[error("Cannot scan repository at {path}: {reason}")]
    Scan { path: String, reason: String },

    /// Snapshots of two different repositories were compared
    #[error("Snapshot identity mismatch: baseline is '{baseline}', target is '{target}'")]
    IdentityMismatch { baseline: String, target: String },

    // -------------------------------------------------------------------------
    // Cache Errors
    // -------------------------------------------------------------------------
    /// Internal signal inside the cache store; converted to quarantine there
    #[error("Cache file {path} is corrupt ({kind}): {detail}")]
    CacheCorrupt {
        path: PathBuf,
        kind: CorruptionKind,
        detail: String,
    },

    /// A manifest points at a cache file that no longer exists
    #[error("Cache file referenced by manifest is missing: {path}")]
    CacheMissing { path: PathBuf },

    // -------------------------------------------------------------------------
    // Workspace Errors
    // -------------------------------------------------------------------------
    /// Manifest JSON could not be parsed
    #[error("Manifest {path} is corrupt: {reason}")]
    ManifestCorrupt { path: PathBuf, reason: String },

    #[error("Workspace error: {0}")]
    Workspace(String),

    // -------------------------------------------------------------------------
    // Regeneration Errors
    // -------------------------------------------------------------------------
    #[error("Completion backend error: {0}")]
    Completion(String),

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("Timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    // -------------------------------------------------------------------------
    // Domain Errors
    // -------------------------------------------------------------------------
    #[error("Config error: {0}")]
    Config(String),

    #[error("Not initialized: run 'wikidelta init' first")]
    NotInitialized,

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<anyhow::Error> for WikiError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(io_err) = err.downcast_ref::<std::io::Error>() {
            return WikiError::Io(std::io::Error::new(io_err.kind(), io_err.to_string()));
        }
        WikiError::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, WikiError>;

// =============================================================================
// Helper Functions
// =============================================================================

impl WikiError {
    /// Create a scan error, scrubbing credentials from the path text
    pub fn scan(path: impl AsRef<str>, reason: impl Into<String>) -> Self {
        Self::Scan {
            path: redact_secrets(path.as_ref()),
            reason: reason.into(),
        }
    }

    /// Create a manifest corruption error
    pub fn manifest_corrupt(path: &Path, reason: impl Into<String>) -> Self {
        Self::ManifestCorrupt {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Create a cache corruption signal
    pub fn cache_corrupt(path: &Path, kind: CorruptionKind, detail: impl Into<String>) -> Self {
        Self::CacheCorrupt {
            path: path.to_path_buf(),
            kind,
            detail: detail.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Whether retrying the same operation may succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Io(e) => !matches!(
                e.kind(),
                std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied
            ),
            Self::Timeout { .. } => true,
            Self::CacheCorrupt { .. } => true,
            _ => false,
        }
    }

    /// User-facing guidance for errors that need manual action
    pub fn remediation(&self) -> Option<&'static str> {
        match self {
            Self::ManifestCorrupt { .. } => Some(
                "The manifest is the only record linking edited files to cache entries. \
                 Re-run 'wikidelta export' into a fresh directory and copy your edits over.",
            ),
            Self::CacheMissing { .. } => {
                Some("The wiki cache was removed. Regenerate the wiki, then re-run 'wikidelta export'.")
            }
            Self::IdentityMismatch { .. } => {
                Some("Snapshots can only be compared for the same repository.")
            }
            Self::NotInitialized => Some("Run 'wikidelta init' in the repository root."),
            _ => None,
        }
    }
}

/// Context extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn with_context<C: Into<String>>(self, context: C) -> Result<T>;

    /// Add context using a closure (lazy evaluation)
    fn with_context_fn<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T, E: std::error::Error + Send + Sync + 'static> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<C: Into<String>>(self, context: C) -> Result<T> {
        self.map_err(|e| WikiError::Storage(format!("{}: {}", context.into(), e)))
    }

    fn with_context_fn<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.map_err(|e| WikiError::Storage(format!("{}: {}", f().into(), e)))
    }
}

// =============================================================================
// Tests
// =============================================================================
