//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (platform config dir) and project (.wikidelta/) level configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::analyzer::ScanFilter;
use crate::constants::{cache, retry, scan, workspace};
use crate::types::{Result, WikiError};
use crate::wiki::{ExportLayout, RetryPolicy};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Wiki cache location and language
    pub cache: CacheConfig,

    /// Repository scanning rules
    pub scan: ScanConfig,

    /// Export and watch settings
    pub workspace: WorkspaceConfig,

    /// Cache write-back retries
    pub retry: RetryConfig,
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `WikiError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if self.cache.language.trim().is_empty() {
            return Err(WikiError::Config(
                "cache.language must not be empty".to_string(),
            ));
        }

        if self.workspace.debounce_ms == 0 {
            return Err(WikiError::Config(
                "workspace.debounce_ms must be greater than 0".to_string(),
            ));
        }

        if self.retry.max_attempts == 0 {
            return Err(WikiError::Config(
                "retry.max_attempts must be greater than 0".to_string(),
            ));
        }

        if self.scan.max_file_size == 0 {
            return Err(WikiError::Config(
                "scan.max_file_size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Scanner filter built from the `scan` section
    pub fn scan_filter(&self) -> ScanFilter {
        ScanFilter {
            included_dirs: self.scan.included_dirs.clone(),
            excluded_dirs: self.scan.excluded_dirs.clone(),
            included_files: self.scan.included_files.clone(),
            excluded_files: self.scan.excluded_files.clone(),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
            ..RetryPolicy::default()
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.workspace.debounce_ms)
    }
}

// =============================================================================
// Cache Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache directory; the platform cache dir when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    /// Content language of generated pages
    pub language: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: None,
            language: cache::DEFAULT_LANGUAGE.to_string(),
        }
    }
}

// =============================================================================
// Scan Configuration
// =============================================================================

/// Inclusion lists switch the scanner to inclusion mode; exclusions
/// apply otherwise. See [`ScanFilter`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScanConfig {
    pub included_dirs: Vec<String>,
    pub excluded_dirs: Vec<String>,
    pub included_files: Vec<String>,
    pub excluded_files: Vec<String>,

    /// Maximum file size in bytes
    pub max_file_size: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        let defaults = ScanFilter::with_defaults();
        Self {
            included_dirs: defaults.included_dirs,
            excluded_dirs: defaults.excluded_dirs,
            included_files: defaults.included_files,
            excluded_files: defaults.excluded_files,
            max_file_size: scan::DEFAULT_MAX_FILE_SIZE,
        }
    }
}

// =============================================================================
// Workspace Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Default export layout
    pub layout: ExportLayout,

    /// Quiet period before a watch-triggered sync (milliseconds)
    pub debounce_ms: u64,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            layout: ExportLayout::default(),
            debounce_ms: workspace::DEFAULT_DEBOUNCE_MS,
        }
    }
}

// =============================================================================
// Retry Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per cache write, first one included
    pub max_attempts: usize,

    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: retry::DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: retry::BASE_DELAY_MS,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
