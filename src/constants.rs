//! Global Constants
//!
//! Centralized constants for persisted formats and tuning.
//! Anything that ends up in a filename or on disk is defined here.

/// Wiki cache store constants
pub mod cache {
    /// Current on-disk schema version of `WikiCacheData`.
    ///
    /// Bump on any incompatible change; older files are then ignored
    /// (not quarantined) because their filename carries the old version.
    pub const SCHEMA_VERSION: u32 = 2;

    /// Filename prefix for cache files
    pub const FILE_PREFIX: &str = "wikicache";

    /// Cache file extension
    pub const FILE_EXTENSION: &str = "json";

    /// Suffix appended to quarantined cache files
    pub const QUARANTINE_SUFFIX: &str = "invalid";

    /// Default content language
    pub const DEFAULT_LANGUAGE: &str = "en";
}

/// Workspace export/sync constants
pub mod workspace {
    /// Fixed manifest filename in an exported workspace root
    pub const MANIFEST_FILE: &str = "wikidelta-manifest.json";

    /// Output file for single-file layout
    pub const SINGLE_FILE_NAME: &str = "wiki.md";

    /// Opening page marker (single-file layout); `{id}` is replaced with the page id
    pub const PAGE_BEGIN_MARKER: &str = "<!-- wikidelta:page-begin id=\"{id}\" -->";

    /// Closing page marker (single-file layout)
    pub const PAGE_END_MARKER: &str = "<!-- wikidelta:page-end id=\"{id}\" -->";

    /// Default debounce window for watch mode (milliseconds)
    pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

    /// How often the watch loop wakes to check for cancellation (milliseconds)
    pub const WATCH_POLL_MS: u64 = 100;

    /// Maximum directory depth searched by manifest discovery
    pub const MANIFEST_SEARCH_DEPTH: usize = 6;
}

/// Repository scanning constants
pub mod scan {
    /// Default maximum file size included in a snapshot (1MB)
    pub const DEFAULT_MAX_FILE_SIZE: u64 = 1_048_576;

    /// Directories excluded unless explicitly included
    pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &[
        ".git",
        ".svn",
        ".hg",
        "node_modules",
        "target",
        "build",
        "dist",
        "__pycache__",
        "vendor",
        ".venv",
        "venv",
        ".idea",
        ".vscode",
        ".wikidelta",
    ];

    /// VCS and dependency directories skipped even in inclusion mode,
    /// unless an included dir rule names a path inside them
    pub const ALWAYS_EXCLUDED_DIRS: &[&str] = &[
        ".git",
        ".svn",
        ".hg",
        "node_modules",
        "__pycache__",
        ".venv",
        "venv",
        ".wikidelta",
    ];

    /// File patterns excluded unless explicitly included
    pub const DEFAULT_EXCLUDED_FILES: &[&str] = &[
        "*.lock",
        "package-lock.json",
        "*.min.js",
        "*.map",
        "*.pyc",
        "*.so",
        "*.dll",
        "*.exe",
        "*.png",
        "*.jpg",
        "*.jpeg",
        "*.gif",
        "*.ico",
        "*.pdf",
        "*.zip",
        "*.tar.gz",
        ".DS_Store",
    ];
}

/// Retry constants for write-back
pub mod retry {
    /// Attempts for a cache write during sync
    pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

    /// Base delay for exponential backoff (milliseconds)
    pub const BASE_DELAY_MS: u64 = 50;

    /// Maximum delay between attempts (milliseconds)
    pub const MAX_DELAY_MS: u64 = 2_000;
}

/// Project directory layout
pub mod project {
    /// Project data directory name
    pub const DIR: &str = ".wikidelta";

    /// Project config file name inside [`DIR`]
    pub const CONFIG_FILE: &str = "config.toml";

    /// Application name used for global directories
    pub const APP_NAME: &str = "wikidelta";

    /// Environment variable prefix for config overrides
    pub const ENV_PREFIX: &str = "WIKIDELTA_";
}

/// Page regeneration
pub mod regen {
    /// Retrieved documents per page prompt
    pub const DEFAULT_TOP_K: usize = 8;

    /// Per-page completion timeout (seconds)
    pub const PAGE_TIMEOUT_SECS: u64 = 300;

    /// Characters of each retrieved document included in a prompt
    pub const MAX_DOCUMENT_CHARS: usize = 6_000;
}
