//! CLI Common Utilities
//!
//! Shared initialization and context management for CLI commands.

use secrecy::SecretString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::analyzer::RepoScanner;
use crate::config::{Config, ConfigLoader};
use crate::snapshot::{RepoSnapshot, snapshot_source};
use crate::types::{RepoIdentity, RepoLocator, Result, ResultExt, WikiError, write_atomic};
use crate::wiki::WikiCacheStore;

/// Command execution context
///
/// Resolved once per invocation: merged configuration and the cache store
/// it points at.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub config: Config,
    pub store: WikiCacheStore,
}

impl CommandContext {
    /// Load config for `root` and open the configured cache store
    pub fn load(root: &Path) -> Result<Self> {
        let config = ConfigLoader::load(root)?;
        let cache_dir = ConfigLoader::cache_dir(&config)?;
        Ok(Self {
            store: WikiCacheStore::new(cache_dir),
            config,
        })
    }

    /// Language from the command line, else the configured one
    pub fn language<'a>(&'a self, flag: Option<&'a str>) -> &'a str {
        flag.unwrap_or(&self.config.cache.language)
    }

    /// Snapshot a local checkout with the configured scan rules
    pub fn scan(&self, root: &Path) -> Result<RepoSnapshot> {
        let identity = RepoIdentity::from_local_path(root)?;
        let scanner = RepoScanner::new(root)
            .with_filter(self.config.scan_filter())
            .with_max_file_size(self.config.scan.max_file_size);
        snapshot_source(identity, &scanner)
    }
}

/// Resolve a `--repo` argument; the token only applies to remote URLs
pub fn resolve_repo(input: &str, token: Option<String>) -> Result<RepoIdentity> {
    let token = token.filter(|t| !t.is_empty()).map(SecretString::from);
    RepoLocator::parse(input, token)?.identity()
}

/// Local directory of a `--repo` argument; remote repositories are not scanned
pub fn require_local(input: &str) -> Result<PathBuf> {
    match RepoLocator::parse(input, None)? {
        RepoLocator::Local(path) => Ok(path),
        remote @ RepoLocator::Remote { .. } => Err(WikiError::scan(
            remote.display(),
            "only local checkouts can be scanned",
        )),
    }
}

pub fn read_snapshot(path: &Path) -> Result<RepoSnapshot> {
    let bytes = fs::read(path).with_context_fn(|| format!("Cannot read snapshot {}", path.display()))?;
    serde_json::from_slice(&bytes)
        .with_context_fn(|| format!("Snapshot {} is not valid", path.display()))
}

pub fn write_snapshot(path: &Path, snapshot: &RepoSnapshot) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(snapshot)?;
    write_atomic(path, &bytes)?;
    Ok(())
}

/// Accept either a manifest file or the workspace directory holding it
pub fn manifest_path(target: &Path) -> PathBuf {
    if target.is_dir() {
        crate::wiki::ExportManifest::path_in(target)
    } else {
        target.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::workspace::MANIFEST_FILE;
    use tempfile::TempDir;

    #[test]
    fn test_require_local_rejects_urls() {
        assert!(require_local("https://github.com/acme/platform").is_err());
        assert_eq!(require_local("some/dir").unwrap(), PathBuf::from("some/dir"));
    }

    #[test]
    fn test_manifest_path_accepts_dir_or_file() {
        let temp = TempDir::new().unwrap();
        assert_eq!(manifest_path(temp.path()), temp.path().join(MANIFEST_FILE));
        let file = temp.path().join("custom.json");
        assert_eq!(manifest_path(&file), file);
    }

    #[test]
    fn test_snapshot_file_round_trip() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.rs"), "fn a() {}").unwrap();
        let ctx = CommandContext {
            config: Config::default(),
            store: WikiCacheStore::new(temp.path().join("cache")),
        };

        let snapshot = ctx.scan(temp.path()).unwrap();
        assert!(snapshot.contains("a.rs"));

        let out = temp.path().join("out/snapshot.json");
        write_snapshot(&out, &snapshot).unwrap();
        assert_eq!(read_snapshot(&out).unwrap(), snapshot);

        fs::write(&out, "{").unwrap();
        let err = read_snapshot(&out).unwrap_err();
        assert!(err.to_string().contains("is not valid"));
    }
}
