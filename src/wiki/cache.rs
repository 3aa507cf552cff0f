//! Wiki Cache Store
//!
//! One JSON file per `(repo, language, schema version)` under a cache
//! directory. Identity is encoded in the file name so listing never opens a
//! file:
//!
//! ```text
//! wikicache_v{version}_{repo_type}_{owner}_{repo}_{language}.json
//! ```
//!
//! Each component is percent-escaped, so `_` only ever appears as the
//! separator.
//!
//! ## On-disk format
//!
//! ```json
//! { "checksum": 1234567890, "data": { "version": 2, ... } }
//! ```
//!
//! `checksum` is the CRC32 of the compact serialization of `data`.
//!
//! ## Failure policy
//!
//! A file that cannot be read back (schema drift, truncation, checksum
//! mismatch) is renamed to `<name>.invalid` and reported as "no cache".
//! A file written by another schema version is left alone and also reported
//! as "no cache".

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::types::WikiCacheData;
use crate::constants::cache::{FILE_EXTENSION, FILE_PREFIX, QUARANTINE_SUFFIX, SCHEMA_VERSION};
use crate::types::{
    CorruptionKind, RepoIdentity, RepoType, Result, WikiError, crc32, redact_secrets, write_atomic,
};

// =============================================================================
// File Name Encoding
// =============================================================================

fn escape_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for b in raw.bytes() {
        if b.is_ascii_alphanumeric() || b == b'-' || b == b'.' {
            out.push(b as char);
        } else {
            let _ = write!(out, "%{:02X}", b);
        }
    }
    out
}

fn unescape_component(encoded: &str) -> Option<String> {
    let bytes = encoded.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = encoded.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

/// File name for a cache entry
pub fn cache_file_name(repo: &RepoIdentity, language: &str, version: u32) -> String {
    format!(
        "{}_v{}_{}_{}_{}_{}.{}",
        FILE_PREFIX,
        version,
        escape_component(repo.repo_type.as_str()),
        escape_component(&repo.owner),
        escape_component(&repo.repo),
        escape_component(language),
        FILE_EXTENSION
    )
}

/// Decode `(repo, language, version)` from a cache file name.
///
/// Returns `None` for anything that is not a cache file, including
/// quarantined files.
pub fn parse_cache_file_name(name: &str) -> Option<(RepoIdentity, String, u32)> {
    let stem = name
        .strip_prefix(FILE_PREFIX)?
        .strip_prefix('_')?
        .strip_suffix(FILE_EXTENSION)?
        .strip_suffix('.')?;

    let parts: Vec<&str> = stem.split('_').collect();
    let [version, repo_type, owner, repo, language] = parts.as_slice() else {
        return None;
    };

    let version = version.strip_prefix('v')?.parse().ok()?;
    let repo_type: RepoType = unescape_component(repo_type)?.parse().ok()?;
    let identity = RepoIdentity::new(
        unescape_component(owner)?,
        unescape_component(repo)?,
        repo_type,
    );
    Some((identity, unescape_component(language)?, version))
}

fn is_quarantined(name: &str) -> bool {
    let marker = format!(".{}", QUARANTINE_SUFFIX);
    name.starts_with(FILE_PREFIX) && (name.ends_with(&marker) || name.contains(&format!("{}.", marker)))
}

// =============================================================================
// Envelope
// =============================================================================

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    checksum: u32,
    data: &'a WikiCacheData,
}

#[derive(Deserialize)]
struct Envelope {
    checksum: u32,
    data: WikiCacheData,
}

#[derive(Deserialize)]
struct VersionProbe {
    data: VersionField,
}

#[derive(Deserialize)]
struct VersionField {
    version: u32,
}

fn payload_checksum(data: &WikiCacheData) -> Result<u32> {
    Ok(crc32(&serde_json::to_vec(data)?))
}

enum Decoded {
    Current(WikiCacheData),
    OtherVersion(u32),
}

fn decode(path: &Path, bytes: &[u8]) -> Result<Decoded> {
    let corrupt = |err: serde_json::Error| {
        WikiError::cache_corrupt(path, CorruptionKind::from_json_error(&err), err.to_string())
    };

    let probe: VersionProbe = serde_json::from_slice(bytes).map_err(corrupt)?;
    if probe.data.version != SCHEMA_VERSION {
        return Ok(Decoded::OtherVersion(probe.data.version));
    }

    let envelope: Envelope = serde_json::from_slice(bytes).map_err(corrupt)?;
    let actual = payload_checksum(&envelope.data)?;
    if actual != envelope.checksum {
        return Err(WikiError::cache_corrupt(
            path,
            CorruptionKind::ChecksumMismatch,
            format!("stored {:08x}, computed {:08x}", envelope.checksum, actual),
        ));
    }
    Ok(Decoded::Current(envelope.data))
}

/// Rename a bad cache file out of the way, keeping it for inspection
fn quarantine(path: &Path) -> Result<PathBuf> {
    let base = format!("{}.{}", path.display(), QUARANTINE_SUFFIX);
    let mut target = PathBuf::from(&base);
    let mut n = 1;
    while target.exists() {
        target = PathBuf::from(format!("{}.{}", base, n));
        n += 1;
    }
    fs::rename(path, &target)?;
    Ok(target)
}

/// Quarantine a corrupt file. A failed rename is logged and the file stays
/// where it is; the caller treats it as missing either way.
fn set_aside_corrupt(path: &Path, kind: CorruptionKind, detail: &str) -> Option<PathBuf> {
    match quarantine(path) {
        Ok(moved) => {
            warn!(
                "Quarantined corrupt cache {} -> {} [{}]: {}",
                path.display(),
                moved.display(),
                kind,
                redact_secrets(detail)
            );
            Some(moved)
        }
        Err(e) => {
            error!(
                "Corrupt cache {} [{}] could not be quarantined ({}): {}",
                path.display(),
                kind,
                e,
                redact_secrets(detail)
            );
            None
        }
    }
}

/// Read a cache file.
///
/// `Ok(None)` when the file is absent, was written by another schema
/// version, or was corrupt (in which case it has been quarantined).
pub fn read_cache_file(path: &Path) -> Result<Option<WikiCacheData>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    match decode(path, &bytes) {
        Ok(Decoded::Current(data)) => {
            debug!(
                "Loaded cache {} ({} pages)",
                path.display(),
                data.generated_pages.len()
            );
            Ok(Some(data))
        }
        Ok(Decoded::OtherVersion(version)) => {
            info!(
                "Ignoring cache {}: schema v{} (current v{})",
                path.display(),
                version,
                SCHEMA_VERSION
            );
            Ok(None)
        }
        Err(WikiError::CacheCorrupt { path, kind, detail }) => {
            set_aside_corrupt(&path, kind, &detail);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Atomically write a cache file
pub fn write_cache_file(path: &Path, data: &WikiCacheData) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(&EnvelopeRef {
        checksum: payload_checksum(data)?,
        data,
    })?;
    write_atomic(path, &bytes)?;
    Ok(())
}

// =============================================================================
// Store
// =============================================================================

/// Cache entry as seen from its file name and metadata only
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheDescriptor {
    pub path: PathBuf,
    pub repo: RepoIdentity,
    pub language: String,
    pub version: u32,
    pub size_bytes: u64,
    pub modified: Option<DateTime<Utc>>,
}

impl CacheDescriptor {
    /// Whether the current build can read this entry
    pub fn is_current(&self) -> bool {
        self.version == SCHEMA_VERSION
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    pub entry_count: usize,
    pub stale_version_count: usize,
    pub quarantined_count: usize,
    pub total_size_bytes: u64,
    pub oldest_entry: Option<DateTime<Utc>>,
    pub newest_entry: Option<DateTime<Utc>>,
}

/// Wiki cache manager
#[derive(Debug, Clone)]
pub struct WikiCacheStore {
    cache_dir: PathBuf,
}

impl WikiCacheStore {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Path of the current-schema cache file for `(repo, language)`
    pub fn cache_path(&self, repo: &RepoIdentity, language: &str) -> PathBuf {
        self.cache_dir
            .join(cache_file_name(repo, language, SCHEMA_VERSION))
    }

    /// Load the cache for `(repo, language)`.
    ///
    /// Never fails on bad content: incompatible, corrupt and foreign files
    /// all come back as `Ok(None)`.
    pub fn load(&self, repo: &RepoIdentity, language: &str) -> Result<Option<WikiCacheData>> {
        let path = self.cache_path(repo, language);
        let Some(data) = read_cache_file(&path)? else {
            return Ok(None);
        };

        if &data.repo != repo || data.language != language {
            warn!(
                "Cache {} holds {} ({}), expected {} ({}); ignoring",
                path.display(),
                data.repo,
                data.language,
                repo,
                language
            );
            return Ok(None);
        }
        Ok(Some(data))
    }

    /// Overwrite the cache entry for `data`'s identity
    pub fn save(&self, data: &WikiCacheData) -> Result<PathBuf> {
        let path = self
            .cache_dir
            .join(cache_file_name(&data.repo, &data.language, data.version));
        write_cache_file(&path, data)?;
        info!(
            "Saved cache {} ({} pages)",
            path.display(),
            data.generated_pages.len()
        );
        Ok(path)
    }

    /// Remove the current-schema entry for `(repo, language)`
    pub fn delete(&self, repo: &RepoIdentity, language: &str) -> Result<bool> {
        let path = self.cache_path(repo, language);
        match fs::remove_file(&path) {
            Ok(()) => {
                info!("Deleted cache {}", path.display());
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn entries(&self) -> Result<Vec<fs::DirEntry>> {
        match fs::read_dir(&self.cache_dir) {
            Ok(rd) => Ok(rd.filter_map(|e| e.ok()).collect()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Enumerate cache files, newest first, without reading their content
    pub fn list_all(&self) -> Result<Vec<CacheDescriptor>> {
        let mut out = Vec::new();
        for entry in self.entries()? {
            let name = entry.file_name().to_string_lossy().into_owned();
            let Some((repo, language, version)) = parse_cache_file_name(&name) else {
                continue;
            };
            let metadata = entry.metadata().ok();
            out.push(CacheDescriptor {
                path: entry.path(),
                repo,
                language,
                version,
                size_bytes: metadata.as_ref().map(|m| m.len()).unwrap_or(0),
                modified: metadata
                    .and_then(|m| m.modified().ok())
                    .map(DateTime::<Utc>::from),
            });
        }
        out.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.path.cmp(&b.path)));
        Ok(out)
    }

    /// Quarantined files left behind by earlier loads
    pub fn quarantined(&self) -> Result<Vec<PathBuf>> {
        let mut out: Vec<PathBuf> = self
            .entries()?
            .into_iter()
            .filter(|e| is_quarantined(&e.file_name().to_string_lossy()))
            .map(|e| e.path())
            .collect();
        out.sort();
        Ok(out)
    }

    /// Delete quarantined files; returns how many were removed
    pub fn purge_quarantined(&self) -> Result<usize> {
        let files = self.quarantined()?;
        for path in &files {
            fs::remove_file(path)?;
        }
        if !files.is_empty() {
            info!("Purged {} quarantined cache files", files.len());
        }
        Ok(files.len())
    }

    /// Delete entries written by other schema versions
    pub fn purge_stale_versions(&self) -> Result<usize> {
        let mut count = 0;
        for descriptor in self.list_all()?.into_iter().filter(|d| !d.is_current()) {
            fs::remove_file(&descriptor.path)?;
            count += 1;
        }
        Ok(count)
    }

    /// Delete every cache file, quarantined ones included
    pub fn clear_all(&self) -> Result<usize> {
        let mut count = self.purge_quarantined()?;
        for descriptor in self.list_all()? {
            fs::remove_file(&descriptor.path)?;
            count += 1;
        }
        info!("Cleared {} cache files", count);
        Ok(count)
    }

    pub fn stats(&self) -> Result<CacheStats> {
        let entries = self.list_all()?;
        Ok(CacheStats {
            entry_count: entries.len(),
            stale_version_count: entries.iter().filter(|e| !e.is_current()).count(),
            quarantined_count: self.quarantined()?.len(),
            total_size_bytes: entries.iter().map(|e| e.size_bytes).sum(),
            oldest_entry: entries.iter().filter_map(|e| e.modified).min(),
            newest_entry: entries.iter().filter_map(|e| e.modified).max(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::RepoSnapshot;
    use crate::wiki::types::{WikiPage, WikiStructureModel};
    use tempfile::TempDir;

    fn repo() -> RepoIdentity {
        RepoIdentity::new("acme_corp/platform", "api_server", RepoType::Gitlab)
    }

    fn sample() -> WikiCacheData {
        let mut structure = WikiStructureModel::new("wiki", "API");
        structure.pages = vec![WikiPage::new("overview", "Overview").with_files(["src/main.rs"])];
        let mut data = WikiCacheData::new(repo(), "en", structure)
            .with_snapshot(RepoSnapshot::empty(repo()));
        data.upsert_page(
            WikiPage::new("overview", "Overview")
                .with_files(["src/main.rs"])
                .with_content("# Overview\n\nHello"),
        );
        data
    }

    #[test]
    fn test_file_name_round_trip() {
        let name = cache_file_name(&repo(), "zh_CN", 2);
        assert!(name.starts_with("wikicache_v2_gitlab_"));
        assert_eq!(name.matches('_').count(), 5);

        let (identity, language, version) = parse_cache_file_name(&name).unwrap();
        assert_eq!(identity, repo());
        assert_eq!(language, "zh_CN");
        assert_eq!(version, 2);
    }

    #[test]
    fn test_parse_rejects_foreign_names() {
        assert!(parse_cache_file_name("notes.json").is_none());
        assert!(parse_cache_file_name("wikicache_v2_github_o_r.json").is_none());
        assert!(parse_cache_file_name("wikicache_v2_github_o_r_en.json.invalid").is_none());
        assert!(parse_cache_file_name("wikicache_v2_svn_o_r_en.json").is_none());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let store = WikiCacheStore::new(dir.path());
        let data = sample();

        let path = store.save(&data).unwrap();
        assert_eq!(path, store.cache_path(&repo(), "en"));

        let loaded = store.load(&repo(), "en").unwrap().unwrap();
        assert_eq!(loaded, data);
        assert!(store.load(&repo(), "fr").unwrap().is_none());
    }

    #[test]
    fn test_save_overwrites_and_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let store = WikiCacheStore::new(dir.path());
        let mut data = sample();
        store.save(&data).unwrap();
        data.upsert_page(WikiPage::new("extra", "Extra").with_content("x"));
        store.save(&data).unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert_eq!(store.load(&repo(), "en").unwrap().unwrap().generated_pages.len(), 2);
    }

    #[test]
    fn test_schema_drift_is_quarantined() {
        let dir = TempDir::new().unwrap();
        let store = WikiCacheStore::new(dir.path());
        let path = store.cache_path(&repo(), "en");
        fs::write(
            &path,
            r#"{"checksum":0,"data":{"version":2,"structure":{"kind":"RemovedModule"}}}"#,
        )
        .unwrap();

        assert!(store.load(&repo(), "en").unwrap().is_none());
        assert!(!path.exists());
        assert_eq!(store.quarantined().unwrap().len(), 1);
        assert!(PathBuf::from(format!("{}.invalid", path.display())).exists());
    }

    #[test]
    fn test_truncated_file_is_quarantined() {
        let dir = TempDir::new().unwrap();
        let store = WikiCacheStore::new(dir.path());
        let path = store.save(&sample()).unwrap();
        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();

        assert!(store.load(&repo(), "en").unwrap().is_none());
        assert!(!path.exists());
        assert_eq!(store.stats().unwrap().quarantined_count, 1);
    }

    #[test]
    fn test_checksum_mismatch_is_quarantined() {
        let dir = TempDir::new().unwrap();
        let store = WikiCacheStore::new(dir.path());
        let path = store.save(&sample()).unwrap();
        let tampered = fs::read_to_string(&path).unwrap().replace("Hello", "Howdy");
        fs::write(&path, tampered).unwrap();

        assert!(store.load(&repo(), "en").unwrap().is_none());
        assert!(!path.exists());
    }

    #[test]
    fn test_repeated_quarantine_keeps_every_file() {
        let dir = TempDir::new().unwrap();
        let store = WikiCacheStore::new(dir.path());
        let path = store.cache_path(&repo(), "en");
        for _ in 0..2 {
            fs::write(&path, "{").unwrap();
            assert!(store.load(&repo(), "en").unwrap().is_none());
        }
        assert_eq!(store.quarantined().unwrap().len(), 2);
        assert_eq!(store.purge_quarantined().unwrap(), 2);
    }

    #[test]
    fn test_failed_quarantine_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        let gone = dir.path().join("wikicache_v2_github_o_r_en.json");
        assert_eq!(
            set_aside_corrupt(&gone, CorruptionKind::Truncated, "token=abc123"),
            None
        );

        fs::write(&gone, "{").unwrap();
        let moved = set_aside_corrupt(&gone, CorruptionKind::Truncated, "eof").unwrap();
        assert!(moved.exists());
        assert!(!gone.exists());
    }

    #[test]
    fn test_other_version_is_ignored_not_quarantined() {
        let dir = TempDir::new().unwrap();
        let store = WikiCacheStore::new(dir.path());
        let path = store.cache_path(&repo(), "en");
        fs::write(&path, r#"{"checksum":0,"data":{"version":1,"pages":[]}}"#).unwrap();

        assert!(store.load(&repo(), "en").unwrap().is_none());
        assert!(path.exists());
        assert!(store.quarantined().unwrap().is_empty());
    }

    #[test]
    fn test_list_stats_and_delete() {
        let dir = TempDir::new().unwrap();
        let store = WikiCacheStore::new(dir.path());
        assert!(store.list_all().unwrap().is_empty());

        store.save(&sample()).unwrap();
        let mut old = sample();
        old.version = 1;
        store.save(&old).unwrap();
        fs::write(dir.path().join("unrelated.txt"), "x").unwrap();

        let listed = store.list_all().unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|d| d.repo == repo() && d.language == "en"));

        let stats = store.stats().unwrap();
        assert_eq!(stats.entry_count, 2);
        assert_eq!(stats.stale_version_count, 1);
        assert!(stats.total_size_bytes > 0);

        assert_eq!(store.purge_stale_versions().unwrap(), 1);
        assert!(store.delete(&repo(), "en").unwrap());
        assert!(!store.delete(&repo(), "en").unwrap());
        assert!(store.list_all().unwrap().is_empty());
    }

    #[test]
    fn test_missing_cache_dir_is_empty() {
        let store = WikiCacheStore::new("/no/such/cache/dir");
        assert!(store.list_all().unwrap().is_empty());
        assert!(store.load(&repo(), "en").unwrap().is_none());
    }
}
