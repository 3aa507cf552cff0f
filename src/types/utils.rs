//! Shared utility functions for hashing, path handling and log hygiene.

use regex::Regex;
use sha2::{Digest, Sha256};
use std::fmt::Display;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::sync::LazyLock;

// =============================================================================
// Hashing
// =============================================================================

/// SHA-256 hex digest of raw bytes.
///
/// Used for every content fingerprint in the crate (snapshot files,
/// exported workspace files), so digests are comparable across both.
pub fn sha256_hex(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}

/// CRC32 of a byte payload, used as an integrity check on persisted caches
pub fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

// =============================================================================
// Paths
// =============================================================================

/// Normalize a repository-relative path to forward slashes without a
/// leading `./` or `/`.
pub fn normalize_repo_path(path: &str) -> String {
    let unified = path.replace('\\', "/");
    let mut trimmed = unified.as_str();
    loop {
        if let Some(rest) = trimmed.strip_prefix("./") {
            trimmed = rest;
        } else if let Some(rest) = trimmed.strip_prefix('/') {
            trimmed = rest;
        } else {
            break;
        }
    }
    let mut out = String::with_capacity(trimmed.len());
    for segment in trimmed.split('/').filter(|s| !s.is_empty() && *s != ".") {
        if !out.is_empty() {
            out.push('/');
        }
        out.push_str(segment);
    }
    out
}

/// Repository-relative, normalized form of `path` under `root`
pub fn relative_repo_path(root: &Path, path: &Path) -> Option<String> {
    path.strip_prefix(root)
        .ok()
        .map(|p| normalize_repo_path(&p.to_string_lossy()))
}

/// Replace `path` with `bytes` so readers see either the old or the new
/// file, never a partial one. The temp file lives next to the target so the
/// final rename stays on one filesystem.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = dir.join(format!(".{}.{}.tmp", name, uuid::Uuid::new_v4().simple()));

    let result = (|| {
        let mut file = File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

/// Turn a page id or title into a filesystem-safe slug
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut last_dash = true;
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        "page".to_string()
    } else {
        slug
    }
}

// =============================================================================
// Log Hygiene
// =============================================================================

static URL_USERINFO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?P<scheme>[a-z][a-z0-9+.-]*://)[^/@\s]+@").expect("valid userinfo regex")
});

static TOKEN_PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?P<key>(?:access_)?token|private_token|api_key)=[^&\s]+")
        .expect("valid token regex")
});

/// Strip credentials from text before it reaches logs or error messages.
///
/// Removes URL userinfo (`https://TOKEN@host/...`) and token query
/// parameters (`?access_token=...`).
pub fn redact_secrets(text: &str) -> String {
    let without_userinfo = URL_USERINFO.replace_all(text, "$scheme");
    TOKEN_PARAM
        .replace_all(&without_userinfo, "$key=***")
        .into_owned()
}

/// Filter an iterator of Results, logging errors at warn level before discarding.
pub fn log_filter_warn<T, E: Display>(result: Result<T, E>, context: &str) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!("{}: {}", context, redact_secrets(&e.to_string()));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_atomic_replaces_and_cleans_up() {
        let dir = tempfile::TempDir::new().unwrap();
        let target = dir.path().join("nested").join("out.json");
        write_atomic(&target, b"one").unwrap();
        write_atomic(&target, b"two").unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"two");
        assert_eq!(fs::read_dir(target.parent().unwrap()).unwrap().count(), 1);
    }

    #[test]
    fn test_sha256_known_value() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(sha256_hex(b"hello").len(), 64);
    }

    #[test]
    fn test_normalize_repo_path() {
        assert_eq!(normalize_repo_path("./src/lib.rs"), "src/lib.rs");
        assert_eq!(normalize_repo_path("src\\win\\file.rs"), "src/win/file.rs");
        assert_eq!(normalize_repo_path("/a//b/./c.py"), "a/b/c.py");
        assert_eq!(normalize_repo_path("a.py"), "a.py");
    }

    #[test]
    fn test_relative_repo_path() {
        let root = Path::new("/repo");
        assert_eq!(
            relative_repo_path(root, Path::new("/repo/src/main.rs")),
            Some("src/main.rs".to_string())
        );
        assert_eq!(relative_repo_path(root, Path::new("/other/x")), None);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Getting Started!"), "getting-started");
        assert_eq!(slugify("page-1"), "page-1");
        assert_eq!(slugify("   "), "page");
    }

    #[test]
    fn test_redact_userinfo() {
        let text = "clone failed for https://ghp_abc123@github.com/owner/repo.git";
        let redacted = redact_secrets(text);
        assert_eq!(
            redacted,
            "clone failed for https://github.com/owner/repo.git"
        );
    }

    #[test]
    fn test_redact_token_param() {
        let text = "GET https://gitlab.com/api?private_token=xyz&ref=main";
        assert_eq!(
            redact_secrets(text),
            "GET https://gitlab.com/api?private_token=***&ref=main"
        );
    }
}
