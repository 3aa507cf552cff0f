//! Repository identity
//!
//! Identity is what keys caches, snapshots and manifests. It never carries
//! credentials: tokens live in [`RepoLocator`] behind `SecretString`.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

use crate::types::utils::{redact_secrets, sha256_hex};
use crate::types::{Result, WikiError};

/// Where a repository lives
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum RepoType {
    Github,
    Gitlab,
    Bitbucket,
    Local,
}

impl RepoType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepoType::Github => "github",
            RepoType::Gitlab => "gitlab",
            RepoType::Bitbucket => "bitbucket",
            RepoType::Local => "local",
        }
    }

    pub fn is_remote(&self) -> bool {
        !matches!(self, RepoType::Local)
    }

    /// Guess the hosting type from a URL host
    pub fn from_host(host: &str) -> Self {
        let host = host.to_lowercase();
        if host.contains("gitlab") {
            RepoType::Gitlab
        } else if host.contains("bitbucket") {
            RepoType::Bitbucket
        } else {
            RepoType::Github
        }
    }
}

impl fmt::Display for RepoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RepoType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "github" => Ok(RepoType::Github),
            "gitlab" => Ok(RepoType::Gitlab),
            "bitbucket" => Ok(RepoType::Bitbucket),
            "local" => Ok(RepoType::Local),
            _ => Err(format!(
                "Unknown repo type: {}. Valid values: github, gitlab, bitbucket, local",
                s
            )),
        }
    }
}

/// Marker used as `owner` for local repositories
pub const LOCAL_OWNER: &str = "local";

/// Stable key of a repository: `(owner, repo, repo_type)`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepoIdentity {
    pub owner: String,
    pub repo: String,
    pub repo_type: RepoType,
}

impl RepoIdentity {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, repo_type: RepoType) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            repo_type,
        }
    }

    /// Identity of a local directory.
    ///
    /// The repo name carries a short digest of the canonical path so two
    /// checkouts with the same directory name never share a cache.
    pub fn from_local_path(path: &Path) -> Result<Self> {
        let canonical = path.canonicalize().map_err(|e| {
            WikiError::scan(path.to_string_lossy(), format!("cannot resolve path: {}", e))
        })?;
        let name = canonical
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("root");
        let digest = sha256_hex(canonical.to_string_lossy().as_bytes());
        Ok(Self::new(
            LOCAL_OWNER,
            format!("{}-{}", name, &digest[..8]),
            RepoType::Local,
        ))
    }

    /// Identity of a remote repository URL (`https://host/owner/repo(.git)`).
    ///
    /// Nested groups (GitLab) keep every segment except the last as owner.
    pub fn from_url(url: &Url) -> Result<Self> {
        let host = url
            .host_str()
            .ok_or_else(|| WikiError::scan(url.as_str(), "URL has no host"))?;
        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();
        if segments.len() < 2 {
            return Err(WikiError::scan(
                url.as_str(),
                "expected a URL of the form https://host/owner/repo",
            ));
        }
        let (repo, owner) = segments.split_last().map(|(r, o)| (*r, o.join("/"))).unwrap_or_default();
        let repo = repo.strip_suffix(".git").unwrap_or(repo);
        Ok(Self::new(owner, repo, RepoType::from_host(host)))
    }

    /// `owner/repo` label for display and error text
    pub fn label(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

impl fmt::Display for RepoIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.repo_type, self.owner, self.repo)
    }
}

/// A repository reference as given by the user, with its credentials
/// kept out of every derived string.
pub enum RepoLocator {
    Local(PathBuf),
    Remote {
        url: Url,
        token: Option<SecretString>,
    },
}

impl RepoLocator {
    /// Parse `https://...` URLs as remote, anything else as a local path.
    ///
    /// Userinfo in the URL is moved into the token slot.
    pub fn parse(input: &str, token: Option<SecretString>) -> Result<Self> {
        if input.starts_with("http://") || input.starts_with("https://") {
            let mut url = Url::parse(input)
                .map_err(|e| WikiError::scan(input, format!("invalid URL: {}", e)))?;
            let embedded = if url.username().is_empty() {
                None
            } else {
                Some(SecretString::from(url.username().to_string()))
            };
            // Setting credentials only fails for cannot-be-a-base URLs, which have no userinfo
            let _ = url.set_username("");
            let _ = url.set_password(None);
            Ok(Self::Remote {
                url,
                token: token.or(embedded),
            })
        } else {
            Ok(Self::Local(PathBuf::from(input)))
        }
    }

    pub fn identity(&self) -> Result<RepoIdentity> {
        match self {
            Self::Local(path) => RepoIdentity::from_local_path(path),
            Self::Remote { url, .. } => RepoIdentity::from_url(url),
        }
    }

    /// Display form safe for logs
    pub fn display(&self) -> String {
        match self {
            Self::Local(path) => path.display().to_string(),
            Self::Remote { url, .. } => redact_secrets(url.as_str()),
        }
    }

    /// Whether an access token is configured
    pub fn has_token(&self) -> bool {
        matches!(self, Self::Remote { token: Some(t), .. } if !t.expose_secret().is_empty())
    }
}

impl fmt::Debug for RepoLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => f.debug_tuple("Local").field(path).finish(),
            Self::Remote { url, token } => f
                .debug_struct("Remote")
                .field("url", &redact_secrets(url.as_str()))
                .field("token", &token.as_ref().map(|_| "***"))
                .finish(),
        }
    }
}
