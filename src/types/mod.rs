pub mod error;
pub mod repo;
pub mod utils;

pub use error::{CorruptionKind, Result, ResultExt, WikiError};
pub use repo::{LOCAL_OWNER, RepoIdentity, RepoLocator, RepoType};
pub use utils::{
    crc32, log_filter_warn, normalize_repo_path, redact_secrets, relative_repo_path, sha256_hex,
    slugify, write_atomic,
};
