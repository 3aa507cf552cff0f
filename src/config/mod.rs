//! Configuration Management
//!
//! Hierarchical resolution:
//! 1. Built-in defaults
//! 2. Global config (platform config dir)
//! 3. Project config (.wikidelta/config.toml)
//! 4. Environment variables (WIKIDELTA_*)
//! 5. CLI arguments (highest priority)

mod loader;
mod types;

pub use loader::{ConfigLoader, ConfigPaths, RenderFormat};
pub use types::*;
