//! Init Command
//!
//! Initialize wikidelta in a repository root.

use std::path::Path;

use crate::cli::ui::Output;
use crate::config::ConfigLoader;
use crate::types::{Result, WikiError};

pub fn run(root: &Path, force: bool) -> Result<()> {
    if ConfigLoader::is_project_initialized(root) && !force {
        return Err(WikiError::Config(
            "Already initialized. Use --force to overwrite.".to_string(),
        ));
    }

    let project_dir = ConfigLoader::init_project(root, force)?;

    // Global config is optional; never overwrite it from here
    if let Err(e) = ConfigLoader::init_global(false) {
        tracing::debug!("Global config init skipped: {}", e);
    }

    let out = Output::new();
    out.success(&format!("Initialized wikidelta in {}", project_dir.display()));
    println!();
    println!("Next steps:");
    println!("  wikidelta snapshot      record the current file fingerprints");
    println!("  wikidelta plan          see which wiki pages a change affects");
    Ok(())
}

