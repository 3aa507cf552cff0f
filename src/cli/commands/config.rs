//! Config Command
//!
//! Usage:
//!   wikidelta config show [-g] [-f toml|yaml|json]
//!   wikidelta config path
//!   wikidelta config init [-g] [--force]

use std::path::Path;

use crate::cli::ui::Output;
use crate::config::{ConfigLoader, RenderFormat};
use crate::types::Result;

/// Show the merged configuration, or the raw global file with `global`
pub fn show(root: &Path, global: bool, format: RenderFormat) -> Result<()> {
    if global {
        match ConfigLoader::global_config_path() {
            Some(path) if path.exists() => {
                println!("# Global Config: {}\n", path.display());
                println!("{}", std::fs::read_to_string(&path)?);
            }
            Some(_) => {
                println!("No global config found.");
                println!("Run 'wikidelta config init --global' to create one.");
            }
            None => println!("Cannot determine global config directory."),
        }
        return Ok(());
    }

    let config = ConfigLoader::load(root)?;
    println!("{}", ConfigLoader::render(&config, format)?);
    Ok(())
}

pub fn path(root: &Path) -> Result<()> {
    let paths = ConfigLoader::paths(root);
    let mark = |p: &Path| if p.exists() { "✓" } else { "✗" };

    println!("Configuration paths:");
    println!();
    match &paths.global {
        Some(global) => println!("  Global:  {} {}", mark(global), global.display()),
        None => println!("  Global:  (not available)"),
    }
    println!("  Project: {} {}", mark(&paths.project), paths.project.display());
    if let Some(cache) = &paths.cache_dir {
        println!("  Cache:   {} {}", mark(cache), cache.display());
    }
    Ok(())
}

pub fn init(root: &Path, global: bool, force: bool) -> Result<()> {
    let out = Output::new();
    if global {
        let path = ConfigLoader::init_global(force)?;
        out.success("Initialized global configuration");
        out.field("Config", path.display());
    } else {
        let dir = ConfigLoader::init_project(root, force)?;
        out.success("Initialized project configuration");
        out.field("Directory", dir.display());
        out.field("Config", ConfigLoader::project_config_path(root).display());
    }
    Ok(())
}
