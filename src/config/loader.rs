//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (`<platform config dir>/wikidelta/config.toml`)
//! 3. Project config (`<repo>/.wikidelta/config.toml`)
//! 4. Environment variables (`WIKIDELTA_` prefix, `__` separates sections:
//!    `WIKIDELTA_WORKSPACE__DEBOUNCE_MS=200`)

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{debug, info};

use super::types::Config;
use crate::constants::project::{APP_NAME, CONFIG_FILE, DIR, ENV_PREFIX};
use crate::types::{Result, WikiError, write_atomic};

/// Output format for `config show`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderFormat {
    #[default]
    Toml,
    Yaml,
    Json,
}

impl FromStr for RenderFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "toml" | "text" => Ok(RenderFormat::Toml),
            "yaml" | "yml" => Ok(RenderFormat::Yaml),
            "json" => Ok(RenderFormat::Json),
            _ => Err(format!("Unknown format: {}. Valid values: toml, yaml, json", s)),
        }
    }
}

impl fmt::Display for RenderFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderFormat::Toml => write!(f, "toml"),
            RenderFormat::Yaml => write!(f, "yaml"),
            RenderFormat::Json => write!(f, "json"),
        }
    }
}

/// Resolved configuration locations
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub global: Option<PathBuf>,
    pub project: PathBuf,
    pub cache_dir: Option<PathBuf>,
}

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for the repository at `root`:
    /// defaults → global → project → env vars
    pub fn load(root: &Path) -> Result<Config> {
        let figment = Self::file_layers(
            Self::global_config_path().as_deref(),
            &Self::project_config_path(root),
        )
        .merge(Env::prefixed(ENV_PREFIX).split("__").lowercase(true));

        Self::extract(figment)
    }

    /// Load configuration from a specific file only
    pub fn load_from_file(path: &Path) -> Result<Config> {
        if !path.exists() {
            return Err(WikiError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        Self::extract(
            Figment::new()
                .merge(Serialized::defaults(Config::default()))
                .merge(Toml::file(path)),
        )
    }

    /// Defaults plus whichever of the two files exist
    fn file_layers(global: Option<&Path>, project: &Path) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = global
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(global_path));
        }

        if project.exists() {
            debug!("Loading project config from: {}", project.display());
            figment = figment.merge(Toml::file(project));
        }

        figment
    }

    fn extract(figment: Figment) -> Result<Config> {
        let config: Config = figment
            .extract()
            .map_err(|e| WikiError::Config(format!("Configuration error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", APP_NAME)
    }

    /// Global config directory
    pub fn global_dir() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().to_path_buf())
    }

    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join(CONFIG_FILE))
    }

    /// Platform cache directory, used when `cache.dir` is unset
    pub fn default_cache_dir() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.cache_dir().to_path_buf())
    }

    /// Effective cache directory for a loaded config
    pub fn cache_dir(config: &Config) -> Result<PathBuf> {
        config
            .cache
            .dir
            .clone()
            .or_else(Self::default_cache_dir)
            .ok_or_else(|| {
                WikiError::Config(
                    "Cannot determine cache directory; set cache.dir".to_string(),
                )
            })
    }

    /// Project data directory
    pub fn project_dir(root: &Path) -> PathBuf {
        root.join(DIR)
    }

    pub fn project_config_path(root: &Path) -> PathBuf {
        Self::project_dir(root).join(CONFIG_FILE)
    }

    pub fn paths(root: &Path) -> ConfigPaths {
        ConfigPaths {
            global: Self::global_config_path(),
            project: Self::project_config_path(root),
            cache_dir: Self::default_cache_dir(),
        }
    }

    pub fn is_project_initialized(root: &Path) -> bool {
        Self::project_dir(root).exists()
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    pub fn render(config: &Config, format: RenderFormat) -> Result<String> {
        match format {
            RenderFormat::Toml => {
                toml::to_string_pretty(config).map_err(|e| WikiError::Config(e.to_string()))
            }
            RenderFormat::Yaml => Ok(serde_yaml::to_string(config)?),
            RenderFormat::Json => Ok(serde_json::to_string_pretty(config)?),
        }
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Write the default global config
    pub fn init_global(force: bool) -> Result<PathBuf> {
        let path = Self::global_config_path().ok_or_else(|| {
            WikiError::Config("Cannot determine global config directory".to_string())
        })?;
        Self::write_default(&path, Self::default_global_config(), force)?;
        Ok(path)
    }

    /// Create `.wikidelta/` with a default project config
    pub fn init_project(root: &Path, force: bool) -> Result<PathBuf> {
        let project_dir = Self::project_dir(root);
        fs::create_dir_all(&project_dir)?;
        let config_path = Self::project_config_path(root);
        Self::write_default(&config_path, Self::default_project_config(), force)?;
        Ok(project_dir)
    }

    fn write_default(path: &Path, content: String, force: bool) -> Result<()> {
        if path.exists() && !force {
            info!("Config exists: {}", path.display());
            return Ok(());
        }
        write_atomic(path, content.as_bytes())?;
        info!("Created config: {}", path.display());
        Ok(())
    }

    // =========================================================================
    // Internal
    // =========================================================================

    fn default_global_config() -> String {
        r#"# wikidelta global configuration
# User-wide defaults. Settings in <repo>/.wikidelta/config.toml override these.

[cache]
# dir = "/path/to/wiki-cache"
language = "en"

[retry]
max_attempts = 3
base_delay_ms = 50
"#
        .to_string()
    }

    fn default_project_config() -> String {
        r#"# wikidelta project configuration
# Project-specific settings that override global defaults.

[scan]
# Non-empty inclusion lists switch scanning to inclusion mode.
included_dirs = []
included_files = []
max_file_size = 1048576

[workspace]
layout = "multi-file"
debounce_ms = 500
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wiki::ExportLayout;
    use tempfile::TempDir;

    #[test]
    fn test_project_overrides_global() {
        let temp = TempDir::new().unwrap();
        let global = temp.path().join("global.toml");
        let project = temp.path().join("project.toml");
        fs::write(&global, "[cache]\nlanguage = \"de\"\n[retry]\nmax_attempts = 7\n").unwrap();
        fs::write(&project, "[cache]\nlanguage = \"ja\"\n").unwrap();

        let config = ConfigLoader::extract(ConfigLoader::file_layers(Some(&global), &project)).unwrap();
        assert_eq!(config.cache.language, "ja");
        assert_eq!(config.retry.max_attempts, 7);
    }

    #[test]
    fn test_missing_files_fall_back_to_defaults() {
        let temp = TempDir::new().unwrap();
        let config = ConfigLoader::extract(ConfigLoader::file_layers(
            None,
            &temp.path().join("absent.toml"),
        ))
        .unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[workspace]\ndebounce_ms = 0\n").unwrap();
        assert!(matches!(
            ConfigLoader::load_from_file(&path),
            Err(WikiError::Config(_))
        ));

        fs::write(&path, "[workspace]\nlayout = \"sideways\"\n").unwrap();
        assert!(ConfigLoader::load_from_file(&path).is_err());
    }

    #[test]
    fn test_init_project_writes_loadable_config() {
        let temp = TempDir::new().unwrap();
        let dir = ConfigLoader::init_project(temp.path(), false).unwrap();
        assert!(dir.ends_with(".wikidelta"));
        assert!(ConfigLoader::is_project_initialized(temp.path()));

        let path = ConfigLoader::project_config_path(temp.path());
        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.workspace.layout, ExportLayout::MultiFile);

        // Existing files survive a second init without force
        fs::write(&path, "[cache]\nlanguage = \"fr\"\n").unwrap();
        ConfigLoader::init_project(temp.path(), false).unwrap();
        assert_eq!(ConfigLoader::load_from_file(&path).unwrap().cache.language, "fr");
    }

    #[test]
    fn test_render_formats() {
        let config = Config::default();
        let toml_text = ConfigLoader::render(&config, RenderFormat::Toml).unwrap();
        assert!(toml_text.contains("[workspace]"));
        assert!(!toml_text.contains("\ndir ="));

        let yaml = ConfigLoader::render(&config, RenderFormat::Yaml).unwrap();
        assert!(yaml.contains("debounce_ms: 500"));

        let json = ConfigLoader::render(&config, RenderFormat::Json).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
        assert_eq!("yml".parse::<RenderFormat>().unwrap(), RenderFormat::Yaml);
    }
}
