//! Configuration loading and discovery for `spritesplit.toml`
//!
//! Provides functions to find, load, and merge configuration.

use super::schema::SplitConfig;
use crate::ocr::OcrBackendChoice;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config filename looked for in each directory.
pub const CONFIG_FILENAME: &str = "spritesplit.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse spritesplit.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override OCR backend
    pub ocr: Option<OcrBackendChoice>,
    /// Override index filename
    pub index_file: Option<String>,
}

/// Find spritesplit.toml by walking up from the current working directory.
///
/// Search order:
/// 1. Walk up from current directory looking for spritesplit.toml
/// 2. Check XDG_CONFIG_HOME/spritesplit/spritesplit.toml (or ~/.config/...)
pub fn find_config() -> Option<PathBuf> {
    if let Ok(cwd) = env::current_dir() {
        if let Some(path) = find_config_from(cwd) {
            return Some(path);
        }
    }

    find_xdg_config()
}

/// Find spritesplit.toml in the XDG config directory.
pub fn find_xdg_config() -> Option<PathBuf> {
    let xdg_config = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|_| env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
        .ok()?;

    let config_path = xdg_config.join("spritesplit").join(CONFIG_FILENAME);
    if config_path.exists() {
        Some(config_path)
    } else {
        None
    }
}

/// Find spritesplit.toml by walking up from a specific directory.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join(CONFIG_FILENAME);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load configuration.
///
/// If a path is provided, loads from that file and fails if it is missing.
/// Otherwise uses [`find_config`], falling back to defaults when nothing is
/// found.
///
/// # Example
/// ```ignore
/// let config = load_config(None)?;
/// let config = load_config(Some(Path::new("sprites/spritesplit.toml")))?;
/// ```
pub fn load_config(path: Option<&Path>) -> Result<SplitConfig, ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    match config_path {
        Some(p) => {
            tracing::debug!(path = %p.display(), "loading config");
            load_config_file(&p)
        }
        None => Ok(SplitConfig::default()),
    }
}

fn load_config_file(path: &Path) -> Result<SplitConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config: SplitConfig = toml::from_str(&contents)?;

    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }

    Ok(config)
}

/// Merge CLI overrides into a configuration.
///
/// CLI arguments take precedence over config file values. Re-validate
/// afterwards; an overridden index filename is not checked here.
pub fn merge_cli_overrides(config: &mut SplitConfig, overrides: &CliOverrides) {
    if let Some(backend) = overrides.ocr {
        config.ocr.backend = backend;
    }

    if let Some(ref index_file) = overrides.index_file {
        config.output.index_file = index_file.clone();
    }
}
