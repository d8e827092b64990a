//! Initialize the configuration directory: create `~/.dogcam` and a default `config.json`.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::Config;

/// Create the config directory and write the default config if the file does not exist.
/// An existing config file is left untouched. Returns the config directory.
pub fn init_config_dir(config_path: &Path) -> Result<PathBuf> {
    let config_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    std::fs::create_dir_all(&config_dir)
        .with_context(|| format!("creating config directory {}", config_dir.display()))?;

    if config_path.exists() {
        log::info!("config already present at {}", config_path.display());
        return Ok(config_dir);
    }
    let body = serde_json::to_string_pretty(&Config::default()).context("encoding default config")?;
    std::fs::write(config_path, body)
        .with_context(|| format!("writing config to {}", config_path.display()))?;
    log::info!("wrote default config to {}", config_path.display());
    Ok(config_dir)
}
