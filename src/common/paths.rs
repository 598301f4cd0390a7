use anyhow::{Context, Result};
use std::path::PathBuf;

/// Get the easysub config directory, creating it on first use
pub fn config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .context("Unable to determine user config directory")?
        .join("easysub");

    std::fs::create_dir_all(&config_dir)
        .with_context(|| format!("creating config directory at {}", config_dir.display()))?;

    Ok(config_dir)
}

/// Path of the subtitle pipeline config file
pub fn subtitle_config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("subtitle.toml"))
}
