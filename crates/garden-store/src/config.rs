use std::path::{Path, PathBuf};
use std::{env, fs};

use garden_core::EngineConfig;

use crate::error::{Result, StoreError};

pub const CONFIG_FILE: &str = "garden.toml";
pub const DATA_DIR_ENV: &str = "GARDEN_DATA_DIR";

fn dirs_home() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// `$GARDEN_DATA_DIR`, else `~/.relationship-garden`.
pub fn default_data_dir() -> PathBuf {
    env::var(DATA_DIR_ENV)
        .ok()
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| dirs_home().join(".relationship-garden"))
}

/// Parse and validate an engine config from TOML text.
/// Missing keys take their defaults.
pub fn parse_config(text: &str) -> Result<EngineConfig> {
    let config: EngineConfig = toml::from_str(text)?;
    config.validate()?;
    Ok(config)
}

/// Load `garden.toml` from `dir`. A missing file yields the defaults.
pub fn load_config(dir: &Path) -> Result<EngineConfig> {
    let path = dir.join(CONFIG_FILE);
    if !path.exists() {
        tracing::debug!("no {} found, using default engine config", path.display());
        return Ok(EngineConfig::default());
    }
    let text = fs::read_to_string(&path)
        .map_err(|e| StoreError::Config(format!("failed to read {}: {e}", path.display())))?;
    let config = parse_config(&text)?;
    tracing::info!("loaded engine config from {}", path.display());
    Ok(config)
}
