//! Match configuration loading.
//!
//! Configs are RON files holding a [`GameConfig`]. Missing optional sections
//! fall back to their defaults.

use std::path::{Path, PathBuf};

use td_core::config::GameConfig;
use td_core::error::GameError;
use thiserror::Error;

/// Error type for config loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File not found.
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// Failed to read file.
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] ron::error::SpannedError),
    /// Parsed, but a match could not run with it.
    #[error("Invalid config: {0}")]
    Invalid(#[from] GameError),
}

/// Load and validate a config file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<GameConfig, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    let contents = std::fs::read_to_string(path)?;
    let config = parse_config(&contents)?;
    tracing::debug!(
        path = %path.display(),
        waves = config.scenario.total_waves(),
        "Config loaded"
    );
    Ok(config)
}

/// Parse and validate a RON string.
pub fn parse_config(source: &str) -> Result<GameConfig, ConfigError> {
    let config: GameConfig = ron::from_str(source)?;
    config.validate()?;
    Ok(config)
}

/// Load `path` if given, otherwise use the built-in default config.
pub fn load_or_default(path: Option<&Path>) -> Result<GameConfig, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => Ok(GameConfig::default()),
    }
}
