use std::fs;
use std::path::Path;

use crate::model::config::EngineConfig;

/// Error type for config I/O
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    ReadError {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse engine.toml: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Read the engine config from a TOML file. Missing fields fall back to
/// their defaults.
pub fn read_config(path: &Path) -> Result<EngineConfig, ConfigError> {
    let text = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_config(&text)
}

/// Parse an engine config from TOML text
pub fn parse_config(text: &str) -> Result<EngineConfig, ConfigError> {
    Ok(toml::from_str(text)?)
}
