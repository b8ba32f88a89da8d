//! TOML configuration file parsing.
use serde::de::DeserializeOwned;
use std::path::Path;

use crate::error::ConfigError;

/// Read and deserialize a TOML file.
///
/// # Errors
///
/// Returns [`ConfigError::NotFound`] if the file does not exist,
/// [`ConfigError::Io`] if it cannot be read, and
/// [`ConfigError::InvalidSyntax`] if it is not valid TOML for `T`.
pub fn load_config<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;

    parse_config(&content, &path.display().to_string())
}

/// Deserialize TOML text; `file` is only used in error messages.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidSyntax`] if `content` is not valid TOML for `T`.
pub fn parse_config<T: DeserializeOwned>(content: &str, file: &str) -> Result<T, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::InvalidSyntax {
        file: file.to_string(),
        message: e.message().to_string(),
    })
}
