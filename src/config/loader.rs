//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::config::schema::{GatewayConfig, GatewayEntry, RootConfig};
use crate::config::validation::{validate_gateway, validate_root, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load and validate the root configuration.
pub fn load_root_config(path: &Path) -> Result<RootConfig, ConfigError> {
    let config: RootConfig = load_toml(path)?;
    validate_root(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate a gateway configuration.
pub fn load_gateway_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let config: GatewayConfig = load_toml(path)?;
    validate_gateway(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Resolve a gateway entry's file against the directory of the root file.
pub fn resolve_gateway_path(root_path: &Path, entry: &GatewayEntry) -> PathBuf {
    let file = Path::new(&entry.config_file);
    if file.is_absolute() {
        return file.to_path_buf();
    }
    root_path
        .parent()
        .map(|dir| dir.join(file))
        .unwrap_or_else(|| file.to_path_buf())
}
