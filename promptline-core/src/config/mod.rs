//! Configuration module for Promptline
//!
//! This module provides the configuration schema, environment interpolation
//! and validation for the Promptline client.

mod env;
mod error;
mod schema;
mod validator;

pub use error::{ConfigError, ConfigResult, Location, ValidationError, ValidationErrorKind};
pub use schema::{
    ConnectionConfig, DefaultConfig, EndpointConfig, PromptlineConfig, StreamConfig,
    CONFIG_VERSION,
};
pub use validator::ConfigValidator;

use std::fs;
use std::path::Path;

/// Load a configuration from a YAML file
pub fn load_from_yaml<P: AsRef<Path>>(path: P) -> ConfigResult<PromptlineConfig> {
    let path = path.as_ref();
    let content = read(path)?;

    // Interpolate environment variables before parsing
    let interpolated = env::interpolate_env_vars(&content)?;

    let config: PromptlineConfig =
        serde_yaml::from_str(&interpolated).map_err(|e| ConfigError::Syntax {
            path: path.to_string_lossy().to_string(),
            location: Location::from_yaml(&e),
            message: e.to_string(),
        })?;

    finalize(config)
}

/// Load a configuration from a JSON file
pub fn load_from_json<P: AsRef<Path>>(path: P) -> ConfigResult<PromptlineConfig> {
    let path = path.as_ref();
    let content = read(path)?;

    // Interpolate environment variables before parsing
    let interpolated = env::interpolate_env_vars(&content)?;

    let config: PromptlineConfig =
        serde_json::from_str(&interpolated).map_err(|e| ConfigError::Syntax {
            path: path.to_string_lossy().to_string(),
            location: Location::from_json(&e),
            message: e.to_string(),
        })?;

    finalize(config)
}

/// Load a configuration, choosing the format from the file extension
pub fn load_from_path<P: AsRef<Path>>(path: P) -> ConfigResult<PromptlineConfig> {
    let path = path.as_ref();
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => load_from_yaml(path),
        Some("json") => load_from_json(path),
        _ => Err(ConfigError::UnsupportedFormat {
            path: path.to_string_lossy().to_string(),
        }),
    }
}

fn read(path: &Path) -> ConfigResult<String> {
    fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_string_lossy().to_string(),
        source: e,
    })
}

fn finalize(mut config: PromptlineConfig) -> ConfigResult<PromptlineConfig> {
    // Additional interpolation for any remaining env vars
    env::interpolate_config_env_vars(&mut config)?;

    ConfigValidator::new().validate(&config)?;
    Ok(config)
}
