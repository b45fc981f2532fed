//! Config file loader and serialization.

use crate::error::ConfigError;
use crate::models::{ConfigPatch, Configuration};
use std::fs;
use std::path::{Path, PathBuf};

const SETTINGS_DIR: &str = ".config/ffdroid-builder";

/// Get the global settings path: ~/.config/ffdroid-builder/settings.toml
pub fn get_global_settings_path() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or_else(|| {
        ConfigError::ValidationFailed("Cannot determine home directory".to_string())
    })?;

    Ok(home.join(SETTINGS_DIR).join("settings.toml"))
}

/// Load a configuration patch from a JSON file.
///
/// The file uses the wire format; every field is optional, so a full saved
/// configuration and a hand-written fragment both load.
pub fn load_patch_from_file(path: &Path) -> Result<ConfigPatch, ConfigError> {
    validate_config_path(path)?;

    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::FileNotFound(format!(
                "Configuration file not found at: {}",
                path.display()
            ))
        } else {
            ConfigError::IoError(e)
        }
    })?;

    let patch: ConfigPatch = serde_json::from_str(&content)?;
    Ok(patch)
}

/// Save a full configuration as pretty JSON.
pub fn save_config_to_file(config: &Configuration, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let json_content = serde_json::to_string_pretty(config)?;
    fs::write(path, json_content)?;

    Ok(())
}

/// Validate config path (.json extension required).
pub fn validate_config_path(path: &Path) -> Result<(), ConfigError> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationFailed(
            "Configuration path cannot be empty".to_string(),
        ));
    }

    match path.extension() {
        Some(ext) if ext == "json" => Ok(()),
        Some(ext) => Err(ConfigError::ValidationFailed(format!(
            "Configuration file must have .json extension, got .{}",
            ext.to_string_lossy()
        ))),
        None => Err(ConfigError::ValidationFailed(
            "Configuration file must have .json extension".to_string(),
        )),
    }
}

/// Parse a `field=value` override as accepted by `--set`.
pub fn parse_override(raw: &str) -> Result<(super::ConfigField, super::FieldValue), ConfigError> {
    let (field, value) = raw.split_once('=').ok_or_else(|| {
        ConfigError::ValidationFailed(format!("Expected FIELD=VALUE, got '{}'", raw))
    })?;
    let field: super::ConfigField = field.parse()?;
    let value = field.parse_value(value)?;
    Ok((field, value))
}
