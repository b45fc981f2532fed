//! Configuration module for FFmpeg Android builds.
//!
//! Holds the single source of truth for the build configuration and the client
//! settings of the configurator itself.
//!
//! # Module Structure
//!
//! - `merge`: Two-level preset merge (top-level override, per-key optimizations)
//! - `presets`: Read-only preset catalog fetched from the build server
//! - `validator`: Supported value sets and range checks
//! - `loader`: Configuration patches from JSON files, settings from TOML
//!
//! # Configuration Flow
//!
//! 1. `ConfigurationModel` starts from the hard-coded defaults
//! 2. Presets are merged in bulk, controls edit single fields
//! 3. `to_payload()` snapshots the model for submission

pub mod loader;
pub mod merge;
pub mod presets;
pub mod validator;

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::models::{ConfigPatch, Configuration, OptimizationFlag, OutputType, Preset};

pub use merge::merge_patch;
pub use presets::{PresetCatalog, PresetRegistry};

/// Top-level field of the configuration addressable by a control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigField {
    Preset,
    Api,
    OutputType,
    Architectures,
    Decoders,
    Encoders,
    Muxers,
    Demuxers,
    Protocols,
    Filters,
}

impl ConfigField {
    pub const LISTS: [ConfigField; 7] = [
        ConfigField::Architectures,
        ConfigField::Decoders,
        ConfigField::Encoders,
        ConfigField::Muxers,
        ConfigField::Demuxers,
        ConfigField::Protocols,
        ConfigField::Filters,
    ];

    /// Wire name of the field
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigField::Preset => "preset",
            ConfigField::Api => "api",
            ConfigField::OutputType => "outputType",
            ConfigField::Architectures => "architectures",
            ConfigField::Decoders => "decoders",
            ConfigField::Encoders => "encoders",
            ConfigField::Muxers => "muxers",
            ConfigField::Demuxers => "demuxers",
            ConfigField::Protocols => "protocols",
            ConfigField::Filters => "filters",
        }
    }

    pub fn is_list(&self) -> bool {
        Self::LISTS.contains(self)
    }

    /// Parse a raw text value into the kind this field holds.
    ///
    /// Lists are comma separated; an empty string yields an empty list.
    pub fn parse_value(&self, raw: &str) -> Result<FieldValue, ConfigError> {
        match self {
            ConfigField::Api => raw
                .trim()
                .parse::<u32>()
                .map(FieldValue::Integer)
                .map_err(|_| ConfigError::ValidationFailed(format!("API级别必须是整数: {}", raw))),
            ConfigField::Preset | ConfigField::OutputType => Ok(FieldValue::Text(raw.trim().to_string())),
            _ => Ok(FieldValue::List(
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect(),
            )),
        }
    }
}

impl fmt::Display for ConfigField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigField {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let field = match s.trim().to_lowercase().as_str() {
            "preset" => ConfigField::Preset,
            "api" => ConfigField::Api,
            "outputtype" | "output_type" | "output" => ConfigField::OutputType,
            "architectures" | "arch" => ConfigField::Architectures,
            "decoders" => ConfigField::Decoders,
            "encoders" => ConfigField::Encoders,
            "muxers" => ConfigField::Muxers,
            "demuxers" => ConfigField::Demuxers,
            "protocols" => ConfigField::Protocols,
            "filters" => ConfigField::Filters,
            _ => return Err(ConfigError::UnknownField(s.to_string())),
        };
        Ok(field)
    }
}

/// New value for a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Integer(u32),
    Text(String),
    List(Vec<String>),
}

/// Immutable snapshot of the configuration, ready for submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ConfigPayload {
    config: Configuration,
}

impl ConfigPayload {
    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl From<Configuration> for ConfigPayload {
    fn from(config: Configuration) -> Self {
        ConfigPayload { config }
    }
}

/// Owner of the current build configuration.
///
/// Controls never hold their own state: every edit goes through one of the
/// update methods, and every render reads `config()`.
#[derive(Debug, Clone, Default)]
pub struct ConfigurationModel {
    config: Configuration,
}

impl ConfigurationModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// Select a preset and merge its patch over the current configuration.
    pub fn apply_preset(&mut self, preset: &Preset) {
        let mut merged = merge_patch(&self.config, &preset.config);
        merged.preset = preset.id.clone();
        log::debug!("[Config] Applied preset '{}'", preset.id);
        self.config = merged;
    }

    /// Merge an arbitrary patch (config files, `--set` overrides).
    pub fn apply_patch(&mut self, patch: &ConfigPatch) {
        self.config = merge_patch(&self.config, patch);
    }

    /// Replace one top-level scalar or list.
    pub fn set_field(&mut self, field: ConfigField, value: FieldValue) -> Result<(), ConfigError> {
        match (field, value) {
            (ConfigField::Api, FieldValue::Integer(api)) => {
                validator::validate_api_level(api)?;
                self.config.api = api;
            }
            (ConfigField::Architectures, FieldValue::List(items)) => {
                validator::validate_architectures(&items)?;
                self.config.architectures = merge::dedup_preserving_order(&items);
            }
            (ConfigField::Preset, FieldValue::Text(preset)) => self.config.preset = preset,
            (ConfigField::OutputType, FieldValue::Text(raw)) => {
                self.config.output_type = raw.parse::<OutputType>().map_err(ConfigError::ValidationFailed)?;
            }
            (field, FieldValue::List(items)) if field.is_list() => {
                *self.list_mut(field) = merge::dedup_preserving_order(&items);
            }
            (field, value) => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Field '{}' cannot hold {:?}",
                    field, value
                )));
            }
        }
        Ok(())
    }

    /// Add `item` to a list field if absent, remove it if present.
    ///
    /// Returns whether the item is selected afterwards.
    pub fn toggle_selection(&mut self, field: ConfigField, item: &str) -> Result<bool, ConfigError> {
        if !field.is_list() {
            return Err(ConfigError::ValidationFailed(format!(
                "Field '{}' is not a multi-select field",
                field
            )));
        }
        let present = self.list(field).iter().any(|existing| existing == item);
        if field == ConfigField::Architectures && !present {
            validator::validate_architectures(&[item.to_string()])?;
        }
        let list = self.list_mut(field);
        if let Some(idx) = list.iter().position(|existing| existing == item) {
            list.remove(idx);
            Ok(false)
        } else {
            list.push(item.to_string());
            Ok(true)
        }
    }

    pub fn set_optimization(&mut self, flag: OptimizationFlag, value: bool) {
        self.config.optimizations.set(flag, value);
    }

    pub fn list(&self, field: ConfigField) -> &[String] {
        match field {
            ConfigField::Architectures => &self.config.architectures,
            ConfigField::Decoders => &self.config.decoders,
            ConfigField::Encoders => &self.config.encoders,
            ConfigField::Muxers => &self.config.muxers,
            ConfigField::Demuxers => &self.config.demuxers,
            ConfigField::Protocols => &self.config.protocols,
            ConfigField::Filters => &self.config.filters,
            ConfigField::Preset | ConfigField::Api | ConfigField::OutputType => &[],
        }
    }

    fn list_mut(&mut self, field: ConfigField) -> &mut Vec<String> {
        match field {
            ConfigField::Decoders => &mut self.config.decoders,
            ConfigField::Encoders => &mut self.config.encoders,
            ConfigField::Muxers => &mut self.config.muxers,
            ConfigField::Demuxers => &mut self.config.demuxers,
            ConfigField::Protocols => &mut self.config.protocols,
            ConfigField::Filters => &mut self.config.filters,
            // Callers check is_list() first
            _ => &mut self.config.architectures,
        }
    }

    /// Snapshot for submission.
    pub fn to_payload(&self) -> ConfigPayload {
        ConfigPayload::from(self.config.clone())
    }
}

/// Client settings for the configurator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Base URL of the build server
    pub server_url: String,
    /// Status poll interval
    pub poll_interval_secs: u64,
    /// Lifetime of a notification
    pub notification_ttl_secs: u64,
    /// Initial auto-scroll state of the log view
    pub auto_scroll_logs: bool,
    /// Directory for the client's diagnostic log files
    pub log_dir: String,
    /// Timeout for non-streaming requests
    pub request_timeout_secs: u64,
    /// Preset selected on startup when the server offers it
    pub default_preset: String,
    /// Raise the diagnostic log level to debug
    pub debug_logging: bool,
}

impl Default for ClientSettings {
    fn default() -> Self {
        ClientSettings {
            server_url: "http://127.0.0.1:5000".to_string(),
            poll_interval_secs: 60,
            notification_ttl_secs: 5,
            auto_scroll_logs: true,
            log_dir: "logs".to_string(),
            request_timeout_secs: 30,
            default_preset: "standard".to_string(),
            debug_logging: false,
        }
    }
}

impl ClientSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn notification_ttl(&self) -> Duration {
        Duration::from_secs(self.notification_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// Loads and persists [`ClientSettings`] as TOML.
///
/// Lookup order: an explicit path, then `~/.config/ffdroid-builder/settings.toml`,
/// then the built-in defaults.
pub struct SettingsManager;

impl SettingsManager {
    /// Load settings, falling back to defaults when the file is missing or malformed.
    pub fn load(explicit: Option<&Path>) -> ClientSettings {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match loader::get_global_settings_path() {
                Ok(path) => path,
                Err(e) => {
                    log::warn!("[Config] {}; using default settings", e);
                    return ClientSettings::default();
                }
            },
        };

        match Self::load_from(&path) {
            Ok(settings) => {
                log::debug!("[Config] Loaded settings from {}", path.display());
                settings
            }
            Err(ConfigError::FileNotFound(_)) => ClientSettings::default(),
            Err(e) => {
                log::warn!(
                    "[Config] Failed to parse {}, falling back to defaults: {}",
                    path.display(),
                    e
                );
                ClientSettings::default()
            }
        }
    }

    /// Strict load: any failure is returned to the caller.
    pub fn load_from(path: &Path) -> Result<ClientSettings, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound(path.display().to_string())
            } else {
                ConfigError::IoError(e)
            }
        })?;
        Ok(toml::from_str::<ClientSettings>(&content)?)
    }

    pub fn save(settings: &ClientSettings, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = toml::to_string_pretty(settings)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OptimizationPatch;

    fn preset(id: &str, patch: ConfigPatch) -> Preset {
        Preset {
            id: id.to_string(),
            name: id.to_uppercase(),
            description: String::new(),
            config: patch,
        }
    }

    #[test]
    fn test_apply_preset_sets_preset_id() {
        let mut model = ConfigurationModel::new();
        model.apply_preset(&preset("streaming", ConfigPatch::default()));
        assert_eq!(model.config().preset, "streaming");
    }

    #[test]
    fn test_manual_edit_survives_after_two_presets() {
        let mut model = ConfigurationModel::new();
        model.apply_preset(&preset(
            "standard",
            ConfigPatch {
                decoders: Some(vec!["h264".into(), "aac".into()]),
                ..ConfigPatch::default()
            },
        ));
        model.apply_preset(&preset(
            "live",
            ConfigPatch {
                decoders: Some(vec!["h264".into(), "hevc".into()]),
                optimizations: Some(OptimizationPatch {
                    enable_small: Some(true),
                    ..OptimizationPatch::default()
                }),
                ..ConfigPatch::default()
            },
        ));
        model
            .set_field(ConfigField::Decoders, FieldValue::List(vec!["vp9".into()]))
            .unwrap();

        let payload = model.to_payload();
        assert_eq!(payload.config().decoders, vec!["vp9"]);
        assert_eq!(payload.config().preset, "live");
        assert!(payload.config().optimizations.enable_small);
    }

    #[test]
    fn test_set_field_rejects_wrong_kind() {
        let mut model = ConfigurationModel::new();
        let err = model.set_field(ConfigField::Api, FieldValue::List(vec![]));
        assert!(err.is_err());
        assert_eq!(model.config().api, 21);
    }

    #[test]
    fn test_out_of_range_values_are_rejected() {
        let mut model = ConfigurationModel::new();
        assert!(model.set_field(ConfigField::Api, FieldValue::Integer(14)).is_err());
        assert!(model
            .set_field(ConfigField::Architectures, FieldValue::List(vec!["mips".into()]))
            .is_err());
        assert!(model.toggle_selection(ConfigField::Architectures, "riscv64").is_err());
        assert!(model.toggle_selection(ConfigField::Architectures, "x86").unwrap());
        assert_eq!(model.config().api, 21);
        assert_eq!(model.config().architectures, vec!["arm64-v8a", "armeabi-v7a", "x86"]);
    }

    #[test]
    fn test_set_output_type_from_text() {
        let mut model = ConfigurationModel::new();
        model
            .set_field(ConfigField::OutputType, FieldValue::Text("static".into()))
            .unwrap();
        assert_eq!(model.config().output_type, OutputType::Static);
        assert!(model
            .set_field(ConfigField::OutputType, FieldValue::Text("dylib".into()))
            .is_err());
    }

    #[test]
    fn test_toggle_selection() {
        let mut model = ConfigurationModel::new();
        assert!(!model.toggle_selection(ConfigField::Decoders, "aac").unwrap());
        assert_eq!(model.config().decoders, vec!["h264", "mp3"]);
        assert!(model.toggle_selection(ConfigField::Decoders, "aac").unwrap());
        assert_eq!(model.config().decoders, vec!["h264", "mp3", "aac"]);
        assert!(model.toggle_selection(ConfigField::Api, "21").is_err());
    }

    #[test]
    fn test_parse_value_lists_and_integers() {
        assert_eq!(
            ConfigField::Muxers.parse_value("mp4, flv ,").unwrap(),
            FieldValue::List(vec!["mp4".into(), "flv".into()])
        );
        assert_eq!(ConfigField::Api.parse_value("24").unwrap(), FieldValue::Integer(24));
        assert!(ConfigField::Api.parse_value("abc").is_err());
        assert_eq!(ConfigField::Filters.parse_value("").unwrap(), FieldValue::List(vec![]));
    }

    #[test]
    fn test_field_names_round_trip() {
        for field in ConfigField::LISTS {
            assert_eq!(field.as_str().parse::<ConfigField>().unwrap(), field);
        }
        assert_eq!("outputType".parse::<ConfigField>().unwrap(), ConfigField::OutputType);
        assert!("codecs".parse::<ConfigField>().is_err());
    }

    #[test]
    fn test_payload_is_a_snapshot() {
        let mut model = ConfigurationModel::new();
        let payload = model.to_payload();
        model.set_optimization(OptimizationFlag::EnableSmall, true);
        assert!(!payload.config().optimizations.enable_small);
        let json: serde_json::Value = serde_json::from_str(&payload.to_json().unwrap()).unwrap();
        assert_eq!(json["api"], 21);
    }

    #[test]
    fn test_settings_defaults() {
        let settings = ClientSettings::default();
        assert_eq!(settings.poll_interval(), Duration::from_secs(60));
        assert_eq!(settings.notification_ttl(), Duration::from_secs(5));
        assert!(settings.auto_scroll_logs);
    }

    #[test]
    fn test_settings_save_and_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested/settings.toml");
        let settings = ClientSettings {
            server_url: "http://build.local:8080".to_string(),
            poll_interval_secs: 5,
            ..ClientSettings::default()
        };
        SettingsManager::save(&settings, &path).unwrap();
        assert_eq!(SettingsManager::load_from(&path).unwrap(), settings);
    }

    #[test]
    fn test_partial_settings_fill_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "poll_interval_secs = 10\n").unwrap();
        let settings = SettingsManager::load(Some(path.as_path()));
        assert_eq!(settings.poll_interval_secs, 10);
        assert_eq!(settings.server_url, "http://127.0.0.1:5000");
    }

    #[test]
    fn test_malformed_settings_fall_back_to_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "poll_interval_secs = \"soon\"").unwrap();
        assert!(matches!(
            SettingsManager::load_from(&path),
            Err(ConfigError::InvalidToml(_))
        ));
        assert_eq!(SettingsManager::load(Some(path.as_path())), ClientSettings::default());
    }

    #[test]
    fn test_missing_settings_file_is_defaults() {
        let settings = SettingsManager::load(Some(Path::new("/nonexistent/settings.toml")));
        assert_eq!(settings, ClientSettings::default());
    }
}
