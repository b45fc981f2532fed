//! Core data types for the build configurator.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Library output type of the FFmpeg build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputType {
    Shared,
    Static,
}

impl OutputType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputType::Shared => "shared",
            OutputType::Static => "static",
        }
    }
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "shared" => Ok(OutputType::Shared),
            "static" => Ok(OutputType::Static),
            other => Err(format!("不支持的输出类型: {}", other)),
        }
    }
}

/// Named boolean switches passed to the FFmpeg configure step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OptimizationFlags {
    pub disable_asm: bool,
    pub enable_pic: bool,
    pub disable_debug: bool,
    pub disable_doc: bool,
    pub disable_programs: bool,
    pub enable_small: bool,
}

impl Default for OptimizationFlags {
    fn default() -> Self {
        OptimizationFlags {
            disable_asm: true,
            enable_pic: true,
            disable_debug: true,
            disable_doc: true,
            disable_programs: true,
            enable_small: false,
        }
    }
}

impl OptimizationFlags {
    pub fn get(&self, flag: OptimizationFlag) -> bool {
        match flag {
            OptimizationFlag::DisableAsm => self.disable_asm,
            OptimizationFlag::EnablePic => self.enable_pic,
            OptimizationFlag::DisableDebug => self.disable_debug,
            OptimizationFlag::DisableDoc => self.disable_doc,
            OptimizationFlag::DisablePrograms => self.disable_programs,
            OptimizationFlag::EnableSmall => self.enable_small,
        }
    }

    pub fn set(&mut self, flag: OptimizationFlag, value: bool) {
        let slot = match flag {
            OptimizationFlag::DisableAsm => &mut self.disable_asm,
            OptimizationFlag::EnablePic => &mut self.enable_pic,
            OptimizationFlag::DisableDebug => &mut self.disable_debug,
            OptimizationFlag::DisableDoc => &mut self.disable_doc,
            OptimizationFlag::DisablePrograms => &mut self.disable_programs,
            OptimizationFlag::EnableSmall => &mut self.enable_small,
        };
        *slot = value;
    }
}

/// Key of one optimization switch, using the wire (camelCase) names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptimizationFlag {
    DisableAsm,
    EnablePic,
    DisableDebug,
    DisableDoc,
    DisablePrograms,
    EnableSmall,
}

impl OptimizationFlag {
    pub const ALL: [OptimizationFlag; 6] = [
        OptimizationFlag::DisableAsm,
        OptimizationFlag::EnablePic,
        OptimizationFlag::DisableDebug,
        OptimizationFlag::DisableDoc,
        OptimizationFlag::DisablePrograms,
        OptimizationFlag::EnableSmall,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OptimizationFlag::DisableAsm => "disableAsm",
            OptimizationFlag::EnablePic => "enablePic",
            OptimizationFlag::DisableDebug => "disableDebug",
            OptimizationFlag::DisableDoc => "disableDoc",
            OptimizationFlag::DisablePrograms => "disablePrograms",
            OptimizationFlag::EnableSmall => "enableSmall",
        }
    }
}

impl FromStr for OptimizationFlag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OptimizationFlag::ALL
            .iter()
            .copied()
            .find(|flag| flag.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown optimization flag: {}", s))
    }
}

/// The build configuration assembled by the wizard.
///
/// Serializes to the wire payload accepted by `save-config`, `generate-script`
/// and `start-compilation`. Selection lists keep insertion order and never hold
/// duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Configuration {
    pub preset: String,
    pub api: u32,
    pub output_type: OutputType,
    pub architectures: Vec<String>,
    pub decoders: Vec<String>,
    pub encoders: Vec<String>,
    pub muxers: Vec<String>,
    pub demuxers: Vec<String>,
    pub protocols: Vec<String>,
    pub filters: Vec<String>,
    pub optimizations: OptimizationFlags,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            preset: "basic".to_string(),
            api: 21,
            output_type: OutputType::Shared,
            architectures: strings(&["arm64-v8a", "armeabi-v7a"]),
            decoders: strings(&["h264", "aac", "mp3"]),
            encoders: Vec::new(),
            muxers: strings(&["mp4", "m4a"]),
            demuxers: strings(&["mov", "mp4", "m4a", "mp3"]),
            protocols: strings(&["file", "http", "https"]),
            filters: Vec::new(),
            optimizations: OptimizationFlags::default(),
        }
    }
}

/// Partial optimization record carried by a preset; absent keys keep the prior value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_asm: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_pic: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_debug: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_doc: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_programs: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_small: Option<bool>,
}

impl OptimizationPatch {
    pub fn get(&self, flag: OptimizationFlag) -> Option<bool> {
        match flag {
            OptimizationFlag::DisableAsm => self.disable_asm,
            OptimizationFlag::EnablePic => self.enable_pic,
            OptimizationFlag::DisableDebug => self.disable_debug,
            OptimizationFlag::DisableDoc => self.disable_doc,
            OptimizationFlag::DisablePrograms => self.disable_programs,
            OptimizationFlag::EnableSmall => self.enable_small,
        }
    }

    pub fn set(&mut self, flag: OptimizationFlag, value: Option<bool>) {
        let slot = match flag {
            OptimizationFlag::DisableAsm => &mut self.disable_asm,
            OptimizationFlag::EnablePic => &mut self.enable_pic,
            OptimizationFlag::DisableDebug => &mut self.disable_debug,
            OptimizationFlag::DisableDoc => &mut self.disable_doc,
            OptimizationFlag::DisablePrograms => &mut self.disable_programs,
            OptimizationFlag::EnableSmall => &mut self.enable_small,
        };
        *slot = value;
    }
}

/// Partial configuration: every field present overrides, every field absent is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_type: Option<OutputType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub architectures: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decoders: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoders: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub muxers: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demuxers: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocols: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimizations: Option<OptimizationPatch>,
}

/// A named partial configuration bundle served by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    /// Catalog key; filled from the map key when fetched
    #[serde(default, skip_serializing)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub config: ConfigPatch,
}

/// Status snapshot returned by `GET /api/compilation-status`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilationStatus {
    pub running: bool,
    pub completed: bool,
    pub success: bool,
    pub status: String,
    pub progress: u32,
    pub error: Option<String>,
}

/// Severity of a compile log line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
    Debug,
    /// Level string the client does not know; kept verbatim
    Other(String),
}

impl LogLevel {
    pub fn as_str(&self) -> &str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Success => "success",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
            LogLevel::Debug => "debug",
            LogLevel::Other(s) => s.as_str(),
        }
    }

    pub fn parse(raw: &str) -> LogLevel {
        match raw.trim().to_lowercase().as_str() {
            "" | "info" => LogLevel::Info,
            "success" => LogLevel::Success,
            "warning" | "warn" => LogLevel::Warning,
            "error" => LogLevel::Error,
            "debug" => LogLevel::Debug,
            _ => LogLevel::Other(raw.to_string()),
        }
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.map(|s| LogLevel::parse(&s)).unwrap_or_default())
    }
}

impl Serialize for LogLevel {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of compile output delivered by the event stream or the history endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub level: LogLevel,
    #[serde(default)]
    pub message: String,
}

impl LogEvent {
    pub fn new(timestamp: impl Into<String>, level: LogLevel, message: impl Into<String>) -> Self {
        LogEvent {
            timestamp: timestamp.into(),
            level,
            message: message.into(),
        }
    }
}

/// Dot next to the status text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusIndicator {
    Idle,
    Running,
    Success,
    Error,
}

impl StatusIndicator {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusIndicator::Idle => "idle",
            StatusIndicator::Running => "running",
            StatusIndicator::Success => "success",
            StatusIndicator::Error => "error",
        }
    }
}

/// State of the compile action control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileAffordance {
    Ready,
    Compiling,
    Succeeded,
    Failed,
}

impl CompileAffordance {
    /// Whether the control accepts a click
    pub fn enabled(&self) -> bool {
        !matches!(self, CompileAffordance::Compiling)
    }

    pub fn label(&self) -> &'static str {
        match self {
            CompileAffordance::Ready => "开始编译",
            CompileAffordance::Compiling => "⏳ 编译中...",
            CompileAffordance::Succeeded => "✅ 编译完成",
            CompileAffordance::Failed => "❌ 编译失败",
        }
    }
}

/// Severity of a transient notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}
