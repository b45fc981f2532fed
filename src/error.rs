//! Unified error type hierarchy for the build configurator
//!
//! Provides structured error handling with ConfigError, WizardError, BackendError,
//! SupervisorError, and AppError.

use std::io;
use thiserror::Error;

/// Configuration file parsing and validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid JSON in config: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Invalid TOML in settings: {0}")]
    InvalidToml(#[from] toml::de::Error),

    #[error("Failed to serialize settings: {0}")]
    SettingsSerialize(#[from] toml::ser::Error),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("Unknown configuration field: {0}")]
    UnknownField(String),

    #[error("IO error during config operations: {0}")]
    IoError(#[from] io::Error),
}

/// Wizard navigation errors.
///
/// Validation failures are non-fatal: the step is left unchanged and the
/// reason is shown inline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WizardError {
    #[error("Step {step} is incomplete: {reason}")]
    ValidationFailed { step: u8, reason: String },

    #[error("Cannot jump from step {from} to step {to}")]
    JumpNotAllowed { from: u8, to: u8 },

    #[error("Step {0} does not exist")]
    InvalidStep(u8),
}

impl WizardError {
    /// The inline reason shown next to the step controls
    pub fn reason(&self) -> String {
        match self {
            WizardError::ValidationFailed { reason, .. } => reason.clone(),
            other => other.to_string(),
        }
    }
}

/// Backend request errors (save, generate, start, status, presets).
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Server returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("{0}")]
    Rejected(String),

    #[error("Event stream closed")]
    StreamClosed,
}

/// Compilation session errors.
#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("A compilation is already running")]
    Busy,

    #[error("Compilation was not started: {0}")]
    Rejected(String),

    #[error("Compilation request failed: {0}")]
    Request(#[from] BackendError),
}

/// Global error type surfaced to the user.
///
/// Every variant degrades to a notification or an inline message; none of them
/// ends the session.
#[derive(Error, Debug, Clone)]
pub enum AppError {
    /// A wizard gate blocked navigation or compilation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Save/generate/start/presets request failed
    #[error("Request error: {0}")]
    Request(String),

    /// A compile is already in progress
    #[error("Busy: {0}")]
    Busy(String),

    /// Settings persist or deserialize error
    #[error("Settings error: {0}")]
    Settings(String),

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(String),

    /// Invalid console input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl AppError {
    /// Get a user-facing error message suitable for UI display
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::Request(msg) => msg.clone(),
            AppError::Busy(_) => "编译正在进行中...".to_string(),
            AppError::Settings(msg) => format!("Settings error: {}", msg),
            AppError::Io(msg) => format!("File operation failed: {}", msg),
            AppError::InvalidInput(msg) => format!("Invalid input: {}", msg),
        }
    }
}

impl From<WizardError> for AppError {
    fn from(e: WizardError) -> Self {
        AppError::Validation(e.reason())
    }
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::ValidationFailed(msg) => AppError::Validation(msg),
            ConfigError::UnknownField(msg) => AppError::InvalidInput(msg),
            ConfigError::IoError(e) => AppError::Io(e.to_string()),
            other => AppError::Settings(other.to_string()),
        }
    }
}

impl From<SupervisorError> for AppError {
    fn from(e: SupervisorError) -> Self {
        match e {
            SupervisorError::Busy => AppError::Busy(SupervisorError::Busy.to_string()),
            SupervisorError::Rejected(msg) => AppError::Request(msg),
            SupervisorError::Request(inner) => AppError::Request(inner.to_string()),
        }
    }
}

impl From<io::Error> for AppError {
    fn from(e: io::Error) -> Self {
        AppError::Io(e.to_string())
    }
}

/// Top-level result type for operations that may fail.
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
