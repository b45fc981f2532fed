//! FFmpeg Android build configurator
//!
//! Client for a build server that compiles FFmpeg for Android. A nine-step
//! wizard assembles a [`Configuration`], which can be saved, turned into a
//! build script, or submitted for compilation. A running compilation is
//! followed through a live log stream plus a periodic status poll.
//!
//! The crate is organized into functional modules:
//! - **error**: Unified error type hierarchy
//! - **models**: Core data structures and wire types
//! - **config**: Configuration model, presets, merge rules and client settings
//! - **backend**: HTTP client for the build server and the SSE decoder
//! - **wizard**: Step navigation and validation gates
//! - **orchestrator**: Compilation supervisor and its monitoring tasks
//! - **ui**: Session controller, log sink, notifications and terminal front-end
//! - **log_collector**: Client diagnostic logging to disk

// Core foundational modules
pub mod error;
pub mod models;

// Configuration model, presets and settings
pub mod config;

// Build server access
pub mod backend;

// Wizard navigation
pub mod wizard;

// Compilation job lifecycle and monitoring
pub mod orchestrator;

// Session controller and console front-end
pub mod ui;

// Robust, decoupled logging system
pub mod log_collector;

// Re-export the log crate for macro usage
pub use log;

// Re-export log collector for use throughout the system
pub use log_collector::{LogCollector, LogLine};

// ============================================================================
// PUBLIC RE-EXPORTS FOR CONVENIENCE
// ============================================================================

// Re-export error types for easy access
pub use error::{AppError, BackendError, ConfigError, Result, SupervisorError, WizardError};

// Re-export model types for easy access
pub use models::{
    CompilationStatus, CompileAffordance, ConfigPatch, Configuration, LogEvent, LogLevel,
    OptimizationFlag, OptimizationFlags, OutputType, Preset, Severity, StatusIndicator,
};

// Re-export config types and SettingsManager
pub use config::{
    ClientSettings, ConfigField, ConfigPayload, ConfigurationModel, FieldValue, PresetCatalog,
    PresetRegistry, SettingsManager,
};

pub use backend::{BackendApi, HttpBackend};

pub use wizard::{WizardController, WizardStep};

pub use orchestrator::{CompilationSupervisor, SessionOutcome, SessionUpdate, SupervisorEvent};

// Re-export UI controller
pub use ui::AppController;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
