//! AppController: the session object.
//!
//! Created once per run and passed by `&mut` into every handler. It owns the
//! configuration model, the wizard, the supervisor, the log sink and the
//! notification reporter; every user action is a method here.

use std::sync::Arc;

use crate::backend::BackendApi;
use crate::config::validator::validate_config;
use crate::config::{
    ClientSettings, ConfigField, ConfigPayload, ConfigurationModel, FieldValue, PresetCatalog,
    PresetRegistry,
};
use crate::error::{AppError, SupervisorError};
use crate::{log_info, log_parsed};
use crate::models::{
    CompileAffordance, ConfigPatch, Configuration, LogEvent, OptimizationFlag, Preset,
    StatusIndicator,
};
use crate::orchestrator::{CompilationSupervisor, JobId, SessionUpdate, SupervisorEvent};
use crate::wizard::{WizardController, WizardStep};

use super::log_sink::LogSink;
use super::notifications::NotificationReporter;

/// Status text shown while a snapshot carries none.
pub const DEFAULT_STATUS_TEXT: &str = "编译中...";

/// Which panel of the last step is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionView {
    Summary,
    CompileStatus,
}

pub struct AppController {
    backend: Arc<dyn BackendApi>,
    settings: ClientSettings,
    model: ConfigurationModel,
    wizard: WizardController,
    presets: PresetCatalog,
    supervisor: CompilationSupervisor,
    sink: LogSink,
    reporter: NotificationReporter,
    affordance: CompileAffordance,
    indicator: StatusIndicator,
    status_text: String,
    progress: u32,
    view: SessionView,
    last_validation_error: Option<String>,
}

impl AppController {
    pub fn new(backend: Arc<dyn BackendApi>, settings: ClientSettings) -> Self {
        let supervisor = CompilationSupervisor::new(Arc::clone(&backend), settings.poll_interval());
        AppController {
            sink: LogSink::new(settings.auto_scroll_logs),
            reporter: NotificationReporter::new(settings.notification_ttl()),
            backend,
            model: ConfigurationModel::new(),
            wizard: WizardController::new(),
            presets: PresetCatalog::default(),
            supervisor,
            affordance: CompileAffordance::Ready,
            indicator: StatusIndicator::Idle,
            status_text: String::new(),
            progress: 0,
            view: SessionView::Summary,
            last_validation_error: None,
            settings,
        }
    }

    /// Load presets and select the default one when the server offers it.
    pub async fn initialize(&mut self) {
        let (catalog, error) = PresetRegistry::fetch(self.backend.as_ref()).await;
        self.presets = catalog;
        if let Some(e) = error {
            self.reporter.warning(format!("加载预设失败: {}", e));
        }

        let default_id = self.settings.default_preset.clone();
        if let Some(preset) = self.presets.get(&default_id).cloned() {
            self.model.apply_preset(&preset);
            log_info!("[Session] Default preset '{}' selected", preset.id);
        }
    }

    // ---- read accessors ----

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub fn config(&self) -> &Configuration {
        self.model.config()
    }

    pub fn model(&self) -> &ConfigurationModel {
        &self.model
    }

    pub fn wizard(&self) -> &WizardController {
        &self.wizard
    }

    pub fn presets(&self) -> &PresetCatalog {
        &self.presets
    }

    pub fn supervisor(&self) -> &CompilationSupervisor {
        &self.supervisor
    }

    pub fn sink(&self) -> &LogSink {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut LogSink {
        &mut self.sink
    }

    pub fn reporter(&self) -> &NotificationReporter {
        &self.reporter
    }

    pub fn affordance(&self) -> CompileAffordance {
        self.affordance
    }

    pub fn indicator(&self) -> StatusIndicator {
        self.indicator
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    pub fn progress(&self) -> u32 {
        self.progress
    }

    pub fn view(&self) -> SessionView {
        self.view
    }

    pub fn last_validation_error(&self) -> Option<&str> {
        self.last_validation_error.as_deref()
    }

    pub fn is_compiling(&self) -> bool {
        self.supervisor.is_active()
    }

    // ---- configuration edits ----

    /// Select a preset by id, fetching it individually if the catalog lacks it.
    pub async fn select_preset(&mut self, id: &str) -> Result<(), AppError> {
        let preset: Preset = match self.presets.get(id) {
            Some(preset) => preset.clone(),
            None => PresetRegistry::fetch_one(self.backend.as_ref(), id)
                .await
                .map_err(|e| {
                    let err = AppError::Request(format!("加载预设失败: {}", e));
                    self.reporter.error(err.user_message());
                    err
                })?,
        };
        self.model.apply_preset(&preset);
        self.after_edit();
        Ok(())
    }

    /// Merge an arbitrary patch, e.g. a configuration file.
    pub fn apply_patch(&mut self, patch: &ConfigPatch) {
        self.model.apply_patch(patch);
        self.after_edit();
    }

    pub fn set_field(&mut self, field: ConfigField, value: FieldValue) -> Result<(), AppError> {
        self.model.set_field(field, value)?;
        self.after_edit();
        Ok(())
    }

    pub fn toggle_selection(&mut self, field: ConfigField, item: &str) -> Result<bool, AppError> {
        let selected = self.model.toggle_selection(field, item)?;
        self.after_edit();
        Ok(selected)
    }

    pub fn set_optimization(&mut self, flag: OptimizationFlag, value: bool) {
        self.model.set_optimization(flag, value);
        self.after_edit();
    }

    fn after_edit(&mut self) {
        self.last_validation_error = None;
        if self.wizard.current_step() == WizardStep::Summary {
            self.wizard.refresh_summary(self.model.config());
        }
    }

    // ---- navigation ----

    pub fn next_step(&mut self) -> Result<WizardStep, AppError> {
        let result = self.wizard.next(self.model.config());
        self.record_validation(result)
    }

    pub fn previous_step(&mut self) -> WizardStep {
        self.last_validation_error = None;
        self.wizard.previous()
    }

    pub fn goto_step(&mut self, step: u8) -> Result<WizardStep, AppError> {
        let result = self.wizard.goto(step, self.model.config());
        self.record_validation(result)
    }

    fn record_validation<T>(&mut self, result: Result<T, crate::error::WizardError>) -> Result<T, AppError> {
        match result {
            Ok(value) => {
                self.last_validation_error = None;
                Ok(value)
            }
            Err(e) => {
                let reason = e.reason();
                log::debug!("[Session] validation: {}", reason);
                self.last_validation_error = Some(reason);
                Err(e.into())
            }
        }
    }

    // ---- backend actions ----

    fn payload(&self) -> ConfigPayload {
        self.model.to_payload()
    }

    pub async fn save_config(&mut self) -> Result<(), AppError> {
        match self.backend.save_config(&self.payload()).await {
            Ok(()) => {
                self.reporter.success("配置已保存");
                Ok(())
            }
            Err(e) => {
                let err = AppError::Request(format!("保存失败: {}", e));
                self.reporter.error(err.user_message());
                Err(err)
            }
        }
    }

    /// Returns the path of the generated script on the server.
    pub async fn generate_script(&mut self) -> Result<String, AppError> {
        match self.backend.generate_script(&self.payload()).await {
            Ok(path) => {
                self.reporter.success(format!("编译脚本已生成: {}", path));
                Ok(path)
            }
            Err(e) => {
                let err = AppError::Request(format!("生成失败: {}", e));
                self.reporter.error(err.user_message());
                Err(err)
            }
        }
    }

    /// Validate, submit and start monitoring a compilation.
    pub async fn start_compilation(&mut self) -> Result<JobId, AppError> {
        if self.supervisor.is_active() {
            let err = AppError::from(SupervisorError::Busy);
            self.reporter.warning(err.user_message());
            return Err(err);
        }

        let gate = self.wizard.validate_all(self.model.config());
        self.record_validation(gate)?;
        if let Err(e) = validate_config(self.model.config()) {
            let err = AppError::from(e);
            self.last_validation_error = Some(err.user_message());
            return Err(err);
        }

        self.view = SessionView::CompileStatus;
        self.affordance = CompileAffordance::Compiling;
        self.status_text = DEFAULT_STATUS_TEXT.to_string();
        self.progress = 0;
        self.sink.reset();

        let payload = self.payload();
        match self.supervisor.start(&payload).await {
            Ok(job_id) => {
                self.indicator = StatusIndicator::Running;
                log_parsed!("[Session] Compilation job {} started", job_id);
                Ok(job_id)
            }
            Err(e) => {
                self.view = SessionView::Summary;
                self.affordance = CompileAffordance::Ready;
                self.status_text.clear();
                let err = match e {
                    SupervisorError::Busy => AppError::from(SupervisorError::Busy),
                    SupervisorError::Rejected(reason) => {
                        AppError::Request(format!("启动编译失败: {}", reason))
                    }
                    SupervisorError::Request(inner) => {
                        AppError::Request(format!("启动编译失败: {}", inner))
                    }
                };
                self.reporter.error(err.user_message());
                Err(err)
            }
        }
    }

    /// Clear the log view (client side only).
    pub fn clear_logs(&mut self) {
        self.sink.clear();
    }

    pub fn toggle_auto_scroll(&mut self) -> bool {
        self.sink.toggle_auto_scroll()
    }

    /// Fetch the server's stored log history.
    pub async fn fetch_log_history(&mut self) -> Result<Vec<LogEvent>, AppError> {
        self.backend.fetch_logs().await.map_err(|e| {
            let err = AppError::Request(format!("获取日志失败: {}", e));
            self.reporter.error(err.user_message());
            err
        })
    }

    /// Clear the server's stored log history.
    pub async fn clear_server_logs(&mut self) -> Result<(), AppError> {
        match self.backend.clear_logs().await {
            Ok(()) => {
                self.reporter.success("服务器日志已清空");
                Ok(())
            }
            Err(e) => {
                let err = AppError::Request(format!("清空日志失败: {}", e));
                self.reporter.error(err.user_message());
                Err(err)
            }
        }
    }

    // ---- supervisor events ----

    pub async fn next_event(&mut self) -> Option<SupervisorEvent> {
        self.supervisor.next_event().await
    }

    /// Apply one supervisor event and reconcile the view state.
    pub fn handle_event(&mut self, event: SupervisorEvent) -> SessionUpdate {
        let update = self.supervisor.handle_event(event, &mut self.sink);
        match &update {
            SessionUpdate::Progress(status) => {
                self.status_text = if status.status.is_empty() {
                    DEFAULT_STATUS_TEXT.to_string()
                } else {
                    status.status.clone()
                };
                self.progress = status.progress.min(100);
                self.indicator = if status.running {
                    StatusIndicator::Running
                } else {
                    StatusIndicator::Idle
                };
            }
            SessionUpdate::Finished(outcome) => {
                if !outcome.status.status.is_empty() {
                    self.status_text = outcome.status.status.clone();
                }
                self.progress = outcome.status.progress.min(100);
                self.view = SessionView::Summary;
                log_parsed!(
                    "[Session] Compilation job {} finished: {}",
                    outcome.job_id,
                    outcome.message()
                );
                if outcome.success {
                    self.affordance = CompileAffordance::Succeeded;
                    self.indicator = StatusIndicator::Success;
                    self.reporter.success(outcome.message());
                } else {
                    self.affordance = CompileAffordance::Failed;
                    self.indicator = StatusIndicator::Error;
                    self.reporter.error(outcome.message());
                }
            }
            SessionUpdate::StreamNotice(message) => {
                log::debug!("[Session] stream notice: {}", message);
            }
            SessionUpdate::LogAppended | SessionUpdate::Dropped => {}
        }
        update
    }

    /// Apply every event already queued; returns how many were handled.
    pub fn pump_events(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.supervisor.try_next_event() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    pub fn shutdown(&mut self) {
        self.supervisor.shutdown();
    }
}
