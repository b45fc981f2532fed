//! Compilation session supervisor: start, dual-channel monitoring, termination.
//!
//! One job at a time. After the backend accepts a start request, two producer
//! tasks are spawned for the job:
//!
//! - the event-stream task forwards log lines (`stream`)
//! - the status-poll task pulls job snapshots (`poll`)
//!
//! Both only perform I/O and send job-tagged [`SupervisorEvent`]s into one
//! channel. [`CompilationSupervisor::handle_event`] is the single consumer and
//! the only place job state and the log sink change.

pub mod poll;
pub mod state;
pub mod stream;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

pub use state::{CompilationJob, JobId, JobPhase};

use crate::backend::BackendApi;
use crate::config::ConfigPayload;
use crate::error::{BackendError, SupervisorError};
use crate::models::{CompilationStatus, LogEvent};
use crate::ui::log_sink::LogSink;

/// Capacity of the producer -> consumer channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Message from a monitoring task to the consumer.
#[derive(Debug, Clone)]
pub enum SupervisorEvent {
    /// A compile log line from the event stream
    Log { job_id: JobId, event: LogEvent },
    /// The event-stream subscription failed; it will be re-opened
    StreamNotice { job_id: JobId, message: String },
    /// A status snapshot from the poll task
    Status { job_id: JobId, status: CompilationStatus },
}

impl SupervisorEvent {
    pub fn job_id(&self) -> JobId {
        match self {
            SupervisorEvent::Log { job_id, .. }
            | SupervisorEvent::StreamNotice { job_id, .. }
            | SupervisorEvent::Status { job_id, .. } => *job_id,
        }
    }
}

/// Result of a finished job, produced exactly once per job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    pub job_id: JobId,
    pub success: bool,
    pub error: Option<String>,
    pub status: CompilationStatus,
}

impl SessionOutcome {
    /// Notification text shown for this outcome.
    pub fn message(&self) -> String {
        if self.success {
            "FFmpeg编译完成！".to_string()
        } else {
            format!(
                "编译失败: {}",
                self.error.as_deref().filter(|e| !e.is_empty()).unwrap_or("未知错误")
            )
        }
    }
}

/// What handling one event changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    /// Stale or post-termination event; nothing changed
    Dropped,
    /// A line was appended to the log sink
    LogAppended,
    /// The stream reported a transport problem
    StreamNotice(String),
    /// A running snapshot was merged into the job
    Progress(CompilationStatus),
    /// The job reached a terminal state
    Finished(SessionOutcome),
}

/// Wait until the cancel signal is raised or its sender is gone.
pub(crate) async fn cancelled(cancel_rx: &mut watch::Receiver<bool>) {
    loop {
        let raised = *cancel_rx.borrow();
        if raised {
            return;
        }
        if cancel_rx.changed().await.is_err() {
            return;
        }
    }
}

/// Cancellation handle for the two monitoring tasks of one job.
struct MonitorHandle {
    job_id: JobId,
    cancel_tx: watch::Sender<bool>,
    stream_task: JoinHandle<()>,
    poll_task: JoinHandle<()>,
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        let _ = self.cancel_tx.send(true);
        self.stream_task.abort();
        self.poll_task.abort();
        log::debug!("[Supervisor] job {}: monitoring closed", self.job_id);
    }
}

/// Owner of the active-job flag and all monitoring channels.
pub struct CompilationSupervisor {
    backend: Arc<dyn BackendApi>,
    poll_interval: Duration,
    events_tx: mpsc::Sender<SupervisorEvent>,
    events_rx: mpsc::Receiver<SupervisorEvent>,
    last_job_id: JobId,
    job: Option<CompilationJob>,
    monitor: Option<MonitorHandle>,
}

impl CompilationSupervisor {
    pub fn new(backend: Arc<dyn BackendApi>, poll_interval: Duration) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        CompilationSupervisor {
            backend,
            poll_interval,
            events_tx,
            events_rx,
            last_job_id: 0,
            job: None,
            monitor: None,
        }
    }

    /// Whether a job is submitting or running.
    pub fn is_active(&self) -> bool {
        self.job.as_ref().map_or(false, CompilationJob::is_active)
    }

    pub fn job(&self) -> Option<&CompilationJob> {
        self.job.as_ref()
    }

    /// Whether monitoring tasks are currently open.
    pub fn is_monitoring(&self) -> bool {
        self.monitor.is_some()
    }

    /// Submit `payload` and open both monitoring channels on acceptance.
    ///
    /// While a job is active this returns [`SupervisorError::Busy`] without
    /// contacting the backend.
    pub async fn start(&mut self, payload: &ConfigPayload) -> Result<JobId, SupervisorError> {
        if self.is_active() {
            log::warn!("[Supervisor] start requested while a job is active");
            return Err(SupervisorError::Busy);
        }

        self.close_monitor();

        self.last_job_id += 1;
        let job_id = self.last_job_id;
        self.job = Some(CompilationJob::new(job_id));
        log::info!("[Supervisor] job {}: submitting compilation", job_id);

        if let Err(e) = self.backend.start_compilation(payload).await {
            self.job = None;
            log::error!("[Supervisor] job {}: 启动编译失败: {}", job_id, e);
            return Err(match e {
                BackendError::Rejected(reason) => SupervisorError::Rejected(reason),
                other => SupervisorError::Request(other),
            });
        }

        if let Some(job) = self.job.as_mut() {
            if let Err(e) = job.transition_to(JobPhase::Running) {
                log::warn!("[Supervisor] job {}: {}", job_id, e);
            }
        }
        self.open_monitor(job_id);
        log::info!("[Supervisor] job {}: accepted, monitoring started", job_id);
        Ok(job_id)
    }

    fn open_monitor(&mut self, job_id: JobId) {
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let stream_task = tokio::spawn(stream::run_log_stream(
            job_id,
            Arc::clone(&self.backend),
            self.events_tx.clone(),
            cancel_rx.clone(),
        ));
        let poll_task = tokio::spawn(poll::run_status_poll(
            job_id,
            Arc::clone(&self.backend),
            self.poll_interval,
            self.events_tx.clone(),
            cancel_rx,
        ));

        self.monitor = Some(MonitorHandle {
            job_id,
            cancel_tx,
            stream_task,
            poll_task,
        });
    }

    fn close_monitor(&mut self) {
        self.monitor = None;
    }

    /// Wait for the next event from the monitoring tasks.
    pub async fn next_event(&mut self) -> Option<SupervisorEvent> {
        self.events_rx.recv().await
    }

    /// Non-blocking variant of [`next_event`](Self::next_event).
    pub fn try_next_event(&mut self) -> Option<SupervisorEvent> {
        self.events_rx.try_recv().ok()
    }

    /// Apply one event. Single consumer of the monitoring channel.
    pub fn handle_event(&mut self, event: SupervisorEvent, sink: &mut LogSink) -> SessionUpdate {
        let event_job = event.job_id();
        let job = match self.job.as_mut() {
            Some(job) if job.id == event_job && job.phase == JobPhase::Running => job,
            _ => {
                log::debug!("[Supervisor] dropping event for inactive job {}", event_job);
                return SessionUpdate::Dropped;
            }
        };

        match event {
            SupervisorEvent::Log { event, .. } => {
                sink.append(event);
                SessionUpdate::LogAppended
            }
            SupervisorEvent::StreamNotice { message, .. } => SessionUpdate::StreamNotice(message),
            SupervisorEvent::Status { status, .. } => {
                if !job.apply_status(&status) {
                    return SessionUpdate::Progress(status);
                }
                let outcome = SessionOutcome {
                    job_id: job.id,
                    success: job.success,
                    error: job.error.clone(),
                    status,
                };
                log::info!(
                    "[Supervisor] job {}: finished (success={})",
                    outcome.job_id,
                    outcome.success
                );
                self.close_monitor();
                SessionUpdate::Finished(outcome)
            }
        }
    }

    /// Cancel every monitoring task.
    pub fn shutdown(&mut self) {
        if self.monitor.is_some() {
            log::info!("[Supervisor] shutting down monitoring");
        }
        self.close_monitor();
    }
}

impl Drop for CompilationSupervisor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
