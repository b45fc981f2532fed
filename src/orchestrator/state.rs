//! Compilation job state and phase tracking.
//!
//! **Architecture**:
//! - `JobPhase`: discrete states of one server-side compilation
//! - `CompilationJob`: the singleton record mutated from status snapshots
//! - Transitions are applied by the supervisor's single consumer only

use std::time::SystemTime;

use crate::models::CompilationStatus;

/// Session-local job identifier, monotonic per supervisor.
pub type JobId = u64;

/// Lifecycle phase of a compilation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobPhase {
    /// Start request sent, not yet accepted
    Submitting,
    /// Accepted; monitoring channels are open
    Running,
    /// Terminal: server reported success
    Succeeded,
    /// Terminal: server reported failure
    Failed,
}

impl JobPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobPhase::Submitting => "submitting",
            JobPhase::Running => "running",
            JobPhase::Succeeded => "succeeded",
            JobPhase::Failed => "failed",
        }
    }

    pub fn valid_next_phases(&self) -> &'static [JobPhase] {
        match self {
            JobPhase::Submitting => &[JobPhase::Running, JobPhase::Failed],
            JobPhase::Running => &[JobPhase::Succeeded, JobPhase::Failed],
            JobPhase::Succeeded | JobPhase::Failed => &[],
        }
    }

    pub fn can_transition_to(&self, next: JobPhase) -> bool {
        self.valid_next_phases().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobPhase::Succeeded | JobPhase::Failed)
    }
}

/// The one compilation job of a session.
#[derive(Debug, Clone)]
pub struct CompilationJob {
    pub id: JobId,
    pub phase: JobPhase,
    /// Status label from the last snapshot
    pub status: String,
    /// Progress percentage (0-100)
    pub progress: u32,
    pub running: bool,
    pub success: bool,
    pub error: Option<String>,
    pub start_time: SystemTime,
    pub last_update_time: SystemTime,
}

impl CompilationJob {
    pub fn new(id: JobId) -> Self {
        let now = SystemTime::now();
        CompilationJob {
            id,
            phase: JobPhase::Submitting,
            status: String::new(),
            progress: 0,
            running: false,
            success: false,
            error: None,
            start_time: now,
            last_update_time: now,
        }
    }

    pub fn transition_to(&mut self, next: JobPhase) -> Result<(), String> {
        if !self.phase.can_transition_to(next) {
            return Err(format!(
                "Invalid job transition: {} -> {}",
                self.phase.as_str(),
                next.as_str()
            ));
        }
        self.phase = next;
        self.last_update_time = SystemTime::now();
        Ok(())
    }

    pub fn set_progress(&mut self, percent: u32) {
        self.progress = percent.min(100);
        self.last_update_time = SystemTime::now();
    }

    /// Merge a status snapshot. Returns true if the snapshot is terminal.
    pub fn apply_status(&mut self, status: &CompilationStatus) -> bool {
        self.status = status.status.clone();
        self.set_progress(status.progress);
        self.running = status.running;
        self.success = status.success;
        self.error = status.error.clone();

        if status.running {
            return false;
        }
        let terminal = if status.success {
            JobPhase::Succeeded
        } else {
            JobPhase::Failed
        };
        if let Err(e) = self.transition_to(terminal) {
            log::warn!("[Supervisor] job {}: {}", self.id, e);
        }
        true
    }

    pub fn is_active(&self) -> bool {
        !self.phase.is_terminal()
    }
}
