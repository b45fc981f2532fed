//! Nine-step configuration wizard.
//!
//! A linear state machine over [`WizardStep`]. Forward movement is gated by
//! the per-step validation predicate; backward movement never is. Reaching the
//! summary step recomputes the summary from the live configuration.

pub mod summary;

use std::fmt;

use crate::error::WizardError;
use crate::models::Configuration;
pub use summary::{format_list, ConfigSummary};

/// One page of the wizard, numbered 1..=9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WizardStep {
    Preset = 1,
    Decoders = 2,
    Encoders = 3,
    Muxers = 4,
    Demuxers = 5,
    Protocols = 6,
    Filters = 7,
    BuildOptions = 8,
    Summary = 9,
}

impl WizardStep {
    pub const ALL: [WizardStep; 9] = [
        WizardStep::Preset,
        WizardStep::Decoders,
        WizardStep::Encoders,
        WizardStep::Muxers,
        WizardStep::Demuxers,
        WizardStep::Protocols,
        WizardStep::Filters,
        WizardStep::BuildOptions,
        WizardStep::Summary,
    ];

    pub const FIRST: WizardStep = WizardStep::Preset;
    pub const LAST: WizardStep = WizardStep::Summary;

    pub fn ordinal(&self) -> u8 {
        *self as u8
    }

    pub fn from_ordinal(n: u8) -> Option<WizardStep> {
        Self::ALL.get(usize::from(n).checked_sub(1)?).copied()
    }

    pub fn title(&self) -> &'static str {
        match self {
            WizardStep::Preset => "预设选择",
            WizardStep::Decoders => "解码器",
            WizardStep::Encoders => "编码器",
            WizardStep::Muxers => "复用器",
            WizardStep::Demuxers => "解复用器",
            WizardStep::Protocols => "网络协议",
            WizardStep::Filters => "滤镜",
            WizardStep::BuildOptions => "优化配置",
            WizardStep::Summary => "确认并编译",
        }
    }

    fn next(&self) -> WizardStep {
        Self::from_ordinal(self.ordinal() + 1).unwrap_or(Self::LAST)
    }

    fn previous(&self) -> WizardStep {
        Self::from_ordinal(self.ordinal().saturating_sub(1)).unwrap_or(Self::FIRST)
    }

    /// Gate that must hold before leaving this step forward.
    pub fn validate(&self, config: &Configuration) -> Result<(), WizardError> {
        let reason = match self {
            WizardStep::Preset if config.preset.trim().is_empty() => "请选择一个配置预设",
            WizardStep::Decoders if config.decoders.is_empty() => "请至少选择一个解码器",
            WizardStep::Demuxers if config.demuxers.is_empty() => "请至少选择一个解复用器",
            WizardStep::BuildOptions if config.architectures.is_empty() => "请至少选择一个目标架构",
            _ => return Ok(()),
        };
        Err(WizardError::ValidationFailed {
            step: self.ordinal(),
            reason: reason.to_string(),
        })
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {}", self.ordinal(), self.title())
    }
}

/// Projection of a step in the step indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    Completed,
    Active,
    Pending,
}

/// What the forward control does on the current step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryAction {
    Next,
    Compile,
}

#[derive(Debug, Clone)]
pub struct WizardController {
    current: WizardStep,
    summary: Option<ConfigSummary>,
}

impl Default for WizardController {
    fn default() -> Self {
        Self::new()
    }
}

impl WizardController {
    pub fn new() -> Self {
        WizardController {
            current: WizardStep::FIRST,
            summary: None,
        }
    }

    pub fn current_step(&self) -> WizardStep {
        self.current
    }

    /// Summary computed the last time the summary step was entered.
    pub fn summary(&self) -> Option<&ConfigSummary> {
        self.summary.as_ref()
    }

    /// Advance one step if the current step's gate passes.
    ///
    /// On the last step this is a no-op.
    pub fn next(&mut self, config: &Configuration) -> Result<WizardStep, WizardError> {
        if self.current == WizardStep::LAST {
            return Ok(self.current);
        }
        self.current.validate(config)?;
        self.enter(self.current.next(), config);
        Ok(self.current)
    }

    pub fn previous(&mut self) -> WizardStep {
        self.current = self.current.previous();
        self.current
    }

    /// Jump to step `n`.
    ///
    /// Backward jumps are free, a forward jump only reaches the immediate
    /// next step and passes the same gate as [`next`](Self::next).
    pub fn goto(&mut self, n: u8, config: &Configuration) -> Result<WizardStep, WizardError> {
        let target = WizardStep::from_ordinal(n).ok_or(WizardError::InvalidStep(n))?;

        if target <= self.current {
            self.enter(target, config);
            return Ok(self.current);
        }
        if target.ordinal() != self.current.ordinal() + 1 {
            return Err(WizardError::JumpNotAllowed {
                from: self.current.ordinal(),
                to: n,
            });
        }
        self.next(config)
    }

    /// Check every gate in step order, reporting the first failure.
    pub fn validate_all(&self, config: &Configuration) -> Result<(), WizardError> {
        WizardStep::ALL.iter().try_for_each(|step| step.validate(config))
    }

    /// Recompute the summary from the live configuration.
    pub fn refresh_summary(&mut self, config: &Configuration) {
        self.summary = Some(ConfigSummary::from_config(config));
    }

    pub fn step_states(&self) -> Vec<(WizardStep, StepState)> {
        WizardStep::ALL
            .iter()
            .map(|&step| {
                let state = if step < self.current {
                    StepState::Completed
                } else if step == self.current {
                    StepState::Active
                } else {
                    StepState::Pending
                };
                (step, state)
            })
            .collect()
    }

    pub fn can_go_back(&self) -> bool {
        self.current != WizardStep::FIRST
    }

    pub fn primary_action(&self) -> PrimaryAction {
        if self.current == WizardStep::LAST {
            PrimaryAction::Compile
        } else {
            PrimaryAction::Next
        }
    }

    fn enter(&mut self, step: WizardStep, config: &Configuration) {
        if step != self.current {
            log::debug!("[Wizard] {} -> {}", self.current, step);
        }
        self.current = step;
        if step == WizardStep::Summary {
            self.refresh_summary(config);
        }
    }
}
