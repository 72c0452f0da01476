// ABOUTME: State machine of one pipeline run.
// ABOUTME: Pending, Running(stage), then Aborted or Completed, which are terminal.

use serde::Serialize;
use std::fmt;

use super::stage::Stage;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PipelineState {
    Pending,
    Running { stage: Stage },
    Aborted { stage: Stage, reason: String },
    Completed,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineState::Aborted { .. } | PipelineState::Completed
        )
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, PipelineState::Completed)
    }

    /// Pending or Running(previous) -> Running(stage). Ignored once terminal.
    pub fn enter(&mut self, stage: Stage) {
        if self.is_terminal() {
            tracing::warn!(state = %self, %stage, "ignoring stage start on finished pipeline");
            return;
        }
        tracing::info!(%stage, "stage started");
        *self = PipelineState::Running { stage };
    }

    /// Running(stage) -> Aborted. Only a running pipeline can abort.
    pub fn abort(&mut self, reason: impl Into<String>) {
        if let PipelineState::Running { stage } = *self {
            let reason = reason.into();
            tracing::warn!(%stage, %reason, "pipeline aborted");
            *self = PipelineState::Aborted { stage, reason };
        }
    }

    /// Pending or Running -> Completed.
    pub fn complete(&mut self) {
        if !self.is_terminal() {
            tracing::info!("pipeline completed");
            *self = PipelineState::Completed;
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Pending => write!(f, "pending"),
            PipelineState::Running { stage } => write!(f, "running {}", stage),
            PipelineState::Aborted { stage, reason } => {
                write!(f, "aborted at {}: {}", stage, reason)
            }
            PipelineState::Completed => write!(f, "completed"),
        }
    }
}
