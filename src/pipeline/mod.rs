// ABOUTME: Staged verification pipeline run against one deployment.
// ABOUTME: Options, run results and re-exports of stages, state and errors.

mod error;
mod orchestrator;
mod stage;
mod state;

pub use error::{StageError, StageErrorKind};
pub use orchestrator::Pipeline;
pub use stage::{Stage, StageRecord, StageResult};
pub use state::PipelineState;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::driver::PlanOutcome;
use crate::retry::RetryPolicy;
use crate::verify::Expectations;

/// Which part of the lifecycle to exercise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PipelineMode {
    /// Validate, plan, apply and verify.
    #[default]
    Full,
    /// Validate and plan only. Nothing is created.
    Plan,
    /// Validate only.
    Validate,
}

/// Pre-existing infrastructure a scenario provisions before the main apply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrerequisiteSetup {
    /// Resource addresses for the targeted apply.
    pub targets: Vec<String>,
    /// Request input name -> output name read after the targeted apply.
    #[serde(default)]
    pub bind: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub mode: PipelineMode,
    /// Pin the plan classification. Without it both classifications pass.
    pub expect_plan: Option<PlanOutcome>,
    pub setup: Option<PrerequisiteSetup>,
    pub expectations: Expectations,
    pub connectivity_retry: RetryPolicy,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            mode: PipelineMode::Full,
            expect_plan: None,
            setup: None,
            expectations: Expectations::default(),
            connectivity_retry: RetryPolicy::connectivity(),
        }
    }
}

/// Final state and per-stage records of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineRun {
    pub state: PipelineState,
    pub stages: Vec<StageRecord>,
}

impl PipelineRun {
    pub fn is_completed(&self) -> bool {
        self.state.is_completed()
    }

    pub fn record(&self, stage: Stage) -> Option<&StageRecord> {
        self.stages.iter().find(|r| r.stage == stage)
    }

    /// Whether `stage` was attempted at all.
    pub fn ran(&self, stage: Stage) -> bool {
        self.record(stage).is_some()
    }
}
