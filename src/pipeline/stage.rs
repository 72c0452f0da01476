// ABOUTME: Pipeline stages and their tagged outcomes.
// ABOUTME: A stage passes, fails with a reason, or is skipped with a reason.

use serde::Serialize;
use std::fmt;
use std::time::Duration;

use super::error::StageErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Targeted apply of pre-existing infrastructure the scenario depends on.
    Prerequisites,
    Validate,
    Plan,
    Apply,
    VerifyOutputs,
    VerifyClusterState,
    /// Conditional on the caller being inside an authorized range.
    VerifyConnectivity,
    VerifyDns,
    VerifyMonitoring,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Prerequisites => "prerequisites",
            Stage::Validate => "validate",
            Stage::Plan => "plan",
            Stage::Apply => "apply",
            Stage::VerifyOutputs => "verify-outputs",
            Stage::VerifyClusterState => "verify-cluster-state",
            Stage::VerifyConnectivity => "verify-connectivity",
            Stage::VerifyDns => "verify-dns",
            Stage::VerifyMonitoring => "verify-monitoring",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "reason", rename_all = "snake_case")]
pub enum StageResult {
    Passed,
    Failed(String),
    Skipped(String),
}

impl StageResult {
    /// Whether the pipeline may move on to the next stage.
    pub fn is_continuable(&self) -> bool {
        !matches!(self, StageResult::Failed(_))
    }
}

impl fmt::Display for StageResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageResult::Passed => write!(f, "passed"),
            StageResult::Failed(reason) => write!(f, "failed: {}", reason),
            StageResult::Skipped(reason) => write!(f, "skipped: {}", reason),
        }
    }
}

/// One executed stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageRecord {
    pub stage: Stage,
    #[serde(flatten)]
    pub result: StageResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<StageErrorKind>,
    #[serde(with = "humantime_serde")]
    pub elapsed: Duration,
}
