// ABOUTME: Deployment driver abstraction over the external provisioning tool.
// ABOUTME: Defines the Provisioner trait, its result types and plan exit classification.

mod error;
mod guard;
mod handle;
mod terraform;
mod workdir;

pub use error::DriverError;
pub use guard::{Guarded, TeardownGuard, TeardownStatus, panic_message};
pub use handle::{ApplyState, DeploymentHandle, WorkDir};
pub use terraform::{DEFAULT_PROVIDER_VERSION, Terraform, VAR_FILE_NAME};
pub use workdir::{WRAPPER_OUTPUTS, prepare, render_wrapper};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::request::DeploymentRequest;
use crate::verify::{OutputSet, OutputValue};

/// Change classification reported by a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanOutcome {
    NoChanges,
    ChangesPending,
}

impl std::fmt::Display for PlanOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanOutcome::NoChanges => write!(f, "no changes"),
            PlanOutcome::ChangesPending => write!(f, "changes pending"),
        }
    }
}

/// Map the exit status of a detailed-exitcode plan onto a classification.
///
/// 0 means no changes and 2 means changes are pending. Anything else,
/// including termination by signal, is an error.
pub fn classify_plan_exit(status: Option<i32>, stderr: &str) -> Result<PlanOutcome, DriverError> {
    match status {
        Some(0) => Ok(PlanOutcome::NoChanges),
        Some(2) => Ok(PlanOutcome::ChangesPending),
        other => Err(DriverError::UnexpectedPlanExit {
            status: other,
            stderr: stderr.to_string(),
        }),
    }
}

/// Verdict of a syntactic/semantic check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub error_count: u32,
    pub warning_count: u32,
    /// One line per reported diagnostic.
    pub diagnostics: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplyResult {
    pub applied_at: DateTime<Utc>,
    pub success: bool,
    /// Resource addresses the apply was limited to. Empty for a full apply.
    pub targets: Vec<String>,
}

/// What a destroy call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TeardownOutcome {
    Destroyed,
    /// No apply was ever attempted, so there was nothing to remove.
    NotRequired,
}

/// Lifecycle operations of the provisioning tool.
///
/// Implementations must be safe to share between concurrently running
/// scenarios; all per-deployment state lives in the [`DeploymentHandle`].
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Prepare a working directory for the request's module.
    async fn init(&self, request: &DeploymentRequest) -> Result<DeploymentHandle, DriverError>;

    /// Dry check that does not touch remote state.
    async fn validate(&self, handle: &DeploymentHandle) -> Result<ValidationResult, DriverError>;

    async fn plan(&self, handle: &DeploymentHandle) -> Result<PlanOutcome, DriverError>;

    async fn apply(&self, handle: &mut DeploymentHandle) -> Result<ApplyResult, DriverError>;

    /// Apply only the given resource addresses.
    async fn apply_targets(
        &self,
        handle: &mut DeploymentHandle,
        targets: &[String],
    ) -> Result<ApplyResult, DriverError>;

    /// Tear down all materialized state. A no-op when no apply was attempted.
    async fn destroy(&self, handle: &DeploymentHandle) -> Result<TeardownOutcome, DriverError>;

    /// Fetch one named output.
    async fn output(&self, handle: &DeploymentHandle, name: &str)
    -> Result<OutputValue, DriverError>;

    /// Fetch every output. Never cached; each call reads current state.
    async fn outputs(&self, handle: &DeploymentHandle) -> Result<OutputSet, DriverError>;
}
