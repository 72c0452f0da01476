// ABOUTME: Stage error types with SNAFU pattern.
// ABOUTME: Wraps driver, verification, management API and connectivity failures for one stage.

use serde::Serialize;
use snafu::Snafu;

use crate::cluster::{ClusterApiError, ConnectivityError};
use crate::driver::{DriverError, PlanOutcome};
use crate::error::ConfigError;
use crate::retry::RetryExhausted;
use crate::verify::VerificationFailed;

/// Why a stage failed.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StageError {
    #[snafu(display("provisioning tool failed: {source}"))]
    Driver { source: DriverError },

    #[snafu(display("verification failed: {source}"))]
    Verification { source: VerificationFailed },

    #[snafu(display("management API call failed: {source}"))]
    ClusterApi { source: ClusterApiError },

    #[snafu(display("cluster unreachable: {source}"))]
    Connectivity {
        source: RetryExhausted<ConnectivityError>,
    },

    #[snafu(display("plan classified as {actual}, expected {expected}"))]
    PlanMismatch {
        expected: PlanOutcome,
        actual: PlanOutcome,
    },

    #[snafu(display("configuration is invalid ({errors} error(s)): {summary}"))]
    Invalid { errors: u32, summary: String },

    #[snafu(display("cannot bind prerequisite output: {source}"))]
    Binding { source: ConfigError },

    #[snafu(display("interrupted before the stage started"))]
    Interrupted,
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageErrorKind {
    /// The provisioning tool could not be run or exited unsuccessfully.
    ToolFailure,
    /// A requested output does not exist.
    OutputNotFound,
    /// An assertion over outputs or cluster state did not hold.
    Verification,
    /// The management API could not be queried.
    ClusterApi,
    /// Every connectivity attempt failed.
    ConnectivityExhausted,
    /// The plan classification differs from the pinned expectation.
    PlanMismatch,
    /// Validation reported errors.
    InvalidConfiguration,
    /// The run was cancelled by an interrupt.
    Interrupted,
}

impl StageError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> StageErrorKind {
        match self {
            StageError::Driver { source } => match source {
                DriverError::OutputNotFound(_) => StageErrorKind::OutputNotFound,
                _ => StageErrorKind::ToolFailure,
            },
            StageError::Verification { .. } => StageErrorKind::Verification,
            StageError::ClusterApi { .. } => StageErrorKind::ClusterApi,
            StageError::Connectivity { .. } => StageErrorKind::ConnectivityExhausted,
            StageError::PlanMismatch { .. } => StageErrorKind::PlanMismatch,
            StageError::Invalid { .. } => StageErrorKind::InvalidConfiguration,
            StageError::Binding { .. } => StageErrorKind::InvalidConfiguration,
            StageError::Interrupted => StageErrorKind::Interrupted,
        }
    }

    /// Raw exit status of the provisioning tool, if it ran and failed.
    pub fn exit_status(&self) -> Option<i32> {
        match self {
            StageError::Driver { source } => source.exit_status(),
            _ => None,
        }
    }
}

impl From<DriverError> for StageError {
    fn from(source: DriverError) -> Self {
        StageError::Driver { source }
    }
}

impl From<ConfigError> for StageError {
    fn from(source: ConfigError) -> Self {
        StageError::Binding { source }
    }
}

impl From<VerificationFailed> for StageError {
    fn from(source: VerificationFailed) -> Self {
        StageError::Verification { source }
    }
}

impl From<ClusterApiError> for StageError {
    fn from(source: ClusterApiError) -> Self {
        StageError::ClusterApi { source }
    }
}

impl From<RetryExhausted<ConnectivityError>> for StageError {
    fn from(source: RetryExhausted<ConnectivityError>) -> Self {
        StageError::Connectivity { source }
    }
}
