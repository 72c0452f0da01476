// ABOUTME: Error types for provisioning tool invocations.
// ABOUTME: Carries the raw exit status and captured diagnostics of failed commands.

/// Errors from driving the external provisioning tool.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// The tool could not be launched at all.
    #[error("failed to launch `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    /// The tool ran and exited unsuccessfully.
    #[error("`{command}` exited with status {status:?}: {stderr}")]
    Failed {
        command: String,
        status: Option<i32>,
        stderr: String,
    },

    /// Plan exited with a code other than 0 (no changes) or 2 (changes pending).
    #[error("plan exited with unexpected status {status:?}: {stderr}")]
    UnexpectedPlanExit { status: Option<i32>, stderr: String },

    /// A named output does not exist in the deployment state.
    #[error("output not found: {0}")]
    OutputNotFound(String),

    /// An output exists but has an unsupported shape.
    #[error("output '{name}' is malformed: {reason}")]
    MalformedOutput { name: String, reason: String },

    /// The scratch working directory could not be prepared.
    #[error("failed to prepare working directory: {0}")]
    WorkDir(#[from] std::io::Error),
}

impl DriverError {
    /// Raw exit status of the failed command, if it ran.
    pub fn exit_status(&self) -> Option<i32> {
        match self {
            DriverError::Failed { status, .. } | DriverError::UnexpectedPlanExit { status, .. } => {
                *status
            }
            _ => None,
        }
    }

    /// Captured diagnostic text of the failed command, if any.
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            DriverError::Failed { stderr, .. } | DriverError::UnexpectedPlanExit { stderr, .. } => {
                Some(stderr)
            }
            _ => None,
        }
    }
}
