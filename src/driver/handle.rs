// ABOUTME: Deployment handle binding one request to its working directory.
// ABOUTME: Tracks whether provisioning state may exist so teardown knows what to do.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use crate::config::Credentials;
use crate::error::ConfigError;
use crate::request::{DeploymentRequest, InputValue};
use crate::types::ClusterName;

/// Directory the provisioning tool runs in.
#[derive(Debug)]
pub struct WorkDir {
    dir: PathBuf,
    // Keeps the scratch tree alive; removed when the last reference drops.
    scratch: Option<TempDir>,
}

impl WorkDir {
    /// Use an existing directory as is. Nothing is removed afterwards.
    pub fn fixed(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            scratch: None,
        }
    }

    /// A scratch tree rooted at `scratch`, running the tool in `dir` inside it.
    pub fn scratch(scratch: TempDir, dir: PathBuf) -> Self {
        Self {
            dir,
            scratch: Some(scratch),
        }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn is_scratch(&self) -> bool {
        self.scratch.is_some()
    }
}

/// Whether an apply has ever run against the handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyState {
    NotAttempted,
    /// Attempted but never succeeded; partial state may exist.
    Attempted,
    Succeeded,
}

/// Live binding between a request and its provisioned state.
///
/// Created by `Provisioner::init` and torn down by `Provisioner::destroy`.
#[derive(Debug)]
pub struct DeploymentHandle {
    request: DeploymentRequest,
    workdir: Arc<WorkDir>,
    apply_state: ApplyState,
}

impl DeploymentHandle {
    pub fn new(request: DeploymentRequest, workdir: WorkDir) -> Self {
        Self {
            request,
            workdir: Arc::new(workdir),
            apply_state: ApplyState::NotAttempted,
        }
    }

    pub fn request(&self) -> &DeploymentRequest {
        &self.request
    }

    pub fn scenario(&self) -> &str {
        &self.request.scenario
    }

    pub fn cluster_name(&self) -> &ClusterName {
        &self.request.cluster_name
    }

    pub fn credentials(&self) -> &Credentials {
        &self.request.credentials
    }

    pub fn dir(&self) -> &Path {
        self.workdir.path()
    }

    /// Bind an input after init, e.g. from prerequisite outputs.
    pub fn bind_input(&mut self, name: &str, value: InputValue) -> Result<(), ConfigError> {
        self.request.inputs.set(name, value)
    }

    pub fn apply_state(&self) -> ApplyState {
        self.apply_state
    }

    /// Record the result of an apply. A success is never downgraded.
    pub fn record_apply(&mut self, succeeded: bool) {
        self.apply_state = match (self.apply_state, succeeded) {
            (_, true) | (ApplyState::Succeeded, false) => ApplyState::Succeeded,
            (_, false) => ApplyState::Attempted,
        };
    }

    /// Whether destroy has anything to tear down.
    pub fn needs_teardown(&self) -> bool {
        self.apply_state != ApplyState::NotAttempted
    }

    /// Copy used only by the teardown guard when it must destroy from a
    /// background task. Shares the working directory.
    pub(crate) fn detach_for_teardown(&self) -> Self {
        Self {
            request: self.request.clone(),
            workdir: Arc::clone(&self.workdir),
            apply_state: self.apply_state,
        }
    }
}
