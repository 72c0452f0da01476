// ABOUTME: Scoped teardown guard that destroys a deployment on every exit path.
// ABOUTME: Runs destroy exactly once after the guarded body, even if it fails or panics.

use futures::FutureExt;
use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use super::handle::DeploymentHandle;
use super::{Provisioner, TeardownOutcome};

/// Result of the teardown step, reported alongside the pipeline outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum TeardownStatus {
    NotRequired,
    Destroyed,
    Failed(String),
}

impl TeardownStatus {
    pub fn succeeded(&self) -> bool {
        !matches!(self, TeardownStatus::Failed(_))
    }
}

impl fmt::Display for TeardownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeardownStatus::NotRequired => write!(f, "teardown not required"),
            TeardownStatus::Destroyed => write!(f, "teardown succeeded"),
            TeardownStatus::Failed(reason) => write!(f, "teardown FAILED: {}", reason),
        }
    }
}

/// How the guarded body ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guarded<T> {
    Finished(T),
    /// The body panicked. Carries the panic message.
    Panicked(String),
}

/// Best-effort text of a caught panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Owns a [`DeploymentHandle`] from the moment init returns until destroy
/// has completed or been found unnecessary.
///
/// Dropping an armed guard (for example when the owning task is cancelled)
/// schedules destroy on the current tokio runtime.
pub struct TeardownGuard {
    provisioner: Arc<dyn Provisioner>,
    handle: DeploymentHandle,
    armed: bool,
}

impl TeardownGuard {
    pub fn new(provisioner: Arc<dyn Provisioner>, handle: DeploymentHandle) -> Self {
        tracing::debug!(scenario = handle.scenario(), "teardown guard armed");
        Self {
            provisioner,
            handle,
            armed: true,
        }
    }

    pub fn handle(&self) -> &DeploymentHandle {
        &self.handle
    }

    /// Run `body` against the handle, then tear down.
    ///
    /// A panic inside `body` is caught and returned as
    /// [`Guarded::Panicked`] after teardown, so it never unwinds through
    /// sibling scenarios polled on the same task.
    pub async fn run<T>(
        mut self,
        body: impl AsyncFnOnce(&mut DeploymentHandle) -> T,
    ) -> (Guarded<T>, TeardownStatus) {
        let result = AssertUnwindSafe(body(&mut self.handle))
            .catch_unwind()
            .await;

        let scenario = self.handle.scenario().to_string();
        let status = self.teardown().await;

        match result {
            Ok(value) => (Guarded::Finished(value), status),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(
                    scenario = %scenario,
                    %status,
                    panic = %message,
                    "pipeline panicked; teardown already ran"
                );
                (Guarded::Panicked(message), status)
            }
        }
    }

    /// Destroy now and disarm. Destroy is never attempted twice.
    pub async fn teardown(mut self) -> TeardownStatus {
        self.armed = false;

        match self.provisioner.destroy(&self.handle).await {
            Ok(TeardownOutcome::Destroyed) => {
                tracing::info!(scenario = self.handle.scenario(), "teardown complete");
                TeardownStatus::Destroyed
            }
            Ok(TeardownOutcome::NotRequired) => TeardownStatus::NotRequired,
            Err(e) => {
                tracing::error!(
                    scenario = self.handle.scenario(),
                    cluster = %self.handle.cluster_name(),
                    error = %e,
                    "teardown failed; resources may remain"
                );
                TeardownStatus::Failed(e.to_string())
            }
        }
    }
}

impl Drop for TeardownGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.armed = false;

        let handle = self.handle.detach_for_teardown();
        let provisioner = Arc::clone(&self.provisioner);

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                tracing::warn!(
                    scenario = handle.scenario(),
                    "scenario interrupted; destroying in background"
                );
                runtime.spawn(async move {
                    if let Err(e) = provisioner.destroy(&handle).await {
                        tracing::error!(
                            scenario = handle.scenario(),
                            cluster = %handle.cluster_name(),
                            error = %e,
                            "background teardown failed; resources may remain"
                        );
                    }
                });
            }
            Err(_) => {
                tracing::error!(
                    scenario = handle.scenario(),
                    cluster = %handle.cluster_name(),
                    "no runtime available for teardown; resources may remain"
                );
            }
        }
    }
}
