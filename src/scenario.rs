// ABOUTME: Per-scenario runner and concurrent suite runner.
// ABOUTME: Builds the request, initialises the deployment and runs the pipeline under a teardown guard.

use futures::FutureExt;
use futures::future::join_all;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::cluster::{ClusterApi, ConnectivityProbe};
use crate::config::Credentials;
use crate::driver::{Guarded, Provisioner, TeardownGuard, TeardownStatus, panic_message};
use crate::pipeline::{Pipeline, PipelineOptions};
use crate::precondition::PreconditionChecker;
use crate::report::{ScenarioReport, SuiteReport};
use crate::request::{self, RequestTemplate};

/// Stage label used when a scenario never reached the pipeline.
pub const CONFIGURATION_STAGE: &str = "configuration";
pub const INIT_STAGE: &str = "init";
/// Stage label for a panic that escaped the pipeline's own stage records.
pub const PIPELINE_STAGE: &str = "pipeline";

/// One scenario ready to run: its overrides on top of the suite base and the
/// pipeline settings that apply to it.
#[derive(Debug, Clone)]
pub struct ScenarioPlan {
    pub name: String,
    pub overrides: RequestTemplate,
    pub options: PipelineOptions,
}

impl ScenarioPlan {
    pub fn new(name: impl Into<String>, overrides: RequestTemplate) -> Self {
        Self {
            name: name.into(),
            overrides,
            options: PipelineOptions::default(),
        }
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }
}

/// Shared collaborators for every scenario in a suite.
///
/// Each scenario gets its own request, handle and working directory; only
/// the stateless collaborators are shared.
#[derive(Clone)]
pub struct SuiteRunner {
    provisioner: Arc<dyn Provisioner>,
    cluster_api: Arc<dyn ClusterApi>,
    connectivity: Arc<dyn ConnectivityProbe>,
    precondition: Arc<PreconditionChecker>,
    credentials: Credentials,
    base: RequestTemplate,
    work_root: Option<PathBuf>,
    cancel: CancellationToken,
}

impl SuiteRunner {
    pub fn new(
        provisioner: Arc<dyn Provisioner>,
        cluster_api: Arc<dyn ClusterApi>,
        connectivity: Arc<dyn ConnectivityProbe>,
        precondition: Arc<PreconditionChecker>,
        credentials: Credentials,
    ) -> Self {
        Self {
            provisioner,
            cluster_api,
            connectivity,
            precondition,
            credentials,
            base: RequestTemplate::default(),
            work_root: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Template every scenario's overrides are layered onto.
    pub fn with_base(mut self, base: RequestTemplate) -> Self {
        self.base = base;
        self
    }

    /// Parent directory for scratch working directories.
    pub fn with_work_root(mut self, root: Option<PathBuf>) -> Self {
        self.work_root = root;
        self
    }

    /// Interrupt every scenario at its next stage boundary once `cancel`
    /// fires. Teardown still runs for each initialised deployment.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run one scenario to completion, including teardown.
    ///
    /// Configuration errors are reported before anything external is
    /// touched. An init failure leaves nothing behind, so no teardown runs.
    /// Once init succeeds, destroy runs exactly once on every exit path.
    pub async fn run_scenario(&self, plan: &ScenarioPlan) -> ScenarioReport {
        tracing::info!(scenario = %plan.name, mode = ?plan.options.mode, "scenario started");

        let request = match request::build(
            &plan.name,
            &self.base,
            &plan.overrides,
            self.credentials.clone(),
        ) {
            Ok(request) => match &self.work_root {
                Some(root) => request.with_work_root(root),
                None => request,
            },
            Err(e) => {
                tracing::error!(scenario = %plan.name, error = %e, "invalid scenario configuration");
                return ScenarioReport::not_started(&plan.name, None, CONFIGURATION_STAGE, e);
            }
        };
        let cluster_name = request.cluster_name.to_string();

        if self.cancel.is_cancelled() {
            return ScenarioReport::not_started(
                &plan.name,
                Some(cluster_name),
                INIT_STAGE,
                "interrupted before init",
            );
        }

        let handle = match self.provisioner.init(&request).await {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!(scenario = %plan.name, error = %e, "init failed");
                return ScenarioReport::not_started(
                    &plan.name,
                    Some(cluster_name),
                    INIT_STAGE,
                    e,
                );
            }
        };

        let pipeline = Pipeline::new(
            Arc::clone(&self.provisioner),
            Arc::clone(&self.cluster_api),
            Arc::clone(&self.connectivity),
            Arc::clone(&self.precondition),
        )
        .with_options(plan.options.clone())
        .with_cancellation(self.cancel.clone());

        let guard = TeardownGuard::new(Arc::clone(&self.provisioner), handle);
        let (run, teardown) = guard
            .run(async |handle| pipeline.run(handle).await)
            .await;

        let report = match run {
            Guarded::Finished(run) => {
                ScenarioReport::from_run(&plan.name, cluster_name, run, teardown)
            }
            Guarded::Panicked(message) => ScenarioReport::panicked(
                &plan.name,
                Some(cluster_name),
                PIPELINE_STAGE,
                &message,
                teardown,
            ),
        };
        if report.succeeded() {
            tracing::info!(scenario = %plan.name, "scenario passed");
        } else {
            tracing::warn!(scenario = %plan.name, %report, "scenario failed");
        }
        report
    }

    /// Run every plan concurrently. Reports come back in plan order.
    ///
    /// A panic in one scenario becomes that scenario's report; every other
    /// scenario keeps running through its own teardown.
    pub async fn run_suite(&self, plans: &[ScenarioPlan]) -> SuiteReport {
        let reports = join_all(plans.iter().map(|plan| self.run_isolated(plan))).await;
        SuiteReport::new(reports)
    }

    async fn run_isolated(&self, plan: &ScenarioPlan) -> ScenarioReport {
        match AssertUnwindSafe(self.run_scenario(plan)).catch_unwind().await {
            Ok(report) => report,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(
                    scenario = %plan.name,
                    panic = %message,
                    "scenario panicked before its deployment was guarded"
                );
                ScenarioReport::panicked(
                    &plan.name,
                    None,
                    PIPELINE_STAGE,
                    &message,
                    TeardownStatus::NotRequired,
                )
            }
        }
    }
}
