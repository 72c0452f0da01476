// ABOUTME: Sequential stage orchestrator for one deployment handle.
// ABOUTME: Folds over the stage list and stops at the first failed stage.

use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use super::error::StageError;
use super::stage::{Stage, StageRecord, StageResult};
use super::state::PipelineState;
use super::{PipelineMode, PipelineOptions, PipelineRun};
use crate::cluster::{ClusterApi, ClusterRef, ConnectivityProbe, ManagedCluster};
use crate::driver::{DeploymentHandle, PlanOutcome, Provisioner};
use crate::precondition::PreconditionChecker;
use crate::request::InputValue;
use crate::retry::retry;
use crate::verify::{self, OutputValue, VerificationFailed};

/// Everything a stage needs besides the handle.
pub struct Pipeline {
    provisioner: Arc<dyn Provisioner>,
    cluster_api: Arc<dyn ClusterApi>,
    connectivity: Arc<dyn ConnectivityProbe>,
    precondition: Arc<PreconditionChecker>,
    options: PipelineOptions,
    cancel: CancellationToken,
}

/// Values produced by earlier stages. Outputs themselves are never kept.
#[derive(Default)]
struct Artifacts {
    plan: Option<PlanOutcome>,
    cluster_ref: Option<ClusterRef>,
    cluster: Option<ManagedCluster>,
}

enum Flow {
    Passed,
    Skipped(String),
}

impl Pipeline {
    pub fn new(
        provisioner: Arc<dyn Provisioner>,
        cluster_api: Arc<dyn ClusterApi>,
        connectivity: Arc<dyn ConnectivityProbe>,
        precondition: Arc<PreconditionChecker>,
    ) -> Self {
        Self {
            provisioner,
            cluster_api,
            connectivity,
            precondition,
            options: PipelineOptions::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    /// Stop before the next stage once `cancel` fires. A stage already in
    /// flight runs to completion.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Stages this pipeline will attempt, in order.
    pub fn stages(&self) -> Vec<Stage> {
        match self.options.mode {
            PipelineMode::Validate => vec![Stage::Validate],
            PipelineMode::Plan => vec![Stage::Validate, Stage::Plan],
            PipelineMode::Full => {
                let mut stages = Vec::with_capacity(9);
                if self.options.setup.is_some() {
                    stages.push(Stage::Prerequisites);
                }
                stages.extend([
                    Stage::Validate,
                    Stage::Plan,
                    Stage::Apply,
                    Stage::VerifyOutputs,
                    Stage::VerifyClusterState,
                    Stage::VerifyConnectivity,
                    Stage::VerifyDns,
                    Stage::VerifyMonitoring,
                ]);
                stages
            }
        }
    }

    /// Run every stage against `handle`. Teardown is not this function's job;
    /// callers run it inside a `TeardownGuard`.
    pub async fn run(&self, handle: &mut DeploymentHandle) -> PipelineRun {
        let mut state = PipelineState::Pending;
        let mut records = Vec::new();
        let mut artifacts = Artifacts::default();

        for stage in self.stages() {
            state.enter(stage);
            let started = Instant::now();

            let outcome = if self.cancel.is_cancelled() {
                Err(StageError::Interrupted)
            } else {
                self.run_stage(stage, handle, &mut artifacts).await
            };
            let (result, error_kind) = match outcome {
                Ok(Flow::Passed) => (StageResult::Passed, None),
                Ok(Flow::Skipped(reason)) => {
                    tracing::info!(%stage, %reason, "stage skipped");
                    (StageResult::Skipped(reason), None)
                }
                Err(e) => (StageResult::Failed(e.to_string()), Some(e.kind())),
            };

            records.push(StageRecord {
                stage,
                result: result.clone(),
                error_kind,
                elapsed: started.elapsed(),
            });

            if let StageResult::Failed(reason) = result {
                state.abort(reason);
                return PipelineRun {
                    state,
                    stages: records,
                };
            }
        }

        state.complete();
        PipelineRun {
            state,
            stages: records,
        }
    }

    async fn run_stage(
        &self,
        stage: Stage,
        handle: &mut DeploymentHandle,
        artifacts: &mut Artifacts,
    ) -> Result<Flow, StageError> {
        match stage {
            Stage::Prerequisites => self.prerequisites(handle).await,
            Stage::Validate => {
                let result = self.provisioner.validate(handle).await?;
                if !result.valid {
                    return Err(StageError::Invalid {
                        errors: result.error_count,
                        summary: result.diagnostics.join("; "),
                    });
                }
                Ok(Flow::Passed)
            }
            Stage::Plan => {
                let outcome = self.provisioner.plan(handle).await?;
                if let Some(expected) = self.options.expect_plan
                    && expected != outcome
                {
                    return Err(StageError::PlanMismatch {
                        expected,
                        actual: outcome,
                    });
                }
                artifacts.plan = Some(outcome);
                Ok(Flow::Passed)
            }
            Stage::Apply => {
                let result = self.provisioner.apply(handle).await?;
                tracing::info!(
                    scenario = handle.scenario(),
                    applied_at = %result.applied_at,
                    plan = ?artifacts.plan,
                    "apply finished"
                );
                Ok(Flow::Passed)
            }
            Stage::VerifyOutputs => {
                let outputs = self.provisioner.outputs(handle).await?;
                let cluster_ref = verify::verify_outputs(&outputs, &self.options.expectations)?;
                artifacts.cluster_ref = Some(cluster_ref);
                Ok(Flow::Passed)
            }
            Stage::VerifyClusterState => {
                let cluster_ref = self.cluster_ref(handle, artifacts).await?;
                let cluster = self
                    .cluster_api
                    .get_managed_cluster(handle.credentials(), &cluster_ref)
                    .await?;
                verify::verify_cluster_state(&cluster, &self.options.expectations)?;
                artifacts.cluster = Some(cluster);
                Ok(Flow::Passed)
            }
            Stage::VerifyConnectivity => self.connectivity(handle, artifacts).await,
            Stage::VerifyDns => {
                let outputs = self.provisioner.outputs(handle).await?;
                verify::verify_dns(&outputs)?;
                Ok(Flow::Passed)
            }
            Stage::VerifyMonitoring => {
                let outputs = self.provisioner.outputs(handle).await?;
                verify::verify_monitoring(&outputs, &self.options.expectations)?;
                Ok(Flow::Passed)
            }
        }
    }

    async fn prerequisites(&self, handle: &mut DeploymentHandle) -> Result<Flow, StageError> {
        let Some(setup) = &self.options.setup else {
            return Ok(Flow::Skipped("no prerequisites declared".to_string()));
        };

        self.provisioner
            .apply_targets(handle, &setup.targets)
            .await?;

        for (input, output) in &setup.bind {
            let value = match self.provisioner.output(handle, output).await? {
                OutputValue::Text(text) => InputValue::String(text),
                OutputValue::List(items) => InputValue::List(items),
            };
            tracing::debug!(
                scenario = handle.scenario(),
                input = %input,
                output = %output,
                "binding prerequisite output"
            );
            handle.bind_input(input, value)?;
        }
        Ok(Flow::Passed)
    }

    async fn cluster_ref(
        &self,
        handle: &DeploymentHandle,
        artifacts: &Artifacts,
    ) -> Result<ClusterRef, StageError> {
        if let Some(cluster_ref) = &artifacts.cluster_ref {
            return Ok(cluster_ref.clone());
        }
        let outputs = self.provisioner.outputs(handle).await?;
        Ok(verify::verify_outputs(&outputs, &self.options.expectations)?)
    }

    async fn connectivity(
        &self,
        handle: &DeploymentHandle,
        artifacts: &Artifacts,
    ) -> Result<Flow, StageError> {
        let authorization = self.precondition.check().await;
        if !authorization.is_authorized() {
            return Ok(Flow::Skipped(authorization.to_string()));
        }

        let cluster = match &artifacts.cluster {
            Some(cluster) => cluster.clone(),
            None => {
                let cluster_ref = self.cluster_ref(handle, artifacts).await?;
                self.cluster_api
                    .get_managed_cluster(handle.credentials(), &cluster_ref)
                    .await?
            }
        };
        let endpoint = cluster
            .endpoint()
            .ok_or_else(|| VerificationFailed::new("fqdn", "cluster endpoint", "none"))?;

        retry(self.options.connectivity_retry, "cluster connectivity", || {
            self.connectivity.probe(endpoint)
        })
        .await?;
        Ok(Flow::Passed)
    }
}
