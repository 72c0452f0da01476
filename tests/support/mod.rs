// ABOUTME: Test support utilities.
// ABOUTME: In-memory fakes for the provisioner, management API, connectivity probe and address lookup.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use haven_verify::cluster::{
    AgentPoolProfile, ClusterApi, ClusterApiError, ClusterRef, ConnectivityError,
    ConnectivityProbe, ManagedCluster,
};
use haven_verify::config::Credentials;
use haven_verify::driver::{
    ApplyResult, DeploymentHandle, DriverError, PlanOutcome, Provisioner, TeardownOutcome,
    ValidationResult, WorkDir,
};
use haven_verify::precondition::{
    AddressLookup, AuthorizedRangeSet, LookupError, PreconditionChecker,
};
use haven_verify::request::{DeploymentRequest, InputValue, ModuleSource, RequestTemplate};
use haven_verify::verify::{
    CLUSTER_NAME, DNS_ZONE_NAME, DNS_ZONE_NAME_SERVERS, LOG_ANALYTICS_WORKSPACE_ID, OutputSet,
    OutputValue, RESOURCE_GROUP_LOCATION, RESOURCE_GROUP_NAME,
};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Once;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env()
            .add_directive("haven_verify=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn credentials() -> Credentials {
    Credentials {
        tenant_id: "tenant".to_string(),
        subscription_id: "subscription".to_string(),
        client_id: "client".to_string(),
        client_secret: "secret".to_string(),
    }
}

/// Base template pointing at a module path that fakes never read.
pub fn base_template() -> RequestTemplate {
    RequestTemplate {
        source: Some(ModuleSource::Example {
            path: PathBuf::from("/modules/haven/examples/minimal"),
            root: None,
        }),
        ..Default::default()
    }
}

/// Outputs of a healthy deployment.
pub fn healthy_outputs() -> OutputSet {
    OutputSet::new()
        .with(CLUSTER_NAME, "aks-haven-test-abc123")
        .with(RESOURCE_GROUP_NAME, "rg-haven-test-abc123")
        .with(RESOURCE_GROUP_LOCATION, "westeurope")
        .with(DNS_ZONE_NAME, "haven-test-abc123.example.com")
        .with(
            DNS_ZONE_NAME_SERVERS,
            vec![
                "ns1-01.azure-dns.com.".to_string(),
                "ns2-01.azure-dns.net.".to_string(),
            ],
        )
        .with(
            LOG_ANALYTICS_WORKSPACE_ID,
            "/subscriptions/s/resourceGroups/rg-haven-test-abc123/providers/Microsoft.OperationalInsights/workspaces/law-haven",
        )
}

pub fn cluster(state: &str, count: i32) -> ManagedCluster {
    ManagedCluster {
        provisioning_state: state.to_string(),
        fqdn: Some("aks-haven-test-abc123.hcp.westeurope.azmk8s.io".to_string()),
        private_fqdn: None,
        agent_pool_profiles: vec![AgentPoolProfile {
            name: "default".to_string(),
            count: Some(count),
        }],
    }
}

/// Provisioner operations, in the order the fake saw them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Init,
    Validate,
    Plan,
    Apply,
    ApplyTargets,
    Output,
    Outputs,
    Destroy,
}

/// In-memory provisioner. Failures, panics and cancellation can be injected
/// per operation.
pub struct FakeProvisioner {
    calls: Mutex<Vec<Call>>,
    applied_inputs: Mutex<Vec<BTreeMap<String, InputValue>>>,
    destroyed: Mutex<Vec<String>>,
    fail_at: Option<Call>,
    panic_at: Option<Call>,
    /// Limits `panic_at` to one scenario.
    panic_scenario: Option<String>,
    cancel_at: Option<(Call, CancellationToken)>,
    apply_delay: Option<Duration>,
    plan: PlanOutcome,
    valid: bool,
    outputs: OutputSet,
}

impl Default for FakeProvisioner {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            applied_inputs: Mutex::new(Vec::new()),
            destroyed: Mutex::new(Vec::new()),
            fail_at: None,
            panic_at: None,
            panic_scenario: None,
            cancel_at: None,
            apply_delay: None,
            plan: PlanOutcome::ChangesPending,
            valid: true,
            outputs: healthy_outputs(),
        }
    }
}

impl FakeProvisioner {
    pub fn healthy() -> Self {
        Self::default()
    }

    pub fn failing_at(mut self, call: Call) -> Self {
        self.fail_at = Some(call);
        self
    }

    pub fn panicking_at(mut self, call: Call) -> Self {
        self.panic_at = Some(call);
        self
    }

    /// Panic at `call`, but only for `scenario`.
    pub fn panicking_for(mut self, scenario: &str, call: Call) -> Self {
        self.panic_at = Some(call);
        self.panic_scenario = Some(scenario.to_string());
        self
    }

    /// Cancel `token` when `call` starts. The call itself still succeeds.
    pub fn cancelling_at(mut self, call: Call, token: CancellationToken) -> Self {
        self.cancel_at = Some((call, token));
        self
    }

    /// Every apply sleeps this long after it has started.
    pub fn with_apply_delay(mut self, delay: Duration) -> Self {
        self.apply_delay = Some(delay);
        self
    }

    pub fn with_plan(mut self, plan: PlanOutcome) -> Self {
        self.plan = plan;
        self
    }

    pub fn with_outputs(mut self, outputs: OutputSet) -> Self {
        self.outputs = outputs;
        self
    }

    pub fn invalid(mut self) -> Self {
        self.valid = false;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn count(&self, call: Call) -> usize {
        self.calls.lock().iter().filter(|c| **c == call).count()
    }

    pub fn destroy_calls(&self) -> usize {
        self.count(Call::Destroy)
    }

    /// Scenarios whose destroy ran, in call order.
    pub fn destroyed(&self) -> Vec<String> {
        self.destroyed.lock().clone()
    }

    /// Request variables seen by each apply, full or targeted.
    pub fn applied_inputs(&self) -> Vec<BTreeMap<String, InputValue>> {
        self.applied_inputs.lock().clone()
    }

    fn enter(&self, call: Call, scenario: &str) -> Result<(), DriverError> {
        self.calls.lock().push(call);
        if let Some((at, token)) = &self.cancel_at
            && *at == call
        {
            token.cancel();
        }
        if self.panic_at == Some(call)
            && self
                .panic_scenario
                .as_deref()
                .is_none_or(|only| only == scenario)
        {
            panic!("injected panic during {:?}", call);
        }
        if self.fail_at == Some(call) {
            return Err(DriverError::Failed {
                command: format!("terraform {:?}", call).to_lowercase(),
                status: Some(1),
                stderr: format!("injected failure during {:?}", call),
            });
        }
        Ok(())
    }

    async fn applied(
        &self,
        handle: &mut DeploymentHandle,
        call: Call,
        targets: &[String],
    ) -> Result<ApplyResult, DriverError> {
        handle.record_apply(false);
        self.applied_inputs.lock().push(handle.request().variables());
        self.enter(call, handle.scenario())?;
        if let Some(delay) = self.apply_delay {
            tokio::time::sleep(delay).await;
        }
        handle.record_apply(true);
        Ok(ApplyResult {
            applied_at: Utc::now(),
            success: true,
            targets: targets.to_vec(),
        })
    }
}

#[async_trait]
impl Provisioner for FakeProvisioner {
    async fn init(&self, request: &DeploymentRequest) -> Result<DeploymentHandle, DriverError> {
        self.enter(Call::Init, &request.scenario)?;
        Ok(DeploymentHandle::new(
            request.clone(),
            WorkDir::fixed(std::env::temp_dir()),
        ))
    }

    async fn validate(
        &self,
        handle: &DeploymentHandle,
    ) -> Result<ValidationResult, DriverError> {
        self.enter(Call::Validate, handle.scenario())?;
        Ok(ValidationResult {
            valid: self.valid,
            error_count: if self.valid { 0 } else { 1 },
            warning_count: 0,
            diagnostics: if self.valid {
                Vec::new()
            } else {
                vec!["Unsupported argument: \"bogus\"".to_string()]
            },
        })
    }

    async fn plan(&self, handle: &DeploymentHandle) -> Result<PlanOutcome, DriverError> {
        self.enter(Call::Plan, handle.scenario())?;
        Ok(self.plan)
    }

    async fn apply(&self, handle: &mut DeploymentHandle) -> Result<ApplyResult, DriverError> {
        self.applied(handle, Call::Apply, &[]).await
    }

    async fn apply_targets(
        &self,
        handle: &mut DeploymentHandle,
        targets: &[String],
    ) -> Result<ApplyResult, DriverError> {
        self.applied(handle, Call::ApplyTargets, targets).await
    }

    async fn destroy(&self, handle: &DeploymentHandle) -> Result<TeardownOutcome, DriverError> {
        self.enter(Call::Destroy, handle.scenario())?;
        self.destroyed.lock().push(handle.scenario().to_string());
        if handle.needs_teardown() {
            Ok(TeardownOutcome::Destroyed)
        } else {
            Ok(TeardownOutcome::NotRequired)
        }
    }

    async fn output(
        &self,
        handle: &DeploymentHandle,
        name: &str,
    ) -> Result<OutputValue, DriverError> {
        self.enter(Call::Output, handle.scenario())?;
        self.outputs
            .get(name)
            .cloned()
            .ok_or_else(|| DriverError::OutputNotFound(name.to_string()))
    }

    async fn outputs(&self, handle: &DeploymentHandle) -> Result<OutputSet, DriverError> {
        self.enter(Call::Outputs, handle.scenario())?;
        Ok(self.outputs.clone())
    }
}

/// Management API returning a fixed cluster descriptor.
pub struct FakeClusterApi {
    cluster: Option<ManagedCluster>,
    requests: Mutex<Vec<ClusterRef>>,
}

impl FakeClusterApi {
    pub fn returning(cluster: ManagedCluster) -> Self {
        Self {
            cluster: Some(cluster),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every lookup answers NotFound.
    pub fn missing() -> Self {
        Self {
            cluster: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ClusterRef> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl ClusterApi for FakeClusterApi {
    async fn get_managed_cluster(
        &self,
        _credentials: &Credentials,
        cluster: &ClusterRef,
    ) -> Result<ManagedCluster, ClusterApiError> {
        self.requests.lock().push(cluster.clone());
        self.cluster
            .clone()
            .ok_or_else(|| ClusterApiError::NotFound(cluster.clone()))
    }
}

/// Connectivity probe that fails a fixed number of times before succeeding.
pub struct FakeConnectivity {
    failures: u32,
    attempts: AtomicU32,
}

impl FakeConnectivity {
    pub fn reachable() -> Self {
        Self::failing_first(0)
    }

    pub fn unreachable() -> Self {
        Self::failing_first(u32::MAX)
    }

    pub fn failing_first(failures: u32) -> Self {
        Self {
            failures,
            attempts: AtomicU32::new(0),
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectivityProbe for FakeConnectivity {
    async fn probe(&self, endpoint: &str) -> Result<(), ConnectivityError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.failures {
            return Err(ConnectivityError::Connect {
                address: format!("{}:443", endpoint),
                source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
            });
        }
        Ok(())
    }
}

/// Address lookup with a canned answer.
pub struct FakeLookup {
    answer: Result<IpAddr, u16>,
    calls: AtomicU32,
}

impl FakeLookup {
    pub fn address(ip: &str) -> Self {
        Self {
            answer: Ok(ip.parse().unwrap()),
            calls: AtomicU32::new(0),
        }
    }

    /// Every lookup fails with the given HTTP status.
    pub fn failing(status: u16) -> Self {
        Self {
            answer: Err(status),
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AddressLookup for FakeLookup {
    async fn lookup(&self) -> Result<IpAddr, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer.map_err(LookupError::Status)
    }
}

/// Precondition over the default private ranges with the given lookup.
pub fn precondition(lookup: FakeLookup) -> Arc<PreconditionChecker> {
    Arc::new(PreconditionChecker::new(
        Arc::new(lookup),
        AuthorizedRangeSet::default(),
    ))
}
