// ABOUTME: Run command implementation.
// ABOUTME: Wires the real collaborators, runs the selected scenarios and prints their reports.

use haven_verify::cluster::{ArmClusterApi, TcpConnectivityProbe};
use haven_verify::config::{Credentials, SuiteConfig};
use haven_verify::diagnostics::{Diagnostics, Warning};
use haven_verify::driver::Terraform;
use haven_verify::error::Result;
use haven_verify::pipeline::{PipelineMode, Stage, StageResult};
use haven_verify::precondition::{HttpAddressLookup, PreconditionChecker};
use haven_verify::report::Output;
use haven_verify::scenario::SuiteRunner;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Run the selected scenarios concurrently. Fails when any scenario aborted
/// or any teardown failed.
pub async fn run(
    suite: SuiteConfig,
    names: &[String],
    mode: Option<PipelineMode>,
    output: &mut Output,
    mut diag: Diagnostics,
) -> Result<()> {
    // Credentials and scenario selection are checked before anything external runs.
    let credentials = Credentials::from_env()?;
    let plans = suite.plans(names, mode)?;

    let lookup = HttpAddressLookup::new(
        suite.precondition.lookup_url.clone(),
        suite.precondition.timeout,
    )?;
    let precondition = PreconditionChecker::new(
        Arc::new(lookup),
        suite.precondition.authorized_ranges.clone(),
    )
    .with_retry(suite.retry.address_lookup);

    let terraform = Terraform::new(suite.terraform.binary.clone())
        .with_provider_version(suite.terraform.provider_version.clone());

    let runner = SuiteRunner::new(
        Arc::new(terraform),
        Arc::new(ArmClusterApi::new()?),
        Arc::new(TcpConnectivityProbe::default()),
        Arc::new(precondition),
        credentials,
    )
    .with_base(suite.base_template())
    .with_work_root(suite.work_root());

    let cancel = CancellationToken::new();
    let runner = runner.with_cancellation(cancel.clone());
    let interrupts = tokio::spawn(watch_interrupts(cancel));

    output.start_timer();
    output.progress(&format!("Running {} scenario(s)", plans.len()));

    let report = runner.run_suite(&plans).await;
    interrupts.abort();

    for scenario in &report.scenarios {
        output.scenario(scenario);
        for record in scenario.skipped() {
            if let (Stage::VerifyConnectivity, StageResult::Skipped(reason)) =
                (record.stage, &record.result)
            {
                diag.warn(Warning::connectivity_skipped(format!(
                    "{}: connectivity not checked ({})",
                    scenario.scenario, reason
                )));
            }
        }
    }
    for warning in diag.warnings() {
        output.warning(warning);
    }

    output.summary(&report);
    report.into_result()
}

/// Cancel the suite on the first SIGINT or SIGTERM so every scenario stops at
/// its next stage boundary and tears down. A second interrupt exits at once.
async fn watch_interrupts(cancel: CancellationToken) {
    shutdown_signal().await;
    tracing::warn!("interrupt received; finishing running stages and tearing down");
    cancel.cancel();

    if signal::ctrl_c().await.is_ok() {
        tracing::error!("second interrupt; exiting without waiting for teardown");
        std::process::exit(130);
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
