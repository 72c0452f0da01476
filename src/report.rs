// ABOUTME: Scenario and suite reports plus CLI output formatting.
// ABOUTME: Supports normal, quiet (CI), and JSON lines output modes.

use serde::Serialize;
use std::fmt;
use std::time::Instant;

use crate::diagnostics::Warning;
use crate::driver::TeardownStatus;
use crate::error::{Error, Result};
use crate::pipeline::{PipelineRun, PipelineState, StageRecord, StageResult};

/// How a scenario ended, independent of teardown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScenarioOutcome {
    Completed,
    Aborted { stage: String, reason: String },
}

/// Everything a reader needs to know about one scenario run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioReport {
    pub scenario: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_name: Option<String>,
    pub outcome: ScenarioOutcome,
    pub stages: Vec<StageRecord>,
    pub teardown: TeardownStatus,
}

impl ScenarioReport {
    /// A scenario that failed before a deployment handle existed.
    pub fn not_started(
        scenario: &str,
        cluster_name: Option<String>,
        stage: &str,
        cause: impl fmt::Display,
    ) -> Self {
        Self {
            scenario: scenario.to_string(),
            cluster_name,
            outcome: ScenarioOutcome::Aborted {
                stage: stage.to_string(),
                reason: cause.to_string(),
            },
            stages: Vec::new(),
            teardown: TeardownStatus::NotRequired,
        }
    }

    /// A scenario whose run panicked. `teardown` is what the guard did
    /// before the panic was reported.
    pub fn panicked(
        scenario: &str,
        cluster_name: Option<String>,
        stage: &str,
        message: &str,
        teardown: TeardownStatus,
    ) -> Self {
        Self {
            scenario: scenario.to_string(),
            cluster_name,
            outcome: ScenarioOutcome::Aborted {
                stage: stage.to_string(),
                reason: format!("panicked: {}", message),
            },
            stages: Vec::new(),
            teardown,
        }
    }

    pub fn from_run(
        scenario: &str,
        cluster_name: String,
        run: PipelineRun,
        teardown: TeardownStatus,
    ) -> Self {
        let outcome = match run.state {
            PipelineState::Completed => ScenarioOutcome::Completed,
            PipelineState::Aborted { stage, reason } => ScenarioOutcome::Aborted {
                stage: stage.name().to_string(),
                reason,
            },
            other => ScenarioOutcome::Aborted {
                stage: "pipeline".to_string(),
                reason: format!("pipeline stopped while {}", other),
            },
        };

        Self {
            scenario: scenario.to_string(),
            cluster_name: Some(cluster_name),
            outcome,
            stages: run.stages,
            teardown,
        }
    }

    /// Completed and cleaned up.
    pub fn succeeded(&self) -> bool {
        self.outcome == ScenarioOutcome::Completed && self.teardown.succeeded()
    }

    /// Stage the scenario failed at, if any.
    pub fn failed_stage(&self) -> Option<&str> {
        match &self.outcome {
            ScenarioOutcome::Aborted { stage, .. } => Some(stage),
            ScenarioOutcome::Completed => None,
        }
    }

    pub fn skipped(&self) -> impl Iterator<Item = &StageRecord> {
        self.stages
            .iter()
            .filter(|r| matches!(r.result, StageResult::Skipped(_)))
    }
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.succeeded() { "PASS" } else { "FAIL" };
        write!(f, "{} {}", verdict, self.scenario)?;
        if let Some(name) = &self.cluster_name {
            write!(f, " ({})", name)?;
        }

        match &self.outcome {
            ScenarioOutcome::Completed => {
                let skipped = self.skipped().count();
                write!(f, ": {} stage(s) run", self.stages.len())?;
                if skipped > 0 {
                    write!(f, ", {} skipped", skipped)?;
                }
            }
            ScenarioOutcome::Aborted { stage, reason } => {
                write!(f, ": {} failed: {}", stage, reason)?;
            }
        }

        write!(f, "; {}", self.teardown)
    }
}

/// Reports of every scenario in a suite run, in suite order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SuiteReport {
    pub scenarios: Vec<ScenarioReport>,
}

impl SuiteReport {
    pub fn new(scenarios: Vec<ScenarioReport>) -> Self {
        Self { scenarios }
    }

    pub fn total(&self) -> usize {
        self.scenarios.len()
    }

    /// Scenarios that aborted or whose teardown failed.
    pub fn failed(&self) -> usize {
        self.scenarios.iter().filter(|r| !r.succeeded()).count()
    }

    pub fn succeeded(&self) -> bool {
        self.failed() == 0
    }

    pub fn into_result(self) -> Result<()> {
        if self.succeeded() {
            Ok(())
        } else {
            Err(Error::ScenariosFailed {
                failed: self.failed(),
                total: self.total(),
            })
        }
    }
}

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    Normal,
    /// Minimal output for CI (only final results)
    Quiet,
    /// JSON lines for scripting
    Json,
}

/// Handles CLI output based on the configured mode.
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Start timing an operation.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Get elapsed time since timer started.
    pub fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    /// Print one scenario result. JSON mode emits the full report as one line.
    pub fn scenario(&self, report: &ScenarioReport) {
        match self.mode {
            OutputMode::Normal => {
                println!("{report}");
                for record in &report.stages {
                    println!(
                        "  {:<22} {} ({:.1}s)",
                        record.stage.name(),
                        record.result,
                        record.elapsed.as_secs_f64()
                    );
                }
            }
            OutputMode::Quiet => println!("{report}"),
            OutputMode::Json => {
                if let Ok(json) = serde_json::to_string(report) {
                    println!("{json}");
                }
            }
        }
    }

    /// Print the suite summary line (JSON mode relies on the per-scenario lines).
    pub fn summary(&self, suite: &SuiteReport) {
        if self.mode == OutputMode::Json {
            return;
        }
        let message = format!(
            "{} of {} scenario(s) passed",
            suite.total() - suite.failed(),
            suite.total()
        );
        if suite.succeeded() {
            self.success(&message);
        } else {
            self.error(&message);
        }
    }

    /// Print a non-fatal warning (suppressed in quiet mode).
    pub fn warning(&self, warning: &Warning) {
        match self.mode {
            OutputMode::Normal => eprintln!("Warning: {}", warning.message),
            OutputMode::Quiet => {}
            OutputMode::Json => self.event("warning", &warning.message, true),
        }
    }

    /// Print a success message with optional timing.
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => {
                let elapsed = self.elapsed_secs();
                if elapsed > 0.0 {
                    println!("{message} ({:.1}s)", elapsed);
                } else {
                    println!("{message}");
                }
            }
            OutputMode::Quiet => println!("{message}"),
            OutputMode::Json => self.event("success", message, false),
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => eprintln!("Error: {message}"),
            OutputMode::Json => self.event("error", message, true),
        }
    }

    fn event(&self, event: &str, message: &str, to_stderr: bool) {
        let event = JsonEvent {
            event,
            message,
            duration_secs: self.start_time.map(|_| self.elapsed_secs()),
        };
        if let Ok(json) = serde_json::to_string(&event) {
            if to_stderr {
                eprintln!("{json}");
            } else {
                println!("{json}");
            }
        }
    }
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}
