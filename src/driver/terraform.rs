// ABOUTME: Provisioner implementation that shells out to the terraform CLI.
// ABOUTME: Runs each lifecycle command in the handle's working directory with explicit credentials.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use super::error::DriverError;
use super::handle::DeploymentHandle;
use super::workdir;
use super::{
    ApplyResult, PlanOutcome, Provisioner, TeardownOutcome, ValidationResult, classify_plan_exit,
};
use crate::request::DeploymentRequest;
use crate::verify::{OutputSet, OutputValue};

/// Variable file written into the working directory before plan, apply and destroy.
pub const VAR_FILE_NAME: &str = "haven-verify.auto.tfvars.json";

/// Provider constraint used in generated wrapper roots.
pub const DEFAULT_PROVIDER_VERSION: &str = "~> 4.35";

/// Drives the `terraform` binary.
#[derive(Debug, Clone)]
pub struct Terraform {
    binary: PathBuf,
    provider_version: String,
}

impl Default for Terraform {
    fn default() -> Self {
        Self::new("terraform")
    }
}

/// Captured result of one invocation.
struct CommandOutput {
    command: String,
    status: Option<i32>,
    stdout: String,
    stderr: String,
}

impl CommandOutput {
    fn success(&self) -> bool {
        self.status == Some(0)
    }

    fn into_error(self) -> DriverError {
        DriverError::Failed {
            command: self.command,
            status: self.status,
            stderr: self.stderr.trim().to_string(),
        }
    }
}

impl Terraform {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            provider_version: DEFAULT_PROVIDER_VERSION.to_string(),
        }
    }

    pub fn with_provider_version(mut self, version: impl Into<String>) -> Self {
        self.provider_version = version.into();
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Run a subcommand and capture its output whatever the exit status.
    async fn exec(
        &self,
        handle: &DeploymentHandle,
        args: &[String],
    ) -> Result<CommandOutput, DriverError> {
        let command = format!("{} {}", self.binary.display(), args.join(" "));
        tracing::debug!(scenario = handle.scenario(), %command, "running provisioning tool");

        let output = Command::new(&self.binary)
            .args(args)
            .current_dir(handle.dir())
            .envs(handle.credentials().to_env())
            .env("TF_IN_AUTOMATION", "1")
            .env("TF_INPUT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| DriverError::Spawn {
                command: command.clone(),
                source,
            })?;

        let result = CommandOutput {
            command,
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        if !result.success() {
            tracing::debug!(
                scenario = handle.scenario(),
                status = ?result.status,
                "provisioning tool exited unsuccessfully"
            );
        }

        Ok(result)
    }

    /// Run a subcommand that must exit with status 0.
    async fn run(
        &self,
        handle: &DeploymentHandle,
        args: &[String],
    ) -> Result<CommandOutput, DriverError> {
        let output = self.exec(handle, args).await?;
        if output.success() {
            Ok(output)
        } else {
            Err(output.into_error())
        }
    }

    async fn write_var_file(&self, handle: &DeploymentHandle) -> Result<(), DriverError> {
        let json = serde_json::to_vec_pretty(&handle.request().variables())
            .map_err(std::io::Error::other)?;
        tokio::fs::write(handle.dir().join(VAR_FILE_NAME), json).await?;
        Ok(())
    }

    async fn apply_with(
        &self,
        handle: &mut DeploymentHandle,
        targets: &[String],
    ) -> Result<ApplyResult, DriverError> {
        self.write_var_file(handle).await?;

        let mut args = args(&["apply", "-auto-approve", "-no-color", "-input=false"]);
        args.extend(targets.iter().map(|t| format!("-target={}", t)));

        tracing::info!(
            scenario = handle.scenario(),
            targets = targets.len(),
            "applying deployment"
        );

        // Recorded before the command runs so an interrupted apply is still torn down.
        handle.record_apply(false);
        self.run(handle, &args).await?;
        handle.record_apply(true);

        Ok(ApplyResult {
            applied_at: Utc::now(),
            success: true,
            targets: targets.to_vec(),
        })
    }
}

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[derive(Deserialize)]
struct ValidateJson {
    valid: bool,
    #[serde(default)]
    error_count: u32,
    #[serde(default)]
    warning_count: u32,
    #[serde(default)]
    diagnostics: Vec<DiagnosticJson>,
}

#[derive(Deserialize)]
struct DiagnosticJson {
    severity: String,
    summary: String,
    #[serde(default)]
    detail: String,
}

impl From<ValidateJson> for ValidationResult {
    fn from(json: ValidateJson) -> Self {
        ValidationResult {
            valid: json.valid,
            error_count: json.error_count,
            warning_count: json.warning_count,
            diagnostics: json
                .diagnostics
                .into_iter()
                .map(|d| {
                    if d.detail.is_empty() {
                        format!("{}: {}", d.severity, d.summary)
                    } else {
                        format!("{}: {}: {}", d.severity, d.summary, d.detail)
                    }
                })
                .collect(),
        }
    }
}

#[derive(Deserialize)]
struct OutputJson {
    value: serde_json::Value,
}

/// Convert a JSON output value. Scalars become text, string arrays become
/// lists and null becomes empty text.
pub(crate) fn output_value(
    name: &str,
    value: serde_json::Value,
) -> Result<OutputValue, DriverError> {
    use serde_json::Value;

    let scalar = |v: Value| match v {
        Value::String(s) => Some(s),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Null => Some(String::new()),
        _ => None,
    };

    match value {
        Value::Array(items) => items
            .into_iter()
            .map(scalar)
            .collect::<Option<Vec<_>>>()
            .map(OutputValue::List)
            .ok_or_else(|| DriverError::MalformedOutput {
                name: name.to_string(),
                reason: "list contains nested values".to_string(),
            }),
        Value::Object(_) => Err(DriverError::MalformedOutput {
            name: name.to_string(),
            reason: "maps and objects are not supported".to_string(),
        }),
        other => Ok(OutputValue::Text(scalar(other).unwrap_or_default())),
    }
}

fn is_missing_output(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    lower.contains("not found") || lower.contains("could not be found")
}

#[async_trait]
impl Provisioner for Terraform {
    async fn init(&self, request: &DeploymentRequest) -> Result<DeploymentHandle, DriverError> {
        let workdir = workdir::prepare(request, &self.provider_version)?;
        let handle = DeploymentHandle::new(request.clone(), workdir);

        tracing::info!(
            scenario = handle.scenario(),
            cluster = %handle.cluster_name(),
            "initializing working directory"
        );
        self.run(&handle, &args(&["init", "-no-color", "-input=false"]))
            .await?;
        Ok(handle)
    }

    async fn validate(&self, handle: &DeploymentHandle) -> Result<ValidationResult, DriverError> {
        let output = self
            .exec(handle, &args(&["validate", "-json", "-no-color"]))
            .await?;

        // The JSON verdict is printed even when validation fails.
        match serde_json::from_str::<ValidateJson>(&output.stdout) {
            Ok(json) => Ok(json.into()),
            Err(_) if !output.success() => Err(output.into_error()),
            Err(e) => Err(DriverError::MalformedOutput {
                name: "validate".to_string(),
                reason: e.to_string(),
            }),
        }
    }

    async fn plan(&self, handle: &DeploymentHandle) -> Result<PlanOutcome, DriverError> {
        self.write_var_file(handle).await?;
        let output = self
            .exec(
                handle,
                &args(&["plan", "-detailed-exitcode", "-no-color", "-input=false"]),
            )
            .await?;
        let outcome = classify_plan_exit(output.status, output.stderr.trim())?;
        tracing::info!(scenario = handle.scenario(), %outcome, "plan classified");
        Ok(outcome)
    }

    async fn apply(&self, handle: &mut DeploymentHandle) -> Result<ApplyResult, DriverError> {
        self.apply_with(handle, &[]).await
    }

    async fn apply_targets(
        &self,
        handle: &mut DeploymentHandle,
        targets: &[String],
    ) -> Result<ApplyResult, DriverError> {
        self.apply_with(handle, targets).await
    }

    async fn destroy(&self, handle: &DeploymentHandle) -> Result<TeardownOutcome, DriverError> {
        if !handle.needs_teardown() {
            tracing::debug!(scenario = handle.scenario(), "no apply attempted; skipping destroy");
            return Ok(TeardownOutcome::NotRequired);
        }

        self.write_var_file(handle).await?;
        tracing::info!(
            scenario = handle.scenario(),
            cluster = %handle.cluster_name(),
            "destroying deployment"
        );
        self.run(
            handle,
            &args(&["destroy", "-auto-approve", "-no-color", "-input=false"]),
        )
        .await?;
        Ok(TeardownOutcome::Destroyed)
    }

    async fn output(
        &self,
        handle: &DeploymentHandle,
        name: &str,
    ) -> Result<OutputValue, DriverError> {
        let output = self
            .exec(handle, &args(&["output", "-json", "-no-color", name]))
            .await?;

        if !output.success() {
            if is_missing_output(&output.stderr) {
                return Err(DriverError::OutputNotFound(name.to_string()));
            }
            return Err(output.into_error());
        }

        let value: serde_json::Value =
            serde_json::from_str(&output.stdout).map_err(|e| DriverError::MalformedOutput {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        output_value(name, value)
    }

    async fn outputs(&self, handle: &DeploymentHandle) -> Result<OutputSet, DriverError> {
        let output = self
            .run(handle, &args(&["output", "-json", "-no-color"]))
            .await?;

        let raw: std::collections::BTreeMap<String, OutputJson> =
            serde_json::from_str(&output.stdout).map_err(|e| DriverError::MalformedOutput {
                name: "outputs".to_string(),
                reason: e.to_string(),
            })?;

        raw.into_iter()
            .map(|(name, json)| output_value(&name, json.value).map(|value| (name, value)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalar_outputs_become_text() {
        assert_eq!(
            output_value("n", json!("aks-haven")).unwrap(),
            OutputValue::Text("aks-haven".into())
        );
        assert_eq!(
            output_value("n", json!(3)).unwrap(),
            OutputValue::Text("3".into())
        );
        assert_eq!(
            output_value("n", json!(null)).unwrap(),
            OutputValue::Text(String::new())
        );
    }

    #[test]
    fn string_arrays_become_lists() {
        assert_eq!(
            output_value("ns", json!(["ns1.azure-dns.com", "ns2.azure-dns.net"])).unwrap(),
            OutputValue::List(vec![
                "ns1.azure-dns.com".into(),
                "ns2.azure-dns.net".into()
            ])
        );
    }

    #[test]
    fn objects_are_malformed() {
        let err = output_value("m", json!({"a": 1})).unwrap_err();
        assert!(matches!(err, DriverError::MalformedOutput { .. }));
        let err = output_value("m", json!([["nested"]])).unwrap_err();
        assert!(matches!(err, DriverError::MalformedOutput { .. }));
    }

    #[test]
    fn validate_json_is_summarized() {
        let json: ValidateJson = serde_json::from_str(
            r#"{"valid":false,"error_count":1,"warning_count":0,
                "diagnostics":[{"severity":"error","summary":"Unsupported argument","detail":"foo"}]}"#,
        )
        .unwrap();
        let result = ValidationResult::from(json);
        assert!(!result.valid);
        assert_eq!(result.diagnostics, vec!["error: Unsupported argument: foo"]);
    }

    #[test]
    fn missing_output_messages_are_recognized() {
        assert!(is_missing_output(
            "Error: Output \"x\" not found\n\nThe output variable requested could not be found"
        ));
        assert!(!is_missing_output("Error: backend initialization required"));
    }
}
