// ABOUTME: Check-env command implementation.
// ABOUTME: Reports whether every required ARM_* credential variable is set.

use haven_verify::config::{Credentials, REQUIRED_VARS};
use haven_verify::diagnostics::Diagnostics;
use haven_verify::error::{ConfigError, Result};
use haven_verify::report::Output;

pub fn check_env(output: &Output, diag: &Diagnostics) -> Result<()> {
    for warning in diag.warnings() {
        output.warning(warning);
    }

    let missing = Credentials::missing_vars(|key| std::env::var(key).ok());
    if !missing.is_empty() {
        return Err(ConfigError::MissingEnvVar(missing.join(", ")).into());
    }

    output.success(&format!(
        "All {} credential variables are set",
        REQUIRED_VARS.len()
    ));
    Ok(())
}
