// ABOUTME: Command module aggregator for the haven-verify CLI.
// ABOUTME: Re-exports the command handlers and the suite/environment loading they share.

mod check_env;
mod init;
mod run;

pub use check_env::check_env;
pub use init::init;
pub use run::run;

use haven_verify::config::{EnvFile, SuiteConfig};
use haven_verify::diagnostics::{Diagnostics, Warning};
use haven_verify::error::Result;
use std::path::{Path, PathBuf};

/// Load the suite from `explicit` or discover it in `cwd`.
pub fn load_suite(explicit: Option<&Path>, cwd: &Path) -> Result<SuiteConfig> {
    let suite = match explicit {
        Some(path) => SuiteConfig::load(&cwd.join(path))?,
        None => SuiteConfig::discover(cwd)?,
    };
    Ok(suite)
}

/// Apply the first env file that exists. Must run before the async runtime starts.
pub fn load_env_files(
    suite: Option<&SuiteConfig>,
    cwd: &Path,
    diag: &mut Diagnostics,
) -> Result<()> {
    let candidates = match suite {
        Some(suite) => suite.env_file_paths(),
        None => vec![cwd.join(".env")],
    };
    if candidates.is_empty() {
        return Ok(());
    }

    match EnvFile::load_first(&candidates)? {
        Some(file) => {
            let written = file.apply()?;
            tracing::debug!(
                path = %file.path().display(),
                written = written.len(),
                "loaded env file"
            );
        }
        None => diag.warn(Warning::env_file(format!(
            "no env file found (tried {})",
            display_paths(&candidates)
        ))),
    }
    Ok(())
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
