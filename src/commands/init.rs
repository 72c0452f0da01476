// ABOUTME: Init command implementation.
// ABOUTME: Writes a template suite file into the working directory.

use haven_verify::config;
use haven_verify::error::Result;
use haven_verify::report::Output;
use std::path::Path;

pub fn init(cwd: &Path, force: bool, output: &Output) -> Result<()> {
    let path = config::init_config(cwd, force)?;
    output.success(&format!("Created {}", path.display()));
    Ok(())
}
