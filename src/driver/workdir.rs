// ABOUTME: Scratch working directory preparation for a deployment request.
// ABOUTME: Copies an example root module or renders a wrapper root around a reusable module.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use super::handle::WorkDir;
use crate::request::{DeploymentRequest, InputValue, ModuleSource};

/// Outputs re-exported by a generated wrapper root.
pub const WRAPPER_OUTPUTS: [&str; 6] = [
    "cluster_name",
    "resource_group_name",
    "resource_group_location",
    "dns_zone_name",
    "dns_zone_name_servers",
    "log_analytics_workspace_id",
];

const WRAPPER_FILE: &str = "main.tf";

/// Create the scratch tree for `request` and lay out its root module.
pub fn prepare(request: &DeploymentRequest, provider_version: &str) -> io::Result<WorkDir> {
    let parent = match &request.work_root {
        Some(root) => root.clone(),
        None => std::env::temp_dir(),
    };
    std::fs::create_dir_all(&parent)?;

    let scratch = tempfile::Builder::new()
        .prefix(&format!("haven-verify-{}-", request.id))
        .tempdir_in(&parent)?;

    let dir = match &request.source {
        ModuleSource::Example { path, root } => {
            require_dir(path)?;
            match root {
                Some(root) => {
                    let relative = path.strip_prefix(root).map_err(|_| {
                        io::Error::new(
                            io::ErrorKind::InvalidInput,
                            format!("{} is not inside {}", path.display(), root.display()),
                        )
                    })?;
                    copy_tree(root, scratch.path())?;
                    scratch.path().join(relative)
                }
                None => {
                    copy_tree(path, scratch.path())?;
                    scratch.path().to_path_buf()
                }
            }
        }
        ModuleSource::Module { path, aliases } => {
            require_dir(path)?;
            let module = std::path::absolute(path)?;
            let rendered = render_wrapper(&module, &request.variables(), aliases, provider_version);
            std::fs::write(scratch.path().join(WRAPPER_FILE), rendered)?;
            scratch.path().to_path_buf()
        }
    };

    tracing::debug!(
        scenario = %request.scenario,
        dir = %dir.display(),
        "prepared working directory"
    );

    Ok(WorkDir::scratch(scratch, dir))
}

fn require_dir(path: &Path) -> io::Result<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("module directory {} does not exist", path.display()),
        ))
    }
}

/// Local state, provider caches and credential files stay behind.
fn is_skipped(entry: &DirEntry) -> bool {
    if entry.depth() == 0 {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name == ".terraform" || name == ".env" || name.contains(".tfstate")
}

fn copy_tree(src: &Path, dst: &Path) -> io::Result<()> {
    for entry in WalkDir::new(src).into_iter().filter_entry(|e| !is_skipped(e)) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| io::Error::other(e.to_string()))?;
        let target: PathBuf = dst.join(relative);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Render a root configuration that declares the provider, passes every
/// input to the module and re-exports [`WRAPPER_OUTPUTS`].
pub fn render_wrapper(
    module: &Path,
    variables: &BTreeMap<String, InputValue>,
    aliases: &BTreeMap<String, String>,
    provider_version: &str,
) -> String {
    let mut out = String::new();

    let _ = write!(
        out,
        r#"terraform {{
  required_providers {{
    azurerm = {{
      source  = "hashicorp/azurerm"
      version = {}
    }}
  }}
}}

provider "azurerm" {{
  features {{}}
}}
"#,
        hcl_string(provider_version)
    );

    for name in variables.keys() {
        let _ = write!(out, "\nvariable \"{}\" {{}}\n", name);
    }

    let _ = write!(
        out,
        "\nmodule \"haven\" {{\n  source = {}\n",
        hcl_string(&module.to_string_lossy())
    );
    if !variables.is_empty() {
        out.push('\n');
    }
    for name in variables.keys() {
        let argument = aliases.get(name).map(String::as_str).unwrap_or(name);
        let _ = writeln!(out, "  {} = var.{}", argument, name);
    }
    out.push_str("}\n");

    for output in WRAPPER_OUTPUTS {
        let _ = write!(
            out,
            "\noutput \"{}\" {{\n  value = module.haven.{}\n}}\n",
            output, output
        );
    }

    out
}

fn hcl_string(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            _ => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}
