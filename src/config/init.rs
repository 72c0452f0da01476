// ABOUTME: Config scaffolding for new suites.
// ABOUTME: Creates a commented haven-verify.yml template.

use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};

use super::CONFIG_FILENAME;

pub const TEMPLATE_YAML: &str = r#"# Optional KEY=VALUE files with ARM_* credentials. The first one found is loaded;
# variables already set in the environment are never overwritten.
env_files:
  - .env

terraform:
  binary: terraform
  provider_version: "~> 4.35"

retry:
  connectivity:
    max_attempts: 5
    delay: 30s
  address_lookup:
    max_attempts: 1
    delay: 0s

# The connectivity stage only runs when the caller's public address is inside
# one of these ranges; otherwise it is recorded as skipped.
precondition:
  lookup_url: https://checkip.amazonaws.com
  timeout: 10s
  authorized_ranges:
    - 10.0.0.0/8
    - 172.16.0.0/12
    - 192.168.0.0/16

expectations:
  cluster_prefix: aks-
  resource_group_prefix: rg-
  provisioning_state: Succeeded
  monitoring_resource_type: Microsoft.OperationalInsights/workspaces

base:
  source:
    example:
      path: ../examples/minimal
  inputs:
    location: West Europe
    kubernetes_version: "1.33.0"
    vnet_address_space: ["10.0.0.0/16"]
    subnet_address_prefixes: ["10.0.1.0/24"]
    default_node_pool_vm_size: Standard_B2s
    sku_tier: Free
    enable_auto_scaling: false
    enable_keda: false
    enable_vpa: false

scenarios:
  - name: minimal
  - name: production-config
    mode: plan
    name_style: short
    inputs:
      enable_auto_scaling: true
      min_node_count: 1
      max_node_count: 5
      enable_keda: true
      enable_vpa: true
"#;

/// Write the template into `dir`. Refuses to overwrite unless `force`.
pub fn init_config(dir: &Path, force: bool) -> Result<PathBuf> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(ConfigError::AlreadyExists(config_path).into());
    }

    std::fs::write(&config_path, TEMPLATE_YAML)?;
    Ok(config_path)
}
