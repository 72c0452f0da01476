// ABOUTME: Assertion primitives and the composite checks run by verification stages.
// ABOUTME: Every failure carries the field name, the expected predicate and the actual value.

use serde::Deserialize;

use super::VerificationFailed;
use super::outputs::{
    CLUSTER_NAME, DNS_ZONE_NAME, DNS_ZONE_NAME_SERVERS, LOG_ANALYTICS_WORKSPACE_ID, OutputSet,
    RESOURCE_GROUP_LOCATION, RESOURCE_GROUP_NAME,
};
use crate::cluster::{ClusterRef, ManagedCluster};

/// Conventions the deployed resources must follow.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Expectations {
    /// Required prefix of the `cluster_name` output. `null` disables the check.
    pub cluster_prefix: Option<String>,
    /// Required prefix of the `resource_group_name` output. `null` disables the check.
    pub resource_group_prefix: Option<String>,
    pub provisioning_state: String,
    /// Substring the monitoring workspace identifier must contain.
    pub monitoring_resource_type: String,
}

impl Default for Expectations {
    fn default() -> Self {
        Self {
            cluster_prefix: Some("aks-".to_string()),
            resource_group_prefix: Some("rg-".to_string()),
            provisioning_state: "Succeeded".to_string(),
            monitoring_resource_type: "Microsoft.OperationalInsights/workspaces".to_string(),
        }
    }
}

pub fn non_empty(field: &str, value: &str) -> Result<(), VerificationFailed> {
    if value.trim().is_empty() {
        return Err(VerificationFailed::new(field, "non-empty value", format!("{:?}", value)));
    }
    Ok(())
}

pub fn has_prefix(field: &str, value: &str, prefix: &str) -> Result<(), VerificationFailed> {
    if !value.starts_with(prefix) {
        return Err(VerificationFailed::new(
            field,
            format!("prefix {:?}", prefix),
            format!("{:?}", value),
        ));
    }
    Ok(())
}

pub fn contains(field: &str, value: &str, needle: &str) -> Result<(), VerificationFailed> {
    if !value.contains(needle) {
        return Err(VerificationFailed::new(
            field,
            format!("value containing {:?}", needle),
            format!("{:?}", value),
        ));
    }
    Ok(())
}

pub fn non_empty_list(field: &str, values: &[String]) -> Result<(), VerificationFailed> {
    if values.iter().all(|v| v.trim().is_empty()) {
        return Err(VerificationFailed::new(
            field,
            "at least one entry",
            format!("{:?}", values),
        ));
    }
    Ok(())
}

pub fn equals(field: &str, actual: &str, expected: &str) -> Result<(), VerificationFailed> {
    if actual != expected {
        return Err(VerificationFailed::new(
            field,
            format!("{:?}", expected),
            format!("{:?}", actual),
        ));
    }
    Ok(())
}

pub fn greater_than(field: &str, actual: i64, bound: i64) -> Result<(), VerificationFailed> {
    if actual <= bound {
        return Err(VerificationFailed::new(
            field,
            format!("> {}", bound),
            actual.to_string(),
        ));
    }
    Ok(())
}

/// Fetch a text output. Missing outputs and lists fail.
pub fn require_text<'a>(outputs: &'a OutputSet, name: &str) -> Result<&'a str, VerificationFailed> {
    match outputs.get(name) {
        None => Err(VerificationFailed::new(name, "output to exist", "missing")),
        Some(value) => value
            .as_text()
            .ok_or_else(|| VerificationFailed::new(name, "text value", value.to_string())),
    }
}

/// Fetch a list output. Missing outputs and text fail.
pub fn require_list<'a>(
    outputs: &'a OutputSet,
    name: &str,
) -> Result<&'a [String], VerificationFailed> {
    match outputs.get(name) {
        None => Err(VerificationFailed::new(name, "output to exist", "missing")),
        Some(value) => value
            .as_list()
            .ok_or_else(|| VerificationFailed::new(name, "list value", value.to_string())),
    }
}

/// Required outputs are present, non-empty and follow the naming convention.
/// Returns the reference used to look the cluster up.
pub fn verify_outputs(
    outputs: &OutputSet,
    expect: &Expectations,
) -> Result<ClusterRef, VerificationFailed> {
    let cluster_name = require_text(outputs, CLUSTER_NAME)?;
    let resource_group = require_text(outputs, RESOURCE_GROUP_NAME)?;
    let location = require_text(outputs, RESOURCE_GROUP_LOCATION)?;

    non_empty(CLUSTER_NAME, cluster_name)?;
    non_empty(RESOURCE_GROUP_NAME, resource_group)?;
    non_empty(RESOURCE_GROUP_LOCATION, location)?;

    if let Some(prefix) = &expect.cluster_prefix {
        has_prefix(CLUSTER_NAME, cluster_name, prefix)?;
    }
    if let Some(prefix) = &expect.resource_group_prefix {
        has_prefix(RESOURCE_GROUP_NAME, resource_group, prefix)?;
    }

    Ok(ClusterRef {
        resource_group: resource_group.to_string(),
        name: cluster_name.to_string(),
    })
}

/// Provisioning finished, the API server has an address and the first node
/// pool has nodes.
pub fn verify_cluster_state(
    cluster: &ManagedCluster,
    expect: &Expectations,
) -> Result<(), VerificationFailed> {
    equals(
        "provisioning_state",
        &cluster.provisioning_state,
        &expect.provisioning_state,
    )?;
    non_empty("fqdn", cluster.fqdn.as_deref().unwrap_or_default())?;

    let first = cluster.agent_pool_profiles.first().ok_or_else(|| {
        VerificationFailed::new("agent_pool_profiles", "at least one node pool", "none")
    })?;
    greater_than(
        "agent_pool_profiles[0].count",
        i64::from(first.count.unwrap_or(0)),
        0,
    )
}

pub fn verify_dns(outputs: &OutputSet) -> Result<(), VerificationFailed> {
    non_empty(DNS_ZONE_NAME, require_text(outputs, DNS_ZONE_NAME)?)?;
    non_empty_list(
        DNS_ZONE_NAME_SERVERS,
        require_list(outputs, DNS_ZONE_NAME_SERVERS)?,
    )
}

pub fn verify_monitoring(
    outputs: &OutputSet,
    expect: &Expectations,
) -> Result<(), VerificationFailed> {
    let workspace = require_text(outputs, LOG_ANALYTICS_WORKSPACE_ID)?;
    non_empty(LOG_ANALYTICS_WORKSPACE_ID, workspace)?;
    contains(
        LOG_ANALYTICS_WORKSPACE_ID,
        workspace,
        &expect.monitoring_resource_type,
    )
}
