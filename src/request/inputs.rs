// ABOUTME: Typed input parameters of the Haven AKS module.
// ABOUTME: Field-wise merging and rendering to provisioning-tool variables.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ConfigError;

/// A single input value handed to the provisioning tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputValue {
    Bool(bool),
    Integer(i64),
    String(String),
    List(Vec<String>),
    Map(BTreeMap<String, serde_json::Value>),
}

impl From<bool> for InputValue {
    fn from(value: bool) -> Self {
        InputValue::Bool(value)
    }
}

impl From<u32> for InputValue {
    fn from(value: u32) -> Self {
        InputValue::Integer(i64::from(value))
    }
}

impl From<String> for InputValue {
    fn from(value: String) -> Self {
        InputValue::String(value)
    }
}

impl From<Vec<String>> for InputValue {
    fn from(value: Vec<String>) -> Self {
        InputValue::List(value)
    }
}

impl From<BTreeMap<String, serde_json::Value>> for InputValue {
    fn from(value: BTreeMap<String, serde_json::Value>) -> Self {
        InputValue::Map(value)
    }
}

/// The enumerated input set accepted by the module. Every field is optional
/// so that a base configuration and scenario overrides can be layered.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClusterInputs {
    pub cluster_name: Option<String>,
    pub location: Option<String>,
    pub domain_name: Option<String>,
    pub kubernetes_version: Option<String>,

    pub vnet_address_space: Option<Vec<String>>,
    pub subnet_address_prefixes: Option<Vec<String>>,
    pub vnet_peerings: Option<Vec<String>>,

    pub default_node_pool_vm_size: Option<String>,
    pub default_node_pool_node_count: Option<u32>,
    pub enable_auto_scaling: Option<bool>,
    pub min_node_count: Option<u32>,
    pub max_node_count: Option<u32>,
    pub additional_node_pools: Option<BTreeMap<String, serde_json::Value>>,

    pub sku_tier: Option<String>,
    pub enable_keda: Option<bool>,
    pub enable_vpa: Option<bool>,
    pub private_cluster_enabled: Option<bool>,

    pub loadbalancer_ips: Option<Vec<String>>,
    pub internal_loadbalancer_ip: Option<String>,
    pub create_dns_records: Option<bool>,

    pub existing_log_analytics_workspace_id: Option<String>,
    pub existing_subnet_name: Option<String>,
    pub existing_vnet_name: Option<String>,
    pub existing_vnet_resource_group_name: Option<String>,
    pub existing_dns_zone_name: Option<String>,
    pub existing_dns_zone_resource_group_name: Option<String>,

    /// Inputs the typed set does not cover yet.
    #[serde(default)]
    pub extra: BTreeMap<String, InputValue>,
}

/// Names of the typed fields, in rendering order.
pub const TYPED_INPUTS: [&str; 26] = [
    "cluster_name",
    "location",
    "domain_name",
    "kubernetes_version",
    "vnet_address_space",
    "subnet_address_prefixes",
    "vnet_peerings",
    "default_node_pool_vm_size",
    "default_node_pool_node_count",
    "enable_auto_scaling",
    "min_node_count",
    "max_node_count",
    "additional_node_pools",
    "sku_tier",
    "enable_keda",
    "enable_vpa",
    "private_cluster_enabled",
    "loadbalancer_ips",
    "internal_loadbalancer_ip",
    "create_dns_records",
    "existing_log_analytics_workspace_id",
    "existing_subnet_name",
    "existing_vnet_name",
    "existing_vnet_resource_group_name",
    "existing_dns_zone_name",
    "existing_dns_zone_resource_group_name",
];

impl ClusterInputs {
    /// Layer `overrides` on top of `self`. A field set in `overrides` wins.
    pub fn merged(&self, overrides: &ClusterInputs) -> ClusterInputs {
        let mut extra = self.extra.clone();
        for (k, v) in &overrides.extra {
            extra.insert(k.clone(), v.clone());
        }

        ClusterInputs {
            cluster_name: pick(&self.cluster_name, &overrides.cluster_name),
            location: pick(&self.location, &overrides.location),
            domain_name: pick(&self.domain_name, &overrides.domain_name),
            kubernetes_version: pick(&self.kubernetes_version, &overrides.kubernetes_version),
            vnet_address_space: pick(&self.vnet_address_space, &overrides.vnet_address_space),
            subnet_address_prefixes: pick(
                &self.subnet_address_prefixes,
                &overrides.subnet_address_prefixes,
            ),
            vnet_peerings: pick(&self.vnet_peerings, &overrides.vnet_peerings),
            default_node_pool_vm_size: pick(
                &self.default_node_pool_vm_size,
                &overrides.default_node_pool_vm_size,
            ),
            default_node_pool_node_count: pick(
                &self.default_node_pool_node_count,
                &overrides.default_node_pool_node_count,
            ),
            enable_auto_scaling: pick(&self.enable_auto_scaling, &overrides.enable_auto_scaling),
            min_node_count: pick(&self.min_node_count, &overrides.min_node_count),
            max_node_count: pick(&self.max_node_count, &overrides.max_node_count),
            additional_node_pools: pick(
                &self.additional_node_pools,
                &overrides.additional_node_pools,
            ),
            sku_tier: pick(&self.sku_tier, &overrides.sku_tier),
            enable_keda: pick(&self.enable_keda, &overrides.enable_keda),
            enable_vpa: pick(&self.enable_vpa, &overrides.enable_vpa),
            private_cluster_enabled: pick(
                &self.private_cluster_enabled,
                &overrides.private_cluster_enabled,
            ),
            loadbalancer_ips: pick(&self.loadbalancer_ips, &overrides.loadbalancer_ips),
            internal_loadbalancer_ip: pick(
                &self.internal_loadbalancer_ip,
                &overrides.internal_loadbalancer_ip,
            ),
            create_dns_records: pick(&self.create_dns_records, &overrides.create_dns_records),
            existing_log_analytics_workspace_id: pick(
                &self.existing_log_analytics_workspace_id,
                &overrides.existing_log_analytics_workspace_id,
            ),
            existing_subnet_name: pick(&self.existing_subnet_name, &overrides.existing_subnet_name),
            existing_vnet_name: pick(&self.existing_vnet_name, &overrides.existing_vnet_name),
            existing_vnet_resource_group_name: pick(
                &self.existing_vnet_resource_group_name,
                &overrides.existing_vnet_resource_group_name,
            ),
            existing_dns_zone_name: pick(
                &self.existing_dns_zone_name,
                &overrides.existing_dns_zone_name,
            ),
            existing_dns_zone_resource_group_name: pick(
                &self.existing_dns_zone_resource_group_name,
                &overrides.existing_dns_zone_resource_group_name,
            ),
            extra,
        }
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(name) = self.extra.keys().find(|k| TYPED_INPUTS.contains(&k.as_str())) {
            return Err(ConfigError::DuplicateInput(name.clone()));
        }

        if let (Some(min), Some(max)) = (self.min_node_count, self.max_node_count)
            && min > max
        {
            return Err(ConfigError::Invalid(format!(
                "min_node_count ({}) exceeds max_node_count ({})",
                min, max
            )));
        }

        Ok(())
    }

    /// Set an input by name. Typed names go to their field and must carry
    /// that field's shape; unknown names go to `extra`. Cross-field
    /// constraints are checked again afterwards.
    pub fn set(&mut self, name: &str, value: InputValue) -> Result<(), ConfigError> {
        match name {
            "cluster_name" => {
                return Err(ConfigError::Invalid(
                    "cluster_name is fixed when the request is built".to_string(),
                ));
            }
            "location" => self.location = Some(text(name, value)?),
            "domain_name" => self.domain_name = Some(text(name, value)?),
            "kubernetes_version" => self.kubernetes_version = Some(text(name, value)?),
            "vnet_address_space" => self.vnet_address_space = Some(list(name, value)?),
            "subnet_address_prefixes" => {
                self.subnet_address_prefixes = Some(list(name, value)?)
            }
            "vnet_peerings" => self.vnet_peerings = Some(list(name, value)?),
            "default_node_pool_vm_size" => {
                self.default_node_pool_vm_size = Some(text(name, value)?)
            }
            "default_node_pool_node_count" => {
                self.default_node_pool_node_count = Some(count(name, value)?)
            }
            "enable_auto_scaling" => self.enable_auto_scaling = Some(flag(name, value)?),
            "min_node_count" => self.min_node_count = Some(count(name, value)?),
            "max_node_count" => self.max_node_count = Some(count(name, value)?),
            "additional_node_pools" => match value {
                InputValue::Map(map) => self.additional_node_pools = Some(map),
                _ => return Err(shape(name, "a map")),
            },
            "sku_tier" => self.sku_tier = Some(text(name, value)?),
            "enable_keda" => self.enable_keda = Some(flag(name, value)?),
            "enable_vpa" => self.enable_vpa = Some(flag(name, value)?),
            "private_cluster_enabled" => {
                self.private_cluster_enabled = Some(flag(name, value)?)
            }
            "loadbalancer_ips" => self.loadbalancer_ips = Some(list(name, value)?),
            "internal_loadbalancer_ip" => {
                self.internal_loadbalancer_ip = Some(text(name, value)?)
            }
            "create_dns_records" => self.create_dns_records = Some(flag(name, value)?),
            "existing_log_analytics_workspace_id" => {
                self.existing_log_analytics_workspace_id = Some(text(name, value)?)
            }
            "existing_subnet_name" => self.existing_subnet_name = Some(text(name, value)?),
            "existing_vnet_name" => self.existing_vnet_name = Some(text(name, value)?),
            "existing_vnet_resource_group_name" => {
                self.existing_vnet_resource_group_name = Some(text(name, value)?)
            }
            "existing_dns_zone_name" => self.existing_dns_zone_name = Some(text(name, value)?),
            "existing_dns_zone_resource_group_name" => {
                self.existing_dns_zone_resource_group_name = Some(text(name, value)?)
            }
            _ => {
                self.extra.insert(name.to_string(), value);
            }
        }
        self.validate()
    }

    /// Render the set fields as a name → value mapping.
    pub fn to_variables(&self) -> BTreeMap<String, InputValue> {
        let mut vars = BTreeMap::new();
        let mut put = |name: &str, value: Option<InputValue>| {
            if let Some(value) = value {
                vars.insert(name.to_string(), value);
            }
        };

        put("cluster_name", self.cluster_name.clone().map(Into::into));
        put("location", self.location.clone().map(Into::into));
        put("domain_name", self.domain_name.clone().map(Into::into));
        put("kubernetes_version", self.kubernetes_version.clone().map(Into::into));
        put("vnet_address_space", self.vnet_address_space.clone().map(Into::into));
        put(
            "subnet_address_prefixes",
            self.subnet_address_prefixes.clone().map(Into::into),
        );
        put("vnet_peerings", self.vnet_peerings.clone().map(Into::into));
        put(
            "default_node_pool_vm_size",
            self.default_node_pool_vm_size.clone().map(Into::into),
        );
        put(
            "default_node_pool_node_count",
            self.default_node_pool_node_count.map(Into::into),
        );
        put("enable_auto_scaling", self.enable_auto_scaling.map(Into::into));
        put("min_node_count", self.min_node_count.map(Into::into));
        put("max_node_count", self.max_node_count.map(Into::into));
        put(
            "additional_node_pools",
            self.additional_node_pools.clone().map(Into::into),
        );
        put("sku_tier", self.sku_tier.clone().map(Into::into));
        put("enable_keda", self.enable_keda.map(Into::into));
        put("enable_vpa", self.enable_vpa.map(Into::into));
        put(
            "private_cluster_enabled",
            self.private_cluster_enabled.map(Into::into),
        );
        put("loadbalancer_ips", self.loadbalancer_ips.clone().map(Into::into));
        put(
            "internal_loadbalancer_ip",
            self.internal_loadbalancer_ip.clone().map(Into::into),
        );
        put("create_dns_records", self.create_dns_records.map(Into::into));
        put(
            "existing_log_analytics_workspace_id",
            self.existing_log_analytics_workspace_id.clone().map(Into::into),
        );
        put(
            "existing_subnet_name",
            self.existing_subnet_name.clone().map(Into::into),
        );
        put("existing_vnet_name", self.existing_vnet_name.clone().map(Into::into));
        put(
            "existing_vnet_resource_group_name",
            self.existing_vnet_resource_group_name.clone().map(Into::into),
        );
        put(
            "existing_dns_zone_name",
            self.existing_dns_zone_name.clone().map(Into::into),
        );
        put(
            "existing_dns_zone_resource_group_name",
            self.existing_dns_zone_resource_group_name.clone().map(Into::into),
        );

        for (k, v) in &self.extra {
            vars.insert(k.clone(), v.clone());
        }

        vars
    }
}

fn pick<T: Clone>(base: &Option<T>, overrides: &Option<T>) -> Option<T> {
    overrides.clone().or_else(|| base.clone())
}

fn shape(name: &str, expected: &'static str) -> ConfigError {
    ConfigError::InputShape {
        name: name.to_string(),
        expected,
    }
}

fn text(name: &str, value: InputValue) -> Result<String, ConfigError> {
    match value {
        InputValue::String(v) => Ok(v),
        _ => Err(shape(name, "a string")),
    }
}

fn list(name: &str, value: InputValue) -> Result<Vec<String>, ConfigError> {
    match value {
        InputValue::List(v) => Ok(v),
        InputValue::String(v) => Ok(vec![v]),
        _ => Err(shape(name, "a list of strings")),
    }
}

fn flag(name: &str, value: InputValue) -> Result<bool, ConfigError> {
    match value {
        InputValue::Bool(v) => Ok(v),
        InputValue::String(v) => v.parse().map_err(|_| shape(name, "a boolean")),
        _ => Err(shape(name, "a boolean")),
    }
}

fn count(name: &str, value: InputValue) -> Result<u32, ConfigError> {
    match value {
        InputValue::Integer(v) => u32::try_from(v).map_err(|_| shape(name, "a non-negative integer")),
        InputValue::String(v) => v.parse().map_err(|_| shape(name, "a non-negative integer")),
        _ => Err(shape(name, "a non-negative integer")),
    }
}
