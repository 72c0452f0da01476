// ABOUTME: Named outputs read from an applied deployment.
// ABOUTME: Values are either text or an ordered list of text.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

pub const CLUSTER_NAME: &str = "cluster_name";
pub const RESOURCE_GROUP_NAME: &str = "resource_group_name";
pub const RESOURCE_GROUP_LOCATION: &str = "resource_group_location";
pub const DNS_ZONE_NAME: &str = "dns_zone_name";
pub const DNS_ZONE_NAME_SERVERS: &str = "dns_zone_name_servers";
pub const LOG_ANALYTICS_WORKSPACE_ID: &str = "log_analytics_workspace_id";

/// One output value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OutputValue {
    Text(String),
    List(Vec<String>),
}

impl OutputValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            OutputValue::Text(s) => Some(s),
            OutputValue::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            OutputValue::List(items) => Some(items),
            OutputValue::Text(_) => None,
        }
    }
}

impl fmt::Display for OutputValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputValue::Text(s) => write!(f, "{:?}", s),
            OutputValue::List(items) => write!(f, "{:?}", items),
        }
    }
}

impl From<&str> for OutputValue {
    fn from(value: &str) -> Self {
        OutputValue::Text(value.to_string())
    }
}

impl From<String> for OutputValue {
    fn from(value: String) -> Self {
        OutputValue::Text(value)
    }
}

impl From<Vec<String>> for OutputValue {
    fn from(value: Vec<String>) -> Self {
        OutputValue::List(value)
    }
}

/// Snapshot of every output at the moment it was fetched.
///
/// Read-only. Stages fetch a fresh set instead of holding on to an old one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OutputSet {
    values: BTreeMap<String, OutputValue>,
}

impl OutputSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<OutputValue>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&OutputValue> {
        self.values.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, OutputValue)> for OutputSet {
    fn from_iter<I: IntoIterator<Item = (String, OutputValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
