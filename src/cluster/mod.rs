// ABOUTME: Read access to the managed cluster through the cloud management API.
// ABOUTME: Defines the cluster descriptor, the ClusterApi seam and the connectivity probe.

mod arm;
mod connectivity;

pub use arm::{ArmClusterApi, DEFAULT_LOGIN_URL, DEFAULT_MANAGEMENT_URL, MANAGED_CLUSTER_API_VERSION};
pub use connectivity::{ConnectivityError, ConnectivityProbe, TcpConnectivityProbe};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::Credentials;

/// Errors from the management API.
#[derive(Debug, thiserror::Error)]
pub enum ClusterApiError {
    #[error("failed to acquire management token: {0}")]
    Token(String),

    #[error("management API request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("managed cluster {0} not found")]
    NotFound(ClusterRef),

    #[error("management API returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Identifies one managed cluster within the subscription of the credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterRef {
    pub resource_group: String,
    pub name: String,
}

impl fmt::Display for ClusterRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.resource_group, self.name)
    }
}

/// The parts of a managed cluster the pipeline asserts on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedCluster {
    #[serde(default)]
    pub provisioning_state: String,

    #[serde(default)]
    pub fqdn: Option<String>,

    #[serde(default)]
    pub private_fqdn: Option<String>,

    #[serde(default)]
    pub agent_pool_profiles: Vec<AgentPoolProfile>,
}

impl ManagedCluster {
    /// Address to probe: the public FQDN, else the private one.
    pub fn endpoint(&self) -> Option<&str> {
        self.fqdn
            .as_deref()
            .or(self.private_fqdn.as_deref())
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPoolProfile {
    pub name: String,

    #[serde(default)]
    pub count: Option<i32>,
}

#[async_trait]
pub trait ClusterApi: Send + Sync {
    async fn get_managed_cluster(
        &self,
        credentials: &Credentials,
        cluster: &ClusterRef,
    ) -> Result<ManagedCluster, ClusterApiError>;
}
