// ABOUTME: Azure Resource Manager client for managed cluster lookups.
// ABOUTME: Authenticates with client credentials and reads the cluster resource.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use super::{ClusterApi, ClusterApiError, ClusterRef, ManagedCluster};
use crate::config::Credentials;

pub const DEFAULT_LOGIN_URL: &str = "https://login.microsoftonline.com";
pub const DEFAULT_MANAGEMENT_URL: &str = "https://management.azure.com";
pub const MANAGED_CLUSTER_API_VERSION: &str = "2024-05-01";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct TokenErrorResponse {
    #[serde(default)]
    error: String,
    #[serde(default)]
    error_description: String,
}

#[derive(Deserialize)]
struct ManagedClusterResource {
    properties: ManagedCluster,
}

/// Reads managed clusters through the Azure Resource Manager REST API.
#[derive(Clone)]
pub struct ArmClusterApi {
    client: Client,
    login_url: String,
    management_url: String,
}

impl ArmClusterApi {
    /// # Errors
    ///
    /// Returns `ClusterApiError::Request` if the HTTP client cannot be built.
    pub fn new() -> Result<Self, ClusterApiError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            login_url: DEFAULT_LOGIN_URL.to_string(),
            management_url: DEFAULT_MANAGEMENT_URL.to_string(),
        })
    }

    /// Point the client at alternative endpoints (sovereign clouds, test servers).
    pub fn with_endpoints(
        mut self,
        login_url: impl Into<String>,
        management_url: impl Into<String>,
    ) -> Self {
        self.login_url = login_url.into().trim_end_matches('/').to_string();
        self.management_url = management_url.into().trim_end_matches('/').to_string();
        self
    }

    fn token_url(&self, credentials: &Credentials) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.login_url,
            urlencoding::encode(&credentials.tenant_id)
        )
    }

    fn cluster_url(&self, credentials: &Credentials, cluster: &ClusterRef) -> String {
        format!(
            "{}/subscriptions/{}/resourceGroups/{}/providers/Microsoft.ContainerService/managedClusters/{}?api-version={}",
            self.management_url,
            urlencoding::encode(&credentials.subscription_id),
            urlencoding::encode(&cluster.resource_group),
            urlencoding::encode(&cluster.name),
            MANAGED_CLUSTER_API_VERSION
        )
    }

    async fn token(&self, credentials: &Credentials) -> Result<String, ClusterApiError> {
        let scope = format!("{}/.default", self.management_url);
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("scope", scope.as_str()),
        ];

        let response = self
            .client
            .post(self.token_url(credentials))
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let reason = match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(err) if !err.error.is_empty() => {
                    format!("{}: {}", err.error, err.error_description)
                }
                _ => format!("status {}", status),
            };
            return Err(ClusterApiError::Token(reason));
        }

        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }
}

#[async_trait]
impl ClusterApi for ArmClusterApi {
    async fn get_managed_cluster(
        &self,
        credentials: &Credentials,
        cluster: &ClusterRef,
    ) -> Result<ManagedCluster, ClusterApiError> {
        let token = self.token(credentials).await?;

        tracing::debug!(cluster = %cluster, "fetching managed cluster");
        let response = self
            .client
            .get(self.cluster_url(credentials, cluster))
            .bearer_auth(token)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                let resource: ManagedClusterResource = response.json().await?;
                Ok(resource.properties)
            }
            StatusCode::NOT_FOUND => Err(ClusterApiError::NotFound(cluster.clone())),
            status => Err(ClusterApiError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            }),
        }
    }
}
