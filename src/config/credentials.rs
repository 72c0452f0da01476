// ABOUTME: Azure service principal credential bundle.
// ABOUTME: Read once from the environment and passed explicitly to every external call.

use std::collections::HashMap;
use std::fmt;

use crate::error::ConfigError;

pub const ARM_TENANT_ID: &str = "ARM_TENANT_ID";
pub const ARM_SUBSCRIPTION_ID: &str = "ARM_SUBSCRIPTION_ID";
pub const ARM_CLIENT_ID: &str = "ARM_CLIENT_ID";
pub const ARM_CLIENT_SECRET: &str = "ARM_CLIENT_SECRET";

/// Variables that must be present before any scenario runs.
pub const REQUIRED_VARS: [&str; 4] = [
    ARM_TENANT_ID,
    ARM_SUBSCRIPTION_ID,
    ARM_CLIENT_ID,
    ARM_CLIENT_SECRET,
];

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub tenant_id: String,
    pub subscription_id: String,
    pub client_id: String,
    pub client_secret: String,
}

impl Credentials {
    /// Read the bundle from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the bundle through an arbitrary lookup. Empty values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
        };

        Ok(Self {
            tenant_id: get(ARM_TENANT_ID)?,
            subscription_id: get(ARM_SUBSCRIPTION_ID)?,
            client_id: get(ARM_CLIENT_ID)?,
            client_secret: get(ARM_CLIENT_SECRET)?,
        })
    }

    /// Names of required variables that are missing or empty.
    pub fn missing_vars<F>(lookup: F) -> Vec<&'static str>
    where
        F: Fn(&str) -> Option<String>,
    {
        REQUIRED_VARS
            .into_iter()
            .filter(|key| lookup(key).is_none_or(|v| v.trim().is_empty()))
            .collect()
    }

    /// Environment for child processes of the provisioning tool.
    pub fn to_env(&self) -> HashMap<String, String> {
        let mut env = HashMap::new();
        env.insert(ARM_TENANT_ID.to_string(), self.tenant_id.clone());
        env.insert(ARM_SUBSCRIPTION_ID.to_string(), self.subscription_id.clone());
        env.insert(ARM_CLIENT_ID.to_string(), self.client_id.clone());
        env.insert(ARM_CLIENT_SECRET.to_string(), self.client_secret.clone());
        env
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("tenant_id", &self.tenant_id)
            .field("subscription_id", &self.subscription_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}
