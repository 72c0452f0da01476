// ABOUTME: Application-wide error types for haven-verify.
// ABOUTME: Uses thiserror for configuration and top-level command failures.

use std::path::PathBuf;
use thiserror::Error;

use crate::cluster::ClusterApiError;
use crate::precondition::LookupError;
use crate::types::{CidrError, ClusterNameError};

/// Malformed or missing configuration. Raised before any external call.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found in {0}")]
    NotFound(PathBuf),

    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("deployment request has no module source")]
    MissingModule,

    #[error("unknown scenario: {0}")]
    UnknownScenario(String),

    #[error("input '{0}' is defined both as a typed field and in extra inputs")]
    DuplicateInput(String),

    #[error("input '{name}' expects {expected}")]
    InputShape { name: String, expected: &'static str },

    #[error("invalid cluster name '{name}': {source}")]
    InvalidClusterName {
        name: String,
        source: ClusterNameError,
    },

    #[error("invalid address range: {0}")]
    InvalidRange(#[from] CidrError),

    #[error("retry policy requires at least one attempt")]
    InvalidRetryPolicy,

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse env file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("management API client: {0}")]
    ClusterApi(#[from] ClusterApiError),

    #[error("address lookup client: {0}")]
    Lookup(#[from] LookupError),

    #[error("{failed} of {total} scenario(s) failed")]
    ScenariosFailed { failed: usize, total: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
