// ABOUTME: Configuration types and parsing for haven-verify.yml.
// ABOUTME: Handles suite discovery, section defaults, path resolution and scenario selection.

mod credentials;
mod deserialize;
pub mod env_file;
mod init;
mod scenario;

pub use credentials::{
    ARM_CLIENT_ID, ARM_CLIENT_SECRET, ARM_SUBSCRIPTION_ID, ARM_TENANT_ID, Credentials,
    REQUIRED_VARS,
};
pub use env_file::EnvFile;
pub use init::{TEMPLATE_YAML, init_config};
pub use scenario::ScenarioConfig;

use deserialize::deserialize_scenarios;
use nonempty::NonEmpty;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::driver::DEFAULT_PROVIDER_VERSION;
use crate::error::ConfigError;
use crate::pipeline::{PipelineMode, PipelineOptions};
use crate::precondition::{AuthorizedRangeSet, DEFAULT_LOOKUP_TIMEOUT, DEFAULT_LOOKUP_URL};
use crate::request::RequestTemplate;
use crate::retry::RetryPolicy;
use crate::scenario::ScenarioPlan;
use crate::verify::Expectations;

pub const CONFIG_FILENAME: &str = "haven-verify.yml";
pub const CONFIG_FILENAME_ALT: &str = "haven-verify.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".haven-verify/config.yml";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SuiteConfig {
    /// Optional `.env` files; the first one that exists is loaded.
    #[serde(default = "default_env_files")]
    pub env_files: Vec<PathBuf>,

    #[serde(default)]
    pub terraform: TerraformConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub precondition: PreconditionConfig,

    #[serde(default)]
    pub expectations: Expectations,

    /// Parent directory for scratch working directories.
    #[serde(default)]
    pub work_dir: Option<PathBuf>,

    #[serde(default)]
    pub base: RequestTemplate,

    #[serde(deserialize_with = "deserialize_scenarios")]
    pub scenarios: NonEmpty<ScenarioConfig>,

    /// Directory relative paths are resolved against.
    #[serde(skip)]
    root: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TerraformConfig {
    #[serde(default = "default_binary")]
    pub binary: PathBuf,

    /// Provider constraint written into generated wrapper roots.
    #[serde(default = "default_provider_version")]
    pub provider_version: String,
}

impl Default for TerraformConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            provider_version: default_provider_version(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    #[serde(default = "RetryPolicy::connectivity")]
    pub connectivity: RetryPolicy,

    #[serde(default = "RetryPolicy::once")]
    pub address_lookup: RetryPolicy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            connectivity: RetryPolicy::connectivity(),
            address_lookup: RetryPolicy::once(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PreconditionConfig {
    #[serde(default = "default_lookup_url")]
    pub lookup_url: String,

    #[serde(default = "default_lookup_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    #[serde(default)]
    pub authorized_ranges: AuthorizedRangeSet,
}

impl Default for PreconditionConfig {
    fn default() -> Self {
        Self {
            lookup_url: default_lookup_url(),
            timeout: default_lookup_timeout(),
            authorized_ranges: AuthorizedRangeSet::default(),
        }
    }
}

fn default_env_files() -> Vec<PathBuf> {
    vec![PathBuf::from(".env")]
}

fn default_binary() -> PathBuf {
    PathBuf::from("terraform")
}

fn default_provider_version() -> String {
    DEFAULT_PROVIDER_VERSION.to_string()
}

fn default_lookup_url() -> String {
    DEFAULT_LOOKUP_URL.to_string()
}

fn default_lookup_timeout() -> Duration {
    DEFAULT_LOOKUP_TIMEOUT
}

impl SuiteConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: SuiteConfig = serde_yaml::from_str(yaml)?;
        config.root = PathBuf::from(".");
        config.base.inputs.validate()?;
        for scenario in &config.scenarios {
            scenario.inputs.validate()?;
        }
        Ok(config)
    }

    /// Load `path`, resolving relative paths against its directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let root = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::load_with_root(path, root)
    }

    fn load_with_root(path: &Path, root: PathBuf) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_yaml(&content)?;
        config.root = root;
        tracing::debug!(path = %path.display(), "loaded suite configuration");
        Ok(config)
    }

    /// Find the suite file in `dir`. Relative paths resolve against `dir`.
    pub fn discover(dir: &Path) -> Result<Self, ConfigError> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load_with_root(path, dir.to_path_buf());
            }
        }

        Err(ConfigError::NotFound(dir.to_path_buf()))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub fn env_file_paths(&self) -> Vec<PathBuf> {
        self.env_files.iter().map(|p| self.resolve(p)).collect()
    }

    pub fn work_root(&self) -> Option<PathBuf> {
        self.work_dir.as_deref().map(|p| self.resolve(p))
    }

    /// Base template with its module source resolved.
    pub fn base_template(&self) -> RequestTemplate {
        self.resolved(self.base.clone())
    }

    fn resolved(&self, mut template: RequestTemplate) -> RequestTemplate {
        template.source = template.source.map(|s| s.resolved(&self.root));
        template
    }

    pub fn scenario(&self, name: &str) -> Option<&ScenarioConfig> {
        self.scenarios.iter().find(|s| s.name == name)
    }

    /// Scenarios named in `names`, in suite order. All of them when `names` is empty.
    pub fn select(&self, names: &[String]) -> Result<Vec<&ScenarioConfig>, ConfigError> {
        if let Some(unknown) = names.iter().find(|n| self.scenario(n).is_none()) {
            return Err(ConfigError::UnknownScenario(unknown.clone()));
        }
        Ok(self
            .scenarios
            .iter()
            .filter(|s| names.is_empty() || names.contains(&s.name))
            .collect())
    }

    /// Pipeline settings for `scenario`; `mode` overrides the scenario's own mode.
    pub fn pipeline_options(
        &self,
        scenario: &ScenarioConfig,
        mode: Option<PipelineMode>,
    ) -> PipelineOptions {
        PipelineOptions {
            mode: mode.or(scenario.mode).unwrap_or_default(),
            expect_plan: scenario.expect_plan,
            setup: scenario.setup.clone(),
            expectations: self.expectations.clone(),
            connectivity_retry: self.retry.connectivity,
        }
    }

    /// Runnable plans for the selected scenarios.
    pub fn plans(
        &self,
        names: &[String],
        mode: Option<PipelineMode>,
    ) -> Result<Vec<ScenarioPlan>, ConfigError> {
        Ok(self
            .select(names)?
            .into_iter()
            .map(|scenario| ScenarioPlan {
                name: scenario.name.clone(),
                overrides: self.resolved(scenario.template()),
                options: self.pipeline_options(scenario, mode),
            })
            .collect())
    }
}
