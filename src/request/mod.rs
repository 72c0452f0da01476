// ABOUTME: Deployment request construction from layered templates.
// ABOUTME: Merges base and scenario settings and generates unique resource names.

mod inputs;

pub use inputs::{ClusterInputs, InputValue, TYPED_INPUTS};

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::Credentials;
use crate::error::ConfigError;
use crate::types::{ClusterName, UniqueId};

pub const DEFAULT_NAME_PREFIX: &str = "haven-test";
pub const DEFAULT_SHORT_PREFIX: &str = "hvn";
pub const DEFAULT_DOMAIN_SUFFIX: &str = "example.com";

/// Where the root configuration handed to the provisioning tool comes from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleSource {
    /// A complete root module directory, copied into a scratch directory.
    /// When `root` is set the whole tree under it is copied so that relative
    /// module references from `path` keep resolving.
    Example {
        path: PathBuf,
        #[serde(default)]
        root: Option<PathBuf>,
    },
    /// A reusable module, wrapped in a generated root configuration.
    Module {
        path: PathBuf,
        /// Renames applied to input names when rendering the module block.
        #[serde(default)]
        aliases: BTreeMap<String, String>,
    },
}

impl ModuleSource {
    pub fn path(&self) -> &Path {
        match self {
            ModuleSource::Example { path, .. } => path,
            ModuleSource::Module { path, .. } => path,
        }
    }

    /// Resolve a relative path against `root`.
    pub fn resolved(&self, root: &Path) -> ModuleSource {
        let join = |p: &Path| {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                root.join(p)
            }
        };
        match self {
            ModuleSource::Example { path, root } => ModuleSource::Example {
                path: join(path),
                root: root.as_deref().map(join),
            },
            ModuleSource::Module { path, aliases } => ModuleSource::Module {
                path: join(path),
                aliases: aliases.clone(),
            },
        }
    }
}

/// How generated cluster names are shaped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameStyle {
    /// `{prefix}-{id}`
    #[default]
    Standard,
    /// `{prefix}-{scenario[..3]}-{id[..6]}`, for resources with tight name limits.
    Short,
}

/// One layer of request settings. Scenario layers override the base layer.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestTemplate {
    #[serde(default)]
    pub source: Option<ModuleSource>,

    #[serde(default)]
    pub name_prefix: Option<String>,

    #[serde(default)]
    pub name_style: Option<NameStyle>,

    #[serde(default)]
    pub domain_suffix: Option<String>,

    #[serde(default)]
    pub inputs: ClusterInputs,
}

impl RequestTemplate {
    pub fn merged(&self, overrides: &RequestTemplate) -> RequestTemplate {
        RequestTemplate {
            source: overrides.source.clone().or_else(|| self.source.clone()),
            name_prefix: overrides
                .name_prefix
                .clone()
                .or_else(|| self.name_prefix.clone()),
            name_style: overrides.name_style.or(self.name_style),
            domain_suffix: overrides
                .domain_suffix
                .clone()
                .or_else(|| self.domain_suffix.clone()),
            inputs: self.inputs.merged(&overrides.inputs),
        }
    }
}

/// A fully resolved request for one scenario run.
#[derive(Debug, Clone)]
pub struct DeploymentRequest {
    pub scenario: String,
    pub id: UniqueId,
    pub cluster_name: ClusterName,
    pub source: ModuleSource,
    pub inputs: ClusterInputs,
    pub credentials: Credentials,
    /// Parent directory for the scratch working directory (system temp if unset).
    pub work_root: Option<PathBuf>,
}

impl DeploymentRequest {
    pub fn variables(&self) -> BTreeMap<String, InputValue> {
        self.inputs.to_variables()
    }

    pub fn with_work_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.work_root = Some(root.into());
        self
    }
}

/// Build a request by layering `overrides` onto `base`.
///
/// Generates a fresh [`UniqueId`] and derives `cluster_name` and `domain_name`
/// from it unless either is set explicitly.
///
/// # Errors
///
/// Returns `ConfigError::MissingModule` if neither layer names a module
/// source, and other `ConfigError` variants for invalid inputs.
pub fn build(
    scenario: &str,
    base: &RequestTemplate,
    overrides: &RequestTemplate,
    credentials: Credentials,
) -> Result<DeploymentRequest, ConfigError> {
    let template = base.merged(overrides);
    let source = template.source.ok_or(ConfigError::MissingModule)?;
    let mut inputs = template.inputs;
    inputs.validate()?;

    let id = UniqueId::generate();
    let style = template.name_style.unwrap_or_default();

    let name = match inputs.cluster_name.clone() {
        Some(name) => name,
        None => generated_name(scenario, template.name_prefix.as_deref(), style, &id),
    };
    let cluster_name = ClusterName::new(&name)
        .map_err(|source| ConfigError::InvalidClusterName { name, source })?;

    if inputs.domain_name.is_none() {
        let suffix = template
            .domain_suffix
            .as_deref()
            .unwrap_or(DEFAULT_DOMAIN_SUFFIX);
        inputs.domain_name = Some(format!("{}.{}", cluster_name, suffix));
    }
    inputs.cluster_name = Some(cluster_name.to_string());

    tracing::debug!(scenario, cluster = %cluster_name, "built deployment request");

    Ok(DeploymentRequest {
        scenario: scenario.to_string(),
        id,
        cluster_name,
        source,
        inputs,
        credentials,
        work_root: None,
    })
}

fn generated_name(scenario: &str, prefix: Option<&str>, style: NameStyle, id: &UniqueId) -> String {
    match style {
        NameStyle::Standard => {
            format!("{}-{}", prefix.unwrap_or(DEFAULT_NAME_PREFIX), id)
        }
        NameStyle::Short => {
            let tag: String = scenario
                .chars()
                .take(3)
                .collect::<String>()
                .to_lowercase();
            format!(
                "{}-{}-{}",
                prefix.unwrap_or(DEFAULT_SHORT_PREFIX),
                tag,
                id.short(6)
            )
        }
    }
}
