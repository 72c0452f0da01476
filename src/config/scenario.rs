// ABOUTME: Per-scenario configuration: request overrides plus pipeline settings.
// ABOUTME: Scenario values take precedence over the suite's base template.

use serde::Deserialize;

use crate::driver::PlanOutcome;
use crate::pipeline::{PipelineMode, PrerequisiteSetup};
use crate::request::{ClusterInputs, ModuleSource, NameStyle, RequestTemplate};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    pub name: String,

    #[serde(default)]
    pub mode: Option<PipelineMode>,

    #[serde(default)]
    pub expect_plan: Option<PlanOutcome>,

    #[serde(default)]
    pub setup: Option<PrerequisiteSetup>,

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

impl ScenarioConfig {
    /// The request layer this scenario puts on top of the base template.
    pub fn template(&self) -> RequestTemplate {
        RequestTemplate {
            source: self.source.clone(),
            name_prefix: self.name_prefix.clone(),
            name_style: self.name_style,
            domain_suffix: self.domain_suffix.clone(),
            inputs: self.inputs.clone(),
        }
    }
}
