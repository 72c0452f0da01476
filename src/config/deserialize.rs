// ABOUTME: Custom serde deserializers for config types.
// ABOUTME: Enforces a non-empty list of uniquely named scenarios.

use nonempty::NonEmpty;
use serde::Deserialize;
use std::collections::HashSet;

use super::ScenarioConfig;

pub fn deserialize_scenarios<'de, D>(deserializer: D) -> Result<NonEmpty<ScenarioConfig>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let scenarios: Vec<ScenarioConfig> = Vec::deserialize(deserializer)?;

    let mut seen = HashSet::new();
    for scenario in &scenarios {
        if scenario.name.trim().is_empty() {
            return Err(serde::de::Error::custom("scenario name cannot be empty"));
        }
        if !seen.insert(scenario.name.as_str()) {
            return Err(serde::de::Error::custom(format!(
                "duplicate scenario name: {}",
                scenario.name
            )));
        }
    }

    NonEmpty::from_vec(scenarios)
        .ok_or_else(|| serde::de::Error::custom("at least one scenario is required"))
}
