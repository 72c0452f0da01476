// ABOUTME: Output and resource-state verification.
// ABOUTME: Pure assertion functions that report the field, expectation and actual value.

mod checks;
mod outputs;

pub use checks::{
    Expectations, contains, equals, greater_than, has_prefix, non_empty, non_empty_list,
    require_list, require_text, verify_cluster_state, verify_dns, verify_monitoring,
    verify_outputs,
};
pub use outputs::{
    CLUSTER_NAME, DNS_ZONE_NAME, DNS_ZONE_NAME_SERVERS, LOG_ANALYTICS_WORKSPACE_ID, OutputSet,
    OutputValue, RESOURCE_GROUP_LOCATION, RESOURCE_GROUP_NAME,
};

/// An assertion that did not hold.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: expected {expected}, got {actual}")]
pub struct VerificationFailed {
    pub field: String,
    pub expected: String,
    pub actual: String,
}

impl VerificationFailed {
    pub fn new(
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}
