// ABOUTME: DNS-compatible cluster name validation.
// ABOUTME: Ensures generated and overridden cluster names are RFC 1123 labels.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClusterNameError {
    #[error("cluster name cannot be empty")]
    Empty,

    #[error("cluster name exceeds maximum length of 63 characters")]
    TooLong,

    #[error("cluster name cannot start with a hyphen")]
    StartsWithHyphen,

    #[error("cluster name cannot end with a hyphen")]
    EndsWithHyphen,

    #[error("cluster name must be lowercase")]
    NotLowercase,

    #[error("invalid character in cluster name: '{0}'")]
    InvalidChar(char),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClusterName(String);

impl ClusterName {
    pub fn new(value: &str) -> Result<Self, ClusterNameError> {
        if value.is_empty() {
            return Err(ClusterNameError::Empty);
        }

        if value.len() > 63 {
            return Err(ClusterNameError::TooLong);
        }

        if value.starts_with('-') {
            return Err(ClusterNameError::StartsWithHyphen);
        }

        if value.ends_with('-') {
            return Err(ClusterNameError::EndsWithHyphen);
        }

        for c in value.chars() {
            if c.is_ascii_uppercase() {
                return Err(ClusterNameError::NotLowercase);
            }
            if !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '-' {
                return Err(ClusterNameError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClusterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
