// ABOUTME: Precondition gating optional stages on the caller's network origin.
// ABOUTME: Fails closed: an unknown address is never treated as authorized.

mod lookup;

pub use lookup::{
    AddressLookup, DEFAULT_LOOKUP_TIMEOUT, DEFAULT_LOOKUP_URL, HttpAddressLookup, LookupError,
    parse_address,
};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use crate::error::ConfigError;
use crate::retry::{RetryPolicy, retry};
use crate::types::Cidr;

/// Ranges the cluster API server accepts connections from by default.
pub const DEFAULT_AUTHORIZED_RANGES: [&str; 3] = ["10.0.0.0/8", "172.16.0.0/12", "192.168.0.0/16"];

/// Immutable set of authorized address ranges.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct AuthorizedRangeSet {
    ranges: Vec<Cidr>,
}

impl Default for AuthorizedRangeSet {
    fn default() -> Self {
        Self {
            ranges: DEFAULT_AUTHORIZED_RANGES
                .iter()
                .filter_map(|r| Cidr::parse(r).ok())
                .collect(),
        }
    }
}

impl AuthorizedRangeSet {
    pub fn new(ranges: Vec<Cidr>) -> Self {
        Self { ranges }
    }

    pub fn parse<S: AsRef<str>>(ranges: &[S]) -> Result<Self, ConfigError> {
        let ranges = ranges
            .iter()
            .map(|r| Cidr::parse(r.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { ranges })
    }

    pub fn contains(&self, addr: &IpAddr) -> bool {
        self.ranges.iter().any(|range| range.contains(addr))
    }

    pub fn ranges(&self) -> &[Cidr] {
        &self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

/// Outcome of a precondition check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "detail", rename_all = "snake_case")]
pub enum Authorization {
    Authorized(IpAddr),
    /// The caller's address is outside every authorized range.
    Outside(IpAddr),
    /// The address could not be determined.
    Unknown(String),
}

impl Authorization {
    pub fn is_authorized(&self) -> bool {
        matches!(self, Authorization::Authorized(_))
    }
}

impl fmt::Display for Authorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Authorization::Authorized(ip) => write!(f, "caller {} is inside an authorized range", ip),
            Authorization::Outside(ip) => {
                write!(f, "caller {} is outside the authorized ranges", ip)
            }
            Authorization::Unknown(reason) => {
                write!(f, "caller address could not be determined: {}", reason)
            }
        }
    }
}

/// Decides whether the current caller may reach the cluster API server.
pub struct PreconditionChecker {
    lookup: Arc<dyn AddressLookup>,
    ranges: AuthorizedRangeSet,
    retry: RetryPolicy,
}

impl PreconditionChecker {
    pub fn new(lookup: Arc<dyn AddressLookup>, ranges: AuthorizedRangeSet) -> Self {
        Self {
            lookup,
            ranges,
            retry: RetryPolicy::once(),
        }
    }

    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    pub fn ranges(&self) -> &AuthorizedRangeSet {
        &self.ranges
    }

    pub async fn check(&self) -> Authorization {
        match retry(self.retry, "public address lookup", || self.lookup.lookup()).await {
            Ok(ip) if self.ranges.contains(&ip) => Authorization::Authorized(ip),
            Ok(ip) => Authorization::Outside(ip),
            Err(exhausted) => {
                tracing::warn!(error = %exhausted, "could not determine public address");
                Authorization::Unknown(exhausted.last_error.to_string())
            }
        }
    }

    pub async fn is_authorized(&self) -> bool {
        self.check().await.is_authorized()
    }
}
