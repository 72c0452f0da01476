// ABOUTME: CIDR address range parsing and prefix membership.
// ABOUTME: Handles IPv4 and IPv6 ranges like 10.0.0.0/8 or fd00::/8.

use serde::{Deserialize, Deserializer};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CidrError {
    #[error("CIDR range cannot be empty")]
    Empty,

    #[error("invalid address in CIDR range: {0}")]
    InvalidAddress(String),

    #[error("invalid prefix length in CIDR range: {0}")]
    InvalidPrefix(String),
}

/// An address range in CIDR notation. A bare address is a single-host range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cidr {
    network: IpAddr,
    prefix: u8,
}

impl Cidr {
    pub fn parse(input: &str) -> Result<Self, CidrError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(CidrError::Empty);
        }

        let (addr, prefix) = match input.split_once('/') {
            Some((addr, prefix)) => (addr, Some(prefix)),
            None => (input, None),
        };

        let network = IpAddr::from_str(addr)
            .map_err(|_| CidrError::InvalidAddress(addr.to_string()))?;

        let max = max_prefix(&network);
        let prefix = match prefix {
            Some(p) => {
                let value: u8 = p
                    .parse()
                    .map_err(|_| CidrError::InvalidPrefix(p.to_string()))?;
                if value > max {
                    return Err(CidrError::InvalidPrefix(p.to_string()));
                }
                value
            }
            None => max,
        };

        Ok(Self { network, prefix })
    }

    pub fn network(&self) -> IpAddr {
        self.network
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// Whether `addr` falls inside this range. Addresses of the other family
    /// never match.
    pub fn contains(&self, addr: &IpAddr) -> bool {
        match (self.network, addr) {
            (IpAddr::V4(net), IpAddr::V4(candidate)) => {
                let mask = mask_u32(self.prefix);
                u32::from(net) & mask == u32::from(*candidate) & mask
            }
            (IpAddr::V6(net), IpAddr::V6(candidate)) => {
                let mask = mask_u128(self.prefix);
                u128::from(net) & mask == u128::from(*candidate) & mask
            }
            _ => false,
        }
    }
}

fn max_prefix(addr: &IpAddr) -> u8 {
    match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

fn mask_u32(prefix: u8) -> u32 {
    match prefix {
        0 => 0,
        p => u32::MAX << (32 - u32::from(p)),
    }
}

fn mask_u128(prefix: u8) -> u128 {
    match prefix {
        0 => 0,
        p => u128::MAX << (128 - u32::from(p)),
    }
}

impl FromStr for Cidr {
    type Err = CidrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix)
    }
}

impl<'de> Deserialize<'de> for Cidr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Cidr::parse(&s).map_err(serde::de::Error::custom)
    }
}
