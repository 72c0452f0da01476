// ABOUTME: Collision-resistant, human-legible identifiers for test runs.
// ABOUTME: Encodes random UUID bits as a short lowercase base36 string.

use std::fmt;
use uuid::Uuid;

const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Length of a generated identifier (36^10 possible values).
pub const UNIQUE_ID_LEN: usize = 10;

/// A per-run identifier embedded in resource names so concurrent runs never
/// target the same infrastructure.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UniqueId(String);

impl UniqueId {
    /// Generate a fresh identifier from a v4 UUID.
    pub fn generate() -> Self {
        let mut bits = Uuid::new_v4().as_u128();
        let mut out = String::with_capacity(UNIQUE_ID_LEN);
        for _ in 0..UNIQUE_ID_LEN {
            out.push(char::from(ALPHABET[(bits % 36) as usize]));
            bits /= 36;
        }
        Self(out)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading `len` characters, for resources with tight name limits.
    pub fn short(&self, len: usize) -> &str {
        &self.0[..len.min(self.0.len())]
    }
}

impl fmt::Display for UniqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
