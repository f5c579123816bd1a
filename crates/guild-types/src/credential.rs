use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a single membership credential.
///
/// Assigned monotonically from 0 and never reused once burned.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialId(pub u64);

impl CredentialId {
    pub fn value(&self) -> u64 {
        self.0
    }

    /// The identifier `offset` positions after this one.
    pub fn offset(&self, offset: u64) -> Self {
        Self(self.0 + offset)
    }
}

impl From<u64> for CredentialId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Debug for CredentialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CredentialId({})", self.0)
    }
}

impl fmt::Display for CredentialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
