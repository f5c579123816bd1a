use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Named permission grantable per account.
///
/// Serialized as its lowercase name so it can key JSON maps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Capability {
    /// Mint new credentials.
    Issue,
    /// Burn any credential, single or batched.
    Revoke,
    /// Grant and revoke every capability, including this one.
    RoleAdmin,
    /// Authorize replacing the code behind the registry.
    UpgradeAdmin,
}

impl Capability {
    pub const ALL: [Capability; 4] = [
        Capability::Issue,
        Capability::Revoke,
        Capability::RoleAdmin,
        Capability::UpgradeAdmin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Issue => "issue",
            Self::Revoke => "revoke",
            Self::RoleAdmin => "role-admin",
            Self::UpgradeAdmin => "upgrade-admin",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Capability {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|cap| cap.as_str() == s)
            .ok_or_else(|| TypeError::UnknownCapability(s.to_string()))
    }
}

impl Serialize for Capability {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Capability {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
