use std::collections::BTreeMap;
use std::path::Path;

use guild_ledger::{EventLog, OwnershipRegistry, VotingPowerTracker};
use guild_roles::RoleAuthority;
use guild_types::AccountId;
use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, RegistryResult};

/// Display metadata fixed at initialization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub name: String,
    pub symbol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_uri: Option<String>,
}

/// Complete registry state; also the on-disk snapshot format.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryState {
    pub metadata: Metadata,
    pub roles: RoleAuthority,
    pub ownership: OwnershipRegistry,
    pub votes: VotingPowerTracker,
    /// Next expected delegation-voucher nonce per signer.
    #[serde(default)]
    pub nonces: BTreeMap<AccountId, u64>,
    pub events: EventLog,
}

impl RegistryState {
    pub fn new(metadata: Metadata) -> Self {
        Self {
            metadata,
            roles: RoleAuthority::new(),
            ownership: OwnershipRegistry::new(),
            votes: VotingPowerTracker::new(),
            nonces: BTreeMap::new(),
            events: EventLog::new(),
        }
    }

    pub fn nonce_of(&self, account: &AccountId) -> u64 {
        self.nonces.get(account).copied().unwrap_or(0)
    }

    /// Check a loaded snapshot: the event chain, role grants, and ownership
    /// records, then voting weight against current holdings.
    pub fn validate(&self) -> RegistryResult<()> {
        self.events.verify()?;
        self.roles.check_consistency()?;
        self.ownership.check_consistency()?;
        self.votes.check_consistency(self.ownership.holders())?;
        Ok(())
    }

    pub fn to_json(&self) -> RegistryResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| RegistryError::Serialization(e.to_string()))
    }

    pub fn from_json(s: &str) -> RegistryResult<Self> {
        serde_json::from_str(s).map_err(|e| RegistryError::Serialization(e.to_string()))
    }

    /// Write the snapshot, replacing any existing file.
    pub fn save(&self, path: impl AsRef<Path>) -> RegistryResult<()> {
        let path = path.as_ref();
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, self.to_json()?)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> RegistryResult<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }
}
