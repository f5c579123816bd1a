use std::collections::{BTreeMap, BTreeSet};

use guild_types::{AccountId, Capability};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RoleError;

/// Whether a [`RoleChange`] added or removed a grant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoleChangeKind {
    Granted,
    Revoked,
}

/// Record of a grant set actually changing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleChange {
    pub kind: RoleChangeKind,
    pub capability: Capability,
    pub account: AccountId,
    /// The account that performed the change.
    pub sender: AccountId,
}

/// Capability grants per account.
///
/// Every capability is administered by [`Capability::RoleAdmin`]. Nothing
/// prevents the last role-admin from revoking or renouncing itself; lockout
/// is avoided by seeding at setup time.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAuthority {
    grants: BTreeMap<Capability, BTreeSet<AccountId>>,
}

impl RoleAuthority {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_capability(&self, account: &AccountId, capability: Capability) -> bool {
        self.grants
            .get(&capability)
            .is_some_and(|holders| holders.contains(account))
    }

    /// Fail with [`RoleError::Unauthorized`] unless `account` holds `capability`.
    pub fn require(&self, account: &AccountId, capability: Capability) -> Result<(), RoleError> {
        if self.has_capability(account, capability) {
            Ok(())
        } else {
            Err(RoleError::Unauthorized {
                account: *account,
                capability,
            })
        }
    }

    /// Fail if a deserialized authority grants anything to the null account.
    pub fn check_consistency(&self) -> Result<(), RoleError> {
        if self
            .grants
            .values()
            .any(|holders| holders.contains(&AccountId::NULL))
        {
            return Err(RoleError::InvalidAccount);
        }
        Ok(())
    }

    /// The capability whose holders may grant and revoke `capability`.
    pub fn admin_of(_capability: Capability) -> Capability {
        Capability::RoleAdmin
    }

    /// Holders of `capability`, in account order.
    pub fn members(&self, capability: Capability) -> Vec<AccountId> {
        self.grants
            .get(&capability)
            .map(|holders| holders.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Capabilities held by `account`.
    pub fn capabilities_of(&self, account: &AccountId) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|cap| self.has_capability(account, *cap))
            .collect()
    }

    /// Ungated grant used while seeding the initial administrators.
    pub fn seed(
        &mut self,
        sender: AccountId,
        capability: Capability,
        account: AccountId,
    ) -> Result<Option<RoleChange>, RoleError> {
        if account.is_null() {
            return Err(RoleError::InvalidAccount);
        }
        Ok(self.insert(sender, capability, account))
    }

    /// Grant `capability` to `account`. Returns `None` if it was already held.
    pub fn grant(
        &mut self,
        caller: AccountId,
        capability: Capability,
        account: AccountId,
    ) -> Result<Option<RoleChange>, RoleError> {
        self.require(&caller, Self::admin_of(capability))?;
        if account.is_null() {
            return Err(RoleError::InvalidAccount);
        }
        Ok(self.insert(caller, capability, account))
    }

    /// Revoke `capability` from `account`. Returns `None` if it was not held.
    pub fn revoke(
        &mut self,
        caller: AccountId,
        capability: Capability,
        account: AccountId,
    ) -> Result<Option<RoleChange>, RoleError> {
        self.require(&caller, Self::admin_of(capability))?;
        Ok(self.remove(caller, capability, account))
    }

    /// Drop one of the caller's own capabilities.
    ///
    /// `confirmation` must repeat the caller's account.
    pub fn renounce(
        &mut self,
        caller: AccountId,
        capability: Capability,
        confirmation: AccountId,
    ) -> Result<Option<RoleChange>, RoleError> {
        if caller != confirmation {
            return Err(RoleError::BadConfirmation);
        }
        Ok(self.remove(caller, capability, caller))
    }

    fn insert(
        &mut self,
        sender: AccountId,
        capability: Capability,
        account: AccountId,
    ) -> Option<RoleChange> {
        if !self.grants.entry(capability).or_default().insert(account) {
            return None;
        }
        debug!(%capability, %account, %sender, "capability granted");
        Some(RoleChange {
            kind: RoleChangeKind::Granted,
            capability,
            account,
            sender,
        })
    }

    fn remove(
        &mut self,
        sender: AccountId,
        capability: Capability,
        account: AccountId,
    ) -> Option<RoleChange> {
        let removed = self
            .grants
            .get_mut(&capability)
            .is_some_and(|holders| holders.remove(&account));
        if !removed {
            return None;
        }
        debug!(%capability, %account, %sender, "capability revoked");
        Some(RoleChange {
            kind: RoleChangeKind::Revoked,
            capability,
            account,
            sender,
        })
    }
}
