use std::collections::{BTreeMap, HashSet};

use guild_types::{AccountId, CredentialId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::LedgerError;

/// A change of holder for one credential. `None` marks "unheld": mints come
/// from `None`, burns go to `None`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub from: Option<AccountId>,
    pub to: Option<AccountId>,
    pub id: CredentialId,
}

/// Credential ownership ledger.
///
/// Invariants held after every call:
/// - the sum of all balances equals the number of held credentials;
/// - `next_id` never decreases and ids below it are never minted again;
/// - a failing call changes nothing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipRegistry {
    owners: BTreeMap<CredentialId, AccountId>,
    balances: BTreeMap<AccountId, u64>,
    next_id: u64,
}

impl OwnershipRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Held-credential count; 0 for accounts never seen.
    pub fn balance_of(&self, account: &AccountId) -> Result<u64, LedgerError> {
        if account.is_null() {
            return Err(LedgerError::InvalidAccount);
        }
        Ok(self.balances.get(account).copied().unwrap_or(0))
    }

    pub fn owner_of(&self, id: CredentialId) -> Result<AccountId, LedgerError> {
        self.owners
            .get(&id)
            .copied()
            .ok_or(LedgerError::NonexistentCredential(id))
    }

    /// The identifier the next minted credential will receive.
    pub fn next_id(&self) -> CredentialId {
        CredentialId(self.next_id)
    }

    /// Credentials ever minted, burned ones included.
    pub fn total_minted(&self) -> u64 {
        self.next_id
    }

    /// Credentials currently held.
    pub fn total_held(&self) -> u64 {
        self.owners.len() as u64
    }

    /// Accounts with a non-zero balance.
    pub fn holders(&self) -> impl Iterator<Item = (&AccountId, u64)> {
        self.balances.iter().map(|(account, count)| (account, *count))
    }

    /// Recheck a deserialized ledger: every held id was allocated, no
    /// credential is held by the null account, and balances count exactly
    /// the held credentials.
    pub fn check_consistency(&self) -> Result<(), LedgerError> {
        let mut counted: BTreeMap<AccountId, u64> = BTreeMap::new();
        for (id, owner) in &self.owners {
            if id.value() >= self.next_id {
                return Err(LedgerError::Inconsistent(format!(
                    "credential {id} is not below next id {}",
                    self.next_id
                )));
            }
            if owner.is_null() {
                return Err(LedgerError::Inconsistent(format!(
                    "credential {id} is held by the null account"
                )));
            }
            *counted.entry(*owner).or_insert(0) += 1;
        }
        if counted != self.balances {
            return Err(LedgerError::Inconsistent(
                "balances do not match held credentials".into(),
            ));
        }
        Ok(())
    }

    /// Assign one new credential per recipient, in order, from `next_id`.
    ///
    /// Every recipient is validated before anything is assigned.
    pub fn mint(&mut self, recipients: &[AccountId]) -> Result<Vec<Transfer>, LedgerError> {
        for (offset, recipient) in recipients.iter().enumerate() {
            if recipient.is_null() {
                return Err(LedgerError::InvalidReceiver);
            }
            let id = self.next_id().offset(offset as u64);
            if self.owners.contains_key(&id) {
                return Err(LedgerError::InvalidSender(id));
            }
        }

        let first = self.next_id();
        let transfers: Vec<Transfer> = recipients
            .iter()
            .enumerate()
            .map(|(offset, recipient)| {
                let id = first.offset(offset as u64);
                self.owners.insert(id, *recipient);
                *self.balances.entry(*recipient).or_insert(0) += 1;
                Transfer {
                    from: None,
                    to: Some(*recipient),
                    id,
                }
            })
            .collect();
        self.next_id += recipients.len() as u64;

        debug!(first = %first, count = transfers.len(), "credentials minted");
        Ok(transfers)
    }

    /// Release one credential from its holder.
    pub fn burn(&mut self, id: CredentialId) -> Result<Transfer, LedgerError> {
        let owner = self.owner_of(id)?;
        Ok(self.release(id, owner))
    }

    /// Burn every id in order, or none of them.
    ///
    /// An id repeated within the batch fails like an already-burned id.
    pub fn burn_batch(&mut self, ids: &[CredentialId]) -> Result<Vec<Transfer>, LedgerError> {
        let mut seen = HashSet::with_capacity(ids.len());
        for id in ids {
            if !self.owners.contains_key(id) || !seen.insert(*id) {
                return Err(LedgerError::NonexistentCredential(*id));
            }
        }

        ids.iter()
            .map(|id| self.burn(*id))
            .collect()
    }

    fn release(&mut self, id: CredentialId, owner: AccountId) -> Transfer {
        self.owners.remove(&id);
        if let Some(count) = self.balances.get_mut(&owner) {
            *count -= 1;
            if *count == 0 {
                self.balances.remove(&owner);
            }
        }
        debug!(%id, %owner, "credential burned");
        Transfer {
            from: Some(owner),
            to: None,
            id,
        }
    }
}
