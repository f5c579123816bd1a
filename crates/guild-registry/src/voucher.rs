use guild_crypto::{DomainHasher, Signature, SigningKey, VerifyingKey};
use guild_types::{AccountId, Timepoint};
use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, RegistryResult};

/// An off-line instruction to delegate, signed by the delegator.
///
/// The digest is bound to the registry name, so a voucher signed for one
/// registry is not valid on another. Each voucher consumes the signer's
/// current nonce.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationVoucher {
    pub delegatee: AccountId,
    pub nonce: u64,
    /// Last timepoint at which the voucher is accepted.
    pub expiry: Timepoint,
}

impl DelegationVoucher {
    pub fn new(delegatee: AccountId, nonce: u64, expiry: Timepoint) -> Self {
        Self {
            delegatee,
            nonce,
            expiry,
        }
    }

    /// Message the delegator signs.
    pub fn digest(&self, registry_name: &str) -> RegistryResult<[u8; 32]> {
        DomainHasher::DELEGATION
            .hash_bincode(&(registry_name, self))
            .map_err(|e| RegistryError::Serialization(e.to_string()))
    }

    pub fn sign(&self, registry_name: &str, key: &SigningKey) -> RegistryResult<Signature> {
        Ok(key.sign(&self.digest(registry_name)?))
    }

    /// Check `signature` and return the signer's account.
    pub fn verify(
        &self,
        registry_name: &str,
        key: &VerifyingKey,
        signature: &Signature,
    ) -> RegistryResult<AccountId> {
        key.verify(&self.digest(registry_name)?, signature)?;
        Ok(key.account_id())
    }

    pub fn is_expired(&self, now: Timepoint) -> bool {
        now > self.expiry
    }
}
