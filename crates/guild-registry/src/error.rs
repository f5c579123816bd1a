use guild_crypto::{ChainError, SignatureError};
use guild_ledger::LedgerError;
use guild_roles::RoleError;
use guild_types::{AccountId, Timepoint};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry already initialized")]
    AlreadyInitialized,

    #[error("registry not initialized")]
    NotInitialized,

    #[error("role error: {0}")]
    Roles(#[from] RoleError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("signature error: {0}")]
    Signature(#[from] SignatureError),

    #[error("event log integrity error: {0}")]
    Chain(#[from] ChainError),

    #[error("clock moved backwards: now {now}, last checkpoint at {last}")]
    ClockRegression { now: Timepoint, last: Timepoint },

    #[error("delegation voucher expired at {expiry} (now {now})")]
    ExpiredSignature { expiry: Timepoint, now: Timepoint },

    #[error("invalid nonce for {account}: expected {expected}, got {actual}")]
    InvalidNonce {
        account: AccountId,
        expected: u64,
        actual: u64,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("registry lock poisoned")]
    LockPoisoned,
}

impl RegistryError {
    /// Whether the caller lacked a capability or ownership.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Roles(RoleError::Unauthorized { .. }))
    }
}

pub type RegistryResult<T> = Result<T, RegistryError>;
