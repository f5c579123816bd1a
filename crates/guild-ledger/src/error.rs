use guild_crypto::HasherError;
use guild_types::{CredentialId, Timepoint};

/// Errors produced by ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("the null account is not a valid account")]
    InvalidAccount,

    #[error("cannot mint to the null account")]
    InvalidReceiver,

    #[error("credential {0} already has a holder")]
    InvalidSender(CredentialId),

    #[error("credential {0} does not exist")]
    NonexistentCredential(CredentialId),

    #[error("timepoint {requested} is not in the past (now {current})")]
    FutureLookup {
        requested: Timepoint,
        current: Timepoint,
    },

    #[error("checkpoint at {attempted} precedes latest checkpoint at {last}")]
    UnorderedCheckpoint {
        last: Timepoint,
        attempted: Timepoint,
    },

    #[error("cannot encode event: {0}")]
    Encoding(#[from] HasherError),

    #[error("inconsistent ledger state: {0}")]
    Inconsistent(String),
}
