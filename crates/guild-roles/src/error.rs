use guild_types::{AccountId, Capability};

/// Errors produced by role checks and grant changes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoleError {
    /// The caller lacks the capability the operation requires.
    #[error("account {account} lacks capability {capability}")]
    Unauthorized {
        account: AccountId,
        capability: Capability,
    },

    /// The null account cannot hold capabilities.
    #[error("capabilities cannot be granted to the null account")]
    InvalidAccount,

    /// An account may only renounce its own capabilities.
    #[error("renounce confirmation does not match the caller")]
    BadConfirmation,
}
