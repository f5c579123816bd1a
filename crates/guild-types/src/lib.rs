//! Foundation types for the guild membership registry.
//!
//! Every other guild crate depends on `guild-types`.
//!
//! # Key Types
//!
//! - [`AccountId`]: 32-byte account identifier; the all-zero value is the null account
//! - [`CredentialId`]: Monotonically assigned membership credential identifier
//! - [`Capability`]: Named permission gating registry mutations
//! - [`Timepoint`]: Seconds since the UNIX epoch, used for vote checkpoints

pub mod account;
pub mod capability;
pub mod credential;
pub mod error;
pub mod temporal;

pub use account::{AccountId, AccountMaterial};
pub use capability::Capability;
pub use credential::CredentialId;
pub use error::TypeError;
pub use temporal::Timepoint;
