//! Role authority for the guild membership registry.
//!
//! Every mutating registry operation is gated through a [`RoleAuthority`]:
//! minting needs [`Capability::Issue`](guild_types::Capability::Issue),
//! batch burning needs `Revoke`, and changing grants needs `RoleAdmin`.
//! Grants are seeded once at initialization; afterwards only role-admin
//! holders can change them.

pub mod authority;
pub mod error;

pub use authority::{RoleAuthority, RoleChange, RoleChangeKind};
pub use error::RoleError;
