//! Guild membership registry.
//!
//! [`MembershipRegistry`] wires the three layers together:
//!
//! - [`RoleAuthority`](guild_roles::RoleAuthority) gates every mutation;
//! - [`OwnershipRegistry`](guild_ledger::OwnershipRegistry) tracks who holds
//!   which credential;
//! - [`VotingPowerTracker`](guild_ledger::VotingPowerTracker) turns credential
//!   counts into queryable, point-in-time voting weight.
//!
//! All state lives in one [`RegistryState`] behind a lock; each call either
//! applies all of its effects or fails without changing anything.
//!
//! # Quick Start
//!
//! ```rust
//! use guild_registry::{AccountId, ManualClock, MembershipRegistry, Timepoint};
//!
//! let admin = AccountId::from_label("admin");
//! let timelock = AccountId::from_label("timelock");
//! let alice = AccountId::from_label("alice");
//!
//! let registry = MembershipRegistry::new(ManualClock::new(Timepoint(1_000)));
//! registry.initialize(admin, timelock, "Guild", "GLD").unwrap();
//! let ids = registry.mint(admin, &[alice]).unwrap();
//! assert_eq!(registry.owner_of(ids[0]).unwrap(), alice);
//! assert_eq!(registry.get_votes(&alice).unwrap(), 1);
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod registry;
pub mod state;
pub mod voucher;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::RegistryConfig;
pub use error::{RegistryError, RegistryResult};
pub use registry::MembershipRegistry;
pub use state::{Metadata, RegistryState};
pub use voucher::DelegationVoucher;

pub use guild_ledger::{EventRecord, RegistryEvent, WeightSubject};
pub use guild_types::{AccountId, Capability, CredentialId, Timepoint};
