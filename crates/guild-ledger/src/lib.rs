//! Credential ownership and voting-power ledger for the guild registry.
//!
//! This crate is the heart of the registry. It provides:
//! - [`OwnershipRegistry`]: credential id → holder and account → held count,
//!   with all-or-nothing mint, burn, and batch burn
//! - [`Trace`]: append-only `(timepoint, value)` checkpoint series with
//!   binary-search lookup
//! - [`VotingPowerTracker`]: per-account and total voting weight histories,
//!   driven by ownership changes and delegation
//! - [`EventLog`]: hash-linked, append-only record of everything observable
//!
//! None of these types check capabilities; the caller gates mutations and
//! supplies the current timepoint.

pub mod checkpoint;
pub mod error;
pub mod events;
pub mod ownership;
pub mod votes;

pub use checkpoint::{Checkpoint, Trace};
pub use error::LedgerError;
pub use events::{EventLog, EventRecord, RegistryEvent};
pub use ownership::{OwnershipRegistry, Transfer};
pub use votes::{DelegateChange, VotingPowerTracker, WeightChange, WeightSubject};
