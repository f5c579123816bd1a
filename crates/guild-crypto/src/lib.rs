//! Cryptographic primitives for the guild membership registry.
//!
//! Provides domain-separated BLAKE3 hashing, Ed25519 signing/verification
//! for signed delegation, and hash chain verification for the event log.
//!
//! All crypto operations wrap established libraries.

pub mod chain;
pub mod hasher;
pub mod signer;

pub use chain::{ChainError, HashChainVerifier, HashLinked};
pub use hasher::{DomainHasher, HasherError};
pub use signer::{Signature, SignatureError, SigningKey, VerifyingKey};
