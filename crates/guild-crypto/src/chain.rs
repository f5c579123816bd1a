use crate::hasher::{DomainHasher, HasherError};

/// A record that participates in a hash chain.
pub trait HashLinked {
    /// The record's own hash.
    fn record_hash(&self) -> [u8; 32];
    /// The previous record's hash (None for the first record).
    fn prev_hash(&self) -> Option<[u8; 32]>;
    /// Canonical payload bytes covered by the hash.
    fn payload_bytes(&self) -> Result<Vec<u8>, HasherError>;
}

/// Hash chain integrity verifier.
///
/// Each record's `prev_hash` must match the previous record's hash, and each
/// hash must be `EVENT(prev || payload)`.
pub struct HashChainVerifier;

impl HashChainVerifier {
    pub fn verify_chain(records: &[impl HashLinked]) -> Result<(), ChainError> {
        let mut expected_prev = None;

        for (index, record) in records.iter().enumerate() {
            match (expected_prev, record.prev_hash()) {
                (None, Some(_)) => return Err(ChainError::GenesisHasPrevHash),
                (Some(_), None) => return Err(ChainError::MissingPrevHash { index }),
                (Some(expected), Some(prev)) if expected != prev => {
                    return Err(ChainError::BrokenLink { index })
                }
                _ => {}
            }

            let payload = record
                .payload_bytes()
                .map_err(|source| ChainError::Payload { index, source })?;
            let computed = Self::compute_hash(&payload, record.prev_hash());
            if computed != record.record_hash() {
                return Err(ChainError::HashMismatch { index });
            }
            expected_prev = Some(record.record_hash());
        }

        Ok(())
    }

    pub fn compute_hash(payload: &[u8], prev_hash: Option<[u8; 32]>) -> [u8; 32] {
        match prev_hash {
            Some(prev) => DomainHasher::EVENT.hash_parts(&[&prev, payload]),
            None => DomainHasher::EVENT.hash(payload),
        }
    }
}

/// Errors from chain verification.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("first record has a previous hash")]
    GenesisHasPrevHash,

    #[error("broken link at index {index}: prev_hash does not match")]
    BrokenLink { index: usize },

    #[error("missing prev_hash at index {index}")]
    MissingPrevHash { index: usize },

    #[error("hash mismatch at index {index}")]
    HashMismatch { index: usize },

    #[error("out-of-order sequence number at index {index}")]
    BadSequence { index: usize },

    #[error("cannot encode record at index {index}: {source}")]
    Payload { index: usize, source: HasherError },
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Rec {
        payload: Vec<u8>,
        prev: Option<[u8; 32]>,
        hash: [u8; 32],
    }

    impl HashLinked for Rec {
        fn record_hash(&self) -> [u8; 32] {
            self.hash
        }
        fn prev_hash(&self) -> Option<[u8; 32]> {
            self.prev
        }
        fn payload_bytes(&self) -> Result<Vec<u8>, HasherError> {
            if self.payload.is_empty() {
                return Err(HasherError::Serialization("empty payload".into()));
            }
            Ok(self.payload.clone())
        }
    }

    fn build(payloads: &[&[u8]]) -> Vec<Rec> {
        let mut prev = None;
        payloads
            .iter()
            .map(|p| {
                let hash = HashChainVerifier::compute_hash(p, prev);
                let rec = Rec {
                    payload: p.to_vec(),
                    prev,
                    hash,
                };
                prev = Some(hash);
                rec
            })
            .collect()
    }

    #[test]
    fn valid_chain_verifies() {
        let chain = build(&[b"a", b"b", b"c"]);
        assert!(HashChainVerifier::verify_chain(&chain).is_ok());
        assert!(HashChainVerifier::verify_chain(&Vec::<Rec>::new()).is_ok());
    }

    #[test]
    fn tampered_payload_is_detected() {
        let mut chain = build(&[b"a", b"b"]);
        chain[1].payload = b"x".to_vec();
        assert_eq!(
            HashChainVerifier::verify_chain(&chain),
            Err(ChainError::HashMismatch { index: 1 })
        );
    }

    #[test]
    fn broken_link_is_detected() {
        let mut chain = build(&[b"a", b"b"]);
        chain[1].prev = Some([9; 32]);
        assert_eq!(
            HashChainVerifier::verify_chain(&chain),
            Err(ChainError::BrokenLink { index: 1 })
        );
    }

    #[test]
    fn genesis_with_prev_is_rejected() {
        let mut chain = build(&[b"a"]);
        chain[0].prev = Some([1; 32]);
        assert_eq!(
            HashChainVerifier::verify_chain(&chain),
            Err(ChainError::GenesisHasPrevHash)
        );
    }

    #[test]
    fn unencodable_payload_is_reported() {
        let mut chain = build(&[b"a", b"b"]);
        chain[1].payload.clear();
        assert_eq!(
            HashChainVerifier::verify_chain(&chain),
            Err(ChainError::Payload {
                index: 1,
                source: HasherError::Serialization("empty payload".into()),
            })
        );
    }
}
