/// Domain-separated BLAKE3 hasher.
///
/// Each hasher carries a domain tag that is prepended to every hash
/// computation, so an event record and a delegation voucher with identical
/// bytes never produce the same digest.
#[derive(Clone, Copy, Debug)]
pub struct DomainHasher {
    domain: &'static str,
}

impl DomainHasher {
    /// Hasher for event log records.
    pub const EVENT: Self = Self {
        domain: "guild-event-v1",
    };
    /// Hasher for signed delegation vouchers.
    pub const DELEGATION: Self = Self {
        domain: "guild-delegation-v1",
    };

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> [u8; 32] {
        self.hash_parts(&[data])
    }

    /// Hash several byte slices in order with domain separation.
    pub fn hash_parts(&self, parts: &[&[u8]]) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        for part in parts {
            hasher.update(part);
        }
        *hasher.finalize().as_bytes()
    }

    /// Hash a serializable value's bincode encoding.
    pub fn hash_bincode<T: serde::Serialize>(&self, value: &T) -> Result<[u8; 32], HasherError> {
        let data =
            bincode::serialize(value).map_err(|e| HasherError::Serialization(e.to_string()))?;
        Ok(self.hash(&data))
    }
}

/// Errors from hashing operations.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum HasherError {
    #[error("serialization error: {0}")]
    Serialization(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domains_separate_identical_input() {
        let data = b"same bytes";
        assert_ne!(
            DomainHasher::EVENT.hash(data),
            DomainHasher::DELEGATION.hash(data)
        );
    }

    #[test]
    fn parts_hash_like_concatenation() {
        let h = DomainHasher::DELEGATION;
        assert_eq!(h.hash_parts(&[b"ab", b"cd"]), h.hash(b"abcd"));
    }

    #[test]
    fn bincode_hash_is_deterministic() {
        let h = DomainHasher::EVENT;
        let a = h.hash_bincode(&(1u64, "x")).unwrap();
        let b = h.hash_bincode(&(1u64, "x")).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, h.hash_bincode(&(2u64, "x")).unwrap());
    }
}
