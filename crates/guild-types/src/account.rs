use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Material used to derive an [`AccountId`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccountMaterial {
    /// A human-readable label (e.g. "treasury", "alice").
    Label(String),
    /// An ed25519 public key (32 bytes).
    PublicKey([u8; 32]),
}

/// Address-like identifier for a registry account.
///
/// The all-zero value is the null account: it never holds credentials or
/// capabilities and is rejected wherever a real account is required.
/// Derived accounts are BLAKE3 hashes of [`AccountMaterial`] and are never
/// null in practice.
///
/// Serialized as a 64-character hex string so it can key JSON maps.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountId {
    bytes: [u8; 32],
}

impl AccountId {
    /// The null account.
    pub const NULL: Self = Self { bytes: [0; 32] };

    /// Derive an account from identity material.
    pub fn derive(material: &AccountMaterial) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"guild-account-v1:");
        match material {
            AccountMaterial::Label(label) => {
                hasher.update(b"label:");
                hasher.update(label.as_bytes());
            }
            AccountMaterial::PublicKey(pk) => {
                hasher.update(b"pubkey:");
                hasher.update(pk);
            }
        }
        Self {
            bytes: *hasher.finalize().as_bytes(),
        }
    }

    /// Shorthand for deriving from a label.
    pub fn from_label(label: &str) -> Self {
        Self::derive(&AccountMaterial::Label(label.to_string()))
    }

    /// Wrap raw bytes. Use `derive()` for production code.
    pub const fn from_raw(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    pub fn is_null(&self) -> bool {
        self.bytes == [0; 32]
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Full hex-encoded string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Short identifier (`0x` + first 8 hex characters).
    pub fn short_id(&self) -> String {
        format!("0x{}", hex::encode(&self.bytes[..4]))
    }

    /// Parse 64 hex characters, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| TypeError::InvalidLength {
                expected: 32,
                actual: b.len(),
            })?;
        Ok(Self { bytes })
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "AccountId(null)")
        } else {
            write!(f, "AccountId({})", self.short_id())
        }
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_id())
    }
}

impl FromStr for AccountId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for AccountId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
