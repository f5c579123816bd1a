use guild_crypto::{ChainError, HashChainVerifier, HashLinked, HasherError};
use guild_roles::{RoleChange, RoleChangeKind};
use guild_types::{AccountId, Capability, CredentialId, Timepoint};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::ownership::Transfer;
use crate::votes::{DelegateChange, WeightChange, WeightSubject};

/// Everything the registry reports to external observers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistryEvent {
    Initialized {
        name: String,
        symbol: String,
    },
    /// `from == None` is a mint, `to == None` is a burn.
    Transfer {
        from: Option<AccountId>,
        to: Option<AccountId>,
        id: CredentialId,
    },
    RoleGranted {
        capability: Capability,
        account: AccountId,
        sender: AccountId,
    },
    RoleRevoked {
        capability: Capability,
        account: AccountId,
        sender: AccountId,
    },
    DelegateChanged {
        delegator: AccountId,
        from_delegate: AccountId,
        to_delegate: AccountId,
    },
    WeightCheckpointed {
        subject: WeightSubject,
        previous: u64,
        current: u64,
    },
}

impl RegistryEvent {
    /// Short name for display and filtering.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Initialized { .. } => "Initialized",
            Self::Transfer { .. } => "Transfer",
            Self::RoleGranted { .. } => "RoleGranted",
            Self::RoleRevoked { .. } => "RoleRevoked",
            Self::DelegateChanged { .. } => "DelegateChanged",
            Self::WeightCheckpointed { .. } => "WeightCheckpointed",
        }
    }
}

impl From<Transfer> for RegistryEvent {
    fn from(t: Transfer) -> Self {
        Self::Transfer {
            from: t.from,
            to: t.to,
            id: t.id,
        }
    }
}

impl From<RoleChange> for RegistryEvent {
    fn from(change: RoleChange) -> Self {
        match change.kind {
            RoleChangeKind::Granted => Self::RoleGranted {
                capability: change.capability,
                account: change.account,
                sender: change.sender,
            },
            RoleChangeKind::Revoked => Self::RoleRevoked {
                capability: change.capability,
                account: change.account,
                sender: change.sender,
            },
        }
    }
}

impl From<DelegateChange> for RegistryEvent {
    fn from(change: DelegateChange) -> Self {
        Self::DelegateChanged {
            delegator: change.delegator,
            from_delegate: change.from_delegate,
            to_delegate: change.to_delegate,
        }
    }
}

impl From<WeightChange> for RegistryEvent {
    fn from(change: WeightChange) -> Self {
        Self::WeightCheckpointed {
            subject: change.subject,
            previous: change.previous,
            current: change.current,
        }
    }
}

/// One entry in the [`EventLog`], hash-linked to its predecessor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// 1-based position in the log.
    pub seq: u64,
    pub timepoint: Timepoint,
    pub event: RegistryEvent,
    pub prev_hash: Option<[u8; 32]>,
    pub hash: [u8; 32],
}

impl EventRecord {
    fn canonical_bytes(
        seq: u64,
        timepoint: Timepoint,
        event: &RegistryEvent,
    ) -> Result<Vec<u8>, HasherError> {
        bincode::serialize(&(seq, timepoint, event))
            .map_err(|e| HasherError::Serialization(e.to_string()))
    }
}

impl HashLinked for EventRecord {
    fn record_hash(&self) -> [u8; 32] {
        self.hash
    }

    fn prev_hash(&self) -> Option<[u8; 32]> {
        self.prev_hash
    }

    fn payload_bytes(&self) -> Result<Vec<u8>, HasherError> {
        Self::canonical_bytes(self.seq, self.timepoint, &self.event)
    }
}

/// Append-only, ordered log of registry events.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `events` in order, all stamped with `timepoint`.
    ///
    /// Either every event is appended or, if one cannot be encoded, none is.
    pub fn append(
        &mut self,
        timepoint: Timepoint,
        events: impl IntoIterator<Item = RegistryEvent>,
    ) -> Result<(), LedgerError> {
        let mut prev_hash = self.records.last().map(|r| r.hash);
        let mut seq = self.records.len() as u64;
        let mut staged = Vec::new();
        for event in events {
            seq += 1;
            let payload = EventRecord::canonical_bytes(seq, timepoint, &event)?;
            let hash = HashChainVerifier::compute_hash(&payload, prev_hash);
            staged.push(EventRecord {
                seq,
                timepoint,
                event,
                prev_hash,
                hash,
            });
            prev_hash = Some(hash);
        }
        self.records.append(&mut staged);
        Ok(())
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Records with a sequence number greater than `seq`.
    pub fn since(&self, seq: u64) -> &[EventRecord] {
        let start = (seq as usize).min(self.records.len());
        &self.records[start..]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Check sequence numbering and the hash chain.
    pub fn verify(&self) -> Result<(), ChainError> {
        if let Some(index) = self
            .records
            .iter()
            .enumerate()
            .position(|(i, r)| r.seq != i as u64 + 1)
        {
            return Err(ChainError::BadSequence { index });
        }
        HashChainVerifier::verify_chain(&self.records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer(id: u64) -> RegistryEvent {
        RegistryEvent::Transfer {
            from: None,
            to: Some(AccountId::from_label("a")),
            id: CredentialId(id),
        }
    }

    #[test]
    fn append_links_records() {
        let mut log = EventLog::new();
        log.append(Timepoint(10), [transfer(0), transfer(1)]).unwrap();
        log.append(Timepoint(11), [transfer(2)]).unwrap();

        let records = log.records();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].seq, 1);
        assert_eq!(records[0].prev_hash, None);
        assert_eq!(records[1].prev_hash, Some(records[0].hash));
        assert_eq!(records[2].timepoint, Timepoint(11));
        assert!(log.verify().is_ok());
    }

    #[test]
    fn since_returns_later_records() {
        let mut log = EventLog::new();
        log.append(Timepoint(10), [transfer(0), transfer(1), transfer(2)]).unwrap();

        assert_eq!(log.since(0).len(), 3);
        assert_eq!(log.since(2)[0].seq, 3);
        assert!(log.since(3).is_empty());
        assert!(log.since(99).is_empty());
    }

    #[test]
    fn tampering_is_detected() {
        let mut log = EventLog::new();
        log.append(Timepoint(10), [transfer(0), transfer(1)]).unwrap();
        log.records[1].event = transfer(7);
        assert_eq!(log.verify(), Err(ChainError::HashMismatch { index: 1 }));
    }

    #[test]
    fn renumbered_record_is_a_sequence_error() {
        let mut log = EventLog::new();
        log.append(Timepoint(10), [transfer(0), transfer(1)]).unwrap();
        log.records[1].seq = 5;
        assert_eq!(log.verify(), Err(ChainError::BadSequence { index: 1 }));
    }

    #[test]
    fn role_changes_map_to_events() {
        let admin = AccountId::from_label("admin");
        let change = RoleChange {
            kind: RoleChangeKind::Revoked,
            capability: Capability::Issue,
            account: admin,
            sender: admin,
        };
        let event = RegistryEvent::from(change);
        assert_eq!(event.kind(), "RoleRevoked");
    }

    #[test]
    fn serde_roundtrip_keeps_chain_valid() {
        let mut log = EventLog::new();
        log.append(
            Timepoint(10),
            [
                RegistryEvent::Initialized {
                    name: "Guild".into(),
                    symbol: "GLD".into(),
                },
                transfer(0),
                RegistryEvent::WeightCheckpointed {
                    subject: WeightSubject::Total,
                    previous: 0,
                    current: 1,
                },
            ],
        )
        .unwrap();
        let json = serde_json::to_string(&log).unwrap();
        let parsed: EventLog = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, log);
        assert!(parsed.verify().is_ok());
    }
}
