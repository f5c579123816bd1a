use std::collections::BTreeMap;

use guild_types::{AccountId, Timepoint};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::checkpoint::{Checkpoint, Trace};
use crate::error::LedgerError;

/// Whose weight a checkpoint describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeightSubject {
    Account(AccountId),
    /// The global total of all voting weight.
    Total,
}

/// A checkpoint write: `subject` went from `previous` to `current`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightChange {
    pub subject: WeightSubject,
    pub timepoint: Timepoint,
    pub previous: u64,
    pub current: u64,
}

/// An account moved its weight from one delegatee to another.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegateChange {
    pub delegator: AccountId,
    pub from_delegate: AccountId,
    pub to_delegate: AccountId,
}

/// Voting weight accounting with point-in-time history.
///
/// Each credential is one unit of weight attributed to its holder's
/// delegatee. Accounts delegate to themselves until they choose otherwise.
/// Weight delegated to the null account is not attributed to anyone but
/// still counts toward the total.
///
/// The tracker does not know balances; callers pass the units that move.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingPowerTracker {
    delegation: BTreeMap<AccountId, AccountId>,
    accounts: BTreeMap<AccountId, Trace>,
    total: Trace,
    last_write: Option<Timepoint>,
}

impl VotingPowerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The account's current delegatee (itself unless it delegated).
    pub fn delegates(&self, account: &AccountId) -> AccountId {
        self.delegation.get(account).copied().unwrap_or(*account)
    }

    pub fn get_votes(&self, account: &AccountId) -> u64 {
        self.accounts.get(account).map(Trace::latest).unwrap_or(0)
    }

    pub fn get_total_supply(&self) -> u64 {
        self.total.latest()
    }

    /// Votes of `account` as of `timepoint`, which must be before `now`.
    pub fn get_past_votes(
        &self,
        account: &AccountId,
        timepoint: Timepoint,
        now: Timepoint,
    ) -> Result<u64, LedgerError> {
        Self::require_past(timepoint, now)?;
        Ok(self
            .accounts
            .get(account)
            .map(|trace| trace.upper_lookup(timepoint))
            .unwrap_or(0))
    }

    /// Total weight as of `timepoint`, which must be before `now`.
    pub fn get_past_total_supply(
        &self,
        timepoint: Timepoint,
        now: Timepoint,
    ) -> Result<u64, LedgerError> {
        Self::require_past(timepoint, now)?;
        Ok(self.total.upper_lookup(timepoint))
    }

    pub fn num_checkpoints(&self, account: &AccountId) -> usize {
        self.accounts.get(account).map(Trace::len).unwrap_or(0)
    }

    pub fn checkpoint_at(&self, account: &AccountId, position: usize) -> Option<Checkpoint> {
        self.accounts.get(account).and_then(|trace| trace.get(position))
    }

    /// Latest timepoint any checkpoint was written at.
    pub fn last_write(&self) -> Option<Timepoint> {
        self.last_write
    }

    /// Fail unless checkpoints may be written at `now`.
    ///
    /// Callers check this before mutating anything else, so that later
    /// checkpoint writes in the same call cannot fail.
    pub fn ensure_writable(&self, now: Timepoint) -> Result<(), LedgerError> {
        match self.last_write {
            Some(last) if now < last => Err(LedgerError::UnorderedCheckpoint {
                last,
                attempted: now,
            }),
            _ => Ok(()),
        }
    }

    /// Recheck a deserialized tracker against the holdings it should
    /// reflect, given as `(holder, credential count)` pairs.
    ///
    /// The total must equal all held credentials; each account's latest
    /// votes must equal the holdings delegated to it (weight delegated to
    /// the null account counts only toward the total); every series must be
    /// ordered and end no later than the last write.
    pub fn check_consistency<'a>(
        &self,
        holdings: impl IntoIterator<Item = (&'a AccountId, u64)>,
    ) -> Result<(), LedgerError> {
        let mut expected: BTreeMap<AccountId, u64> = BTreeMap::new();
        let mut held = 0u64;
        for (account, units) in holdings {
            held += units;
            let delegatee = self.delegates(account);
            if !delegatee.is_null() {
                *expected.entry(delegatee).or_insert(0) += units;
            }
        }

        if self.total.latest() != held {
            return Err(LedgerError::Inconsistent(format!(
                "total weight {} does not match {held} held credentials",
                self.total.latest()
            )));
        }
        let mismatch = self
            .accounts
            .keys()
            .chain(expected.keys())
            .find(|account| {
                account.is_null()
                    || self.get_votes(account) != expected.get(*account).copied().unwrap_or(0)
            });
        if let Some(account) = mismatch {
            return Err(LedgerError::Inconsistent(format!(
                "votes of {account} do not match delegated holdings"
            )));
        }

        let series = self.accounts.values().chain(std::iter::once(&self.total));
        for trace in series {
            if !trace.is_ordered() || trace.last_timepoint() > self.last_write {
                return Err(LedgerError::Inconsistent(
                    "checkpoint series out of order".into(),
                ));
            }
        }
        Ok(())
    }

    /// Account for `amount` credentials moving from `from` to `to`.
    ///
    /// `None` on the `from` side is a mint (total grows); `None` on the `to`
    /// side is a burn (total shrinks).
    pub fn transfer_voting_units(
        &mut self,
        from: Option<AccountId>,
        to: Option<AccountId>,
        amount: u64,
        now: Timepoint,
    ) -> Result<Vec<WeightChange>, LedgerError> {
        self.ensure_writable(now)?;
        let mut changes = Vec::new();

        if amount > 0 && (from.is_none() || to.is_none()) {
            let total = self.total.latest();
            let next = if from.is_none() {
                total.saturating_add(amount)
            } else {
                total.saturating_sub(amount)
            };
            let (previous, current) = self.total.push(now, next)?;
            changes.push(WeightChange {
                subject: WeightSubject::Total,
                timepoint: now,
                previous,
                current,
            });
        }

        let from_delegate = from.map(|account| self.delegates(&account));
        let to_delegate = to.map(|account| self.delegates(&account));
        changes.extend(self.move_delegate_votes(from_delegate, to_delegate, amount, now)?);

        self.last_write = Some(now);
        Ok(changes)
    }

    /// Point `account`'s weight (`units`, its held count) at `delegatee`.
    pub fn delegate(
        &mut self,
        account: AccountId,
        delegatee: AccountId,
        units: u64,
        now: Timepoint,
    ) -> Result<(DelegateChange, Vec<WeightChange>), LedgerError> {
        self.ensure_writable(now)?;
        let from_delegate = self.delegates(&account);
        self.delegation.insert(account, delegatee);

        debug!(delegator = %account, from = %from_delegate, to = %delegatee, units, "delegate changed");
        let changes =
            self.move_delegate_votes(Some(from_delegate), Some(delegatee), units, now)?;

        self.last_write = Some(now);
        Ok((
            DelegateChange {
                delegator: account,
                from_delegate,
                to_delegate: delegatee,
            },
            changes,
        ))
    }

    fn move_delegate_votes(
        &mut self,
        from: Option<AccountId>,
        to: Option<AccountId>,
        amount: u64,
        now: Timepoint,
    ) -> Result<Vec<WeightChange>, LedgerError> {
        let mut changes = Vec::new();
        if amount == 0 || from == to {
            return Ok(changes);
        }

        if let Some(account) = from.filter(|a| !a.is_null()) {
            let trace = self.accounts.entry(account).or_default();
            let next = trace.latest().saturating_sub(amount);
            let (previous, current) = trace.push(now, next)?;
            changes.push(WeightChange {
                subject: WeightSubject::Account(account),
                timepoint: now,
                previous,
                current,
            });
        }

        if let Some(account) = to.filter(|a| !a.is_null()) {
            let trace = self.accounts.entry(account).or_default();
            let next = trace.latest().saturating_add(amount);
            let (previous, current) = trace.push(now, next)?;
            changes.push(WeightChange {
                subject: WeightSubject::Account(account),
                timepoint: now,
                previous,
                current,
            });
        }

        Ok(changes)
    }

    fn require_past(timepoint: Timepoint, now: Timepoint) -> Result<(), LedgerError> {
        if timepoint >= now {
            return Err(LedgerError::FutureLookup {
                requested: timepoint,
                current: now,
            });
        }
        Ok(())
    }
}
