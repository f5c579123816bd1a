use std::path::Path;
use std::sync::RwLock;

use guild_crypto::{Signature, VerifyingKey};
use guild_ledger::{Checkpoint, EventRecord, RegistryEvent, Transfer};
use guild_roles::RoleError;
use guild_types::{AccountId, Capability, CredentialId, Timepoint};
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::RegistryConfig;
use crate::error::{RegistryError, RegistryResult};
use crate::state::{Metadata, RegistryState};
use crate::voucher::DelegationVoucher;

/// Membership registry facade.
///
/// Holds the whole [`RegistryState`] behind one lock. Mutations take the
/// write lock for the duration of the call and validate every input before
/// touching state; queries take the read lock.
pub struct MembershipRegistry<C: Clock = SystemClock> {
    clock: C,
    state: RwLock<Option<RegistryState>>,
}

impl MembershipRegistry<SystemClock> {
    pub fn with_system_clock() -> Self {
        Self::new(SystemClock::new())
    }
}

impl<C: Clock> MembershipRegistry<C> {
    /// An uninitialized registry; every operation fails until
    /// [`initialize`](Self::initialize) runs.
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            state: RwLock::new(None),
        }
    }

    pub fn from_config(clock: C, config: &RegistryConfig) -> RegistryResult<Self> {
        config.validate()?;
        let registry = Self::new(clock);
        registry.initialize_with(
            config.admin,
            config.timelock,
            Metadata {
                name: config.name.clone(),
                symbol: config.symbol.clone(),
                base_uri: config.base_uri.clone(),
            },
        )?;
        Ok(registry)
    }

    /// Rebuild a registry from a snapshot. The event chain, ownership records,
    /// and voting weights must all agree before the state is accepted.
    pub fn from_snapshot(clock: C, state: RegistryState) -> RegistryResult<Self> {
        state.validate()?;
        debug!(events = state.events.len(), "registry restored from snapshot");
        Ok(Self {
            clock,
            state: RwLock::new(Some(state)),
        })
    }

    pub fn load_snapshot(clock: C, path: impl AsRef<Path>) -> RegistryResult<Self> {
        Self::from_snapshot(clock, RegistryState::load(path)?)
    }

    pub fn snapshot(&self) -> RegistryResult<RegistryState> {
        self.read(|state| Ok(state.clone()))
    }

    pub fn save_snapshot(&self, path: impl AsRef<Path>) -> RegistryResult<()> {
        self.read(|state| state.save(path))
    }

    pub fn is_initialized(&self) -> RegistryResult<bool> {
        let guard = self.state.read().map_err(|_| RegistryError::LockPoisoned)?;
        Ok(guard.is_some())
    }

    // ------------------------------------------------------------------
    // Setup
    // ------------------------------------------------------------------

    /// One-time setup.
    ///
    /// `admin` receives role-admin, issue, upgrade-admin and revoke;
    /// `timelock` receives revoke.
    pub fn initialize(
        &self,
        admin: AccountId,
        timelock: AccountId,
        name: &str,
        symbol: &str,
    ) -> RegistryResult<()> {
        self.initialize_with(
            admin,
            timelock,
            Metadata {
                name: name.to_string(),
                symbol: symbol.to_string(),
                base_uri: None,
            },
        )
    }

    fn initialize_with(
        &self,
        admin: AccountId,
        timelock: AccountId,
        metadata: Metadata,
    ) -> RegistryResult<()> {
        let mut guard = self.state.write().map_err(|_| RegistryError::LockPoisoned)?;
        if guard.is_some() {
            return Err(RegistryError::AlreadyInitialized);
        }

        let now = self.clock.now();
        let mut state = RegistryState::new(metadata);
        let mut events = vec![RegistryEvent::Initialized {
            name: state.metadata.name.clone(),
            symbol: state.metadata.symbol.clone(),
        }];
        let seeds = [
            (Capability::RoleAdmin, admin),
            (Capability::Issue, admin),
            (Capability::UpgradeAdmin, admin),
            (Capability::Revoke, admin),
            (Capability::Revoke, timelock),
        ];
        for (capability, account) in seeds {
            let change = state.roles.seed(admin, capability, account)?;
            events.extend(change.map(RegistryEvent::from));
        }
        state.events.append(now, events)?;

        info!(
            name = %state.metadata.name,
            symbol = %state.metadata.symbol,
            %admin,
            %timelock,
            "registry initialized"
        );
        *guard = Some(state);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Credential issuance
    // ------------------------------------------------------------------

    /// Issue one credential per recipient. Returns the new ids in order.
    pub fn mint(
        &self,
        caller: AccountId,
        recipients: &[AccountId],
    ) -> RegistryResult<Vec<CredentialId>> {
        self.mutate("mint", |state, now, events| {
            state.roles.require(&caller, Capability::Issue)?;
            let transfers = state.ownership.mint(recipients)?;

            let mut ids = Vec::with_capacity(transfers.len());
            for transfer in transfers {
                ids.push(transfer.id);
                Self::record_transfer(state, transfer, now, events)?;
            }
            info!(%caller, count = ids.len(), "credentials issued");
            Ok(ids)
        })
    }

    /// Burn `id`. The caller must hold revoke or own the credential.
    pub fn burn(&self, caller: AccountId, id: CredentialId) -> RegistryResult<()> {
        self.mutate("burn", |state, now, events| {
            if !state.roles.has_capability(&caller, Capability::Revoke)
                && state.ownership.owner_of(id)? != caller
            {
                return Err(RoleError::Unauthorized {
                    account: caller,
                    capability: Capability::Revoke,
                }
                .into());
            }
            let transfer = state.ownership.burn(id)?;
            Self::record_transfer(state, transfer, now, events)?;
            info!(%caller, %id, "credential burned");
            Ok(())
        })
    }

    /// Burn every id in order, or none of them. Requires revoke.
    pub fn burn_batch(&self, caller: AccountId, ids: &[CredentialId]) -> RegistryResult<()> {
        self.mutate("burn_batch", |state, now, events| {
            state.roles.require(&caller, Capability::Revoke)?;
            for transfer in state.ownership.burn_batch(ids)? {
                Self::record_transfer(state, transfer, now, events)?;
            }
            info!(%caller, count = ids.len(), "credentials burned");
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // Roles
    // ------------------------------------------------------------------

    /// Returns whether anything changed.
    pub fn grant(
        &self,
        caller: AccountId,
        capability: Capability,
        account: AccountId,
    ) -> RegistryResult<bool> {
        self.mutate("grant", |state, _, events| {
            let change = state.roles.grant(caller, capability, account)?;
            let changed = change.is_some();
            events.extend(change.map(RegistryEvent::from));
            Ok(changed)
        })
    }

    /// Returns whether anything changed.
    pub fn revoke(
        &self,
        caller: AccountId,
        capability: Capability,
        account: AccountId,
    ) -> RegistryResult<bool> {
        self.mutate("revoke", |state, _, events| {
            let change = state.roles.revoke(caller, capability, account)?;
            let changed = change.is_some();
            events.extend(change.map(RegistryEvent::from));
            Ok(changed)
        })
    }

    pub fn renounce(
        &self,
        caller: AccountId,
        capability: Capability,
        confirmation: AccountId,
    ) -> RegistryResult<bool> {
        self.mutate("renounce", |state, _, events| {
            let change = state.roles.renounce(caller, capability, confirmation)?;
            let changed = change.is_some();
            events.extend(change.map(RegistryEvent::from));
            Ok(changed)
        })
    }

    /// Succeeds only if `caller` may replace the registry's implementation.
    pub fn authorize_upgrade(&self, caller: AccountId) -> RegistryResult<()> {
        self.read(|state| {
            state
                .roles
                .require(&caller, Capability::UpgradeAdmin)
                .inspect_err(|err| warn!(%caller, %err, "upgrade rejected"))?;
            info!(%caller, "upgrade authorized");
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // Delegation
    // ------------------------------------------------------------------

    /// Point the caller's voting weight at `delegatee`. The null account
    /// means abstain.
    pub fn delegate(&self, caller: AccountId, delegatee: AccountId) -> RegistryResult<()> {
        self.mutate("delegate", |state, now, events| {
            Self::apply_delegation(state, caller, delegatee, now, events)
        })
    }

    /// Delegate on behalf of the voucher's signer. Returns the signer.
    pub fn delegate_by_signature(
        &self,
        voucher: &DelegationVoucher,
        key: &VerifyingKey,
        signature: &Signature,
    ) -> RegistryResult<AccountId> {
        self.mutate("delegate_by_signature", |state, now, events| {
            if voucher.is_expired(now) {
                return Err(RegistryError::ExpiredSignature {
                    expiry: voucher.expiry,
                    now,
                });
            }
            let signer = voucher.verify(&state.metadata.name, key, signature)?;
            let expected = state.nonce_of(&signer);
            if voucher.nonce != expected {
                return Err(RegistryError::InvalidNonce {
                    account: signer,
                    expected,
                    actual: voucher.nonce,
                });
            }

            Self::apply_delegation(state, signer, voucher.delegatee, now, events)?;
            state.nonces.insert(signer, expected + 1);
            Ok(signer)
        })
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn name(&self) -> RegistryResult<String> {
        self.read(|state| Ok(state.metadata.name.clone()))
    }

    pub fn symbol(&self) -> RegistryResult<String> {
        self.read(|state| Ok(state.metadata.symbol.clone()))
    }

    /// `base_uri + id`, or empty without a base URI.
    pub fn token_uri(&self, id: CredentialId) -> RegistryResult<String> {
        self.read(|state| {
            state.ownership.owner_of(id)?;
            Ok(match state.metadata.base_uri.as_deref() {
                Some(base) if !base.is_empty() => format!("{base}{id}"),
                _ => String::new(),
            })
        })
    }

    pub fn balance_of(&self, account: &AccountId) -> RegistryResult<u64> {
        self.read(|state| Ok(state.ownership.balance_of(account)?))
    }

    pub fn owner_of(&self, id: CredentialId) -> RegistryResult<AccountId> {
        self.read(|state| Ok(state.ownership.owner_of(id)?))
    }

    /// Credentials currently held.
    pub fn total_supply(&self) -> RegistryResult<u64> {
        self.read(|state| Ok(state.ownership.total_held()))
    }

    pub fn next_credential_id(&self) -> RegistryResult<CredentialId> {
        self.read(|state| Ok(state.ownership.next_id()))
    }

    pub fn has_capability(
        &self,
        account: &AccountId,
        capability: Capability,
    ) -> RegistryResult<bool> {
        self.read(|state| Ok(state.roles.has_capability(account, capability)))
    }

    pub fn members(&self, capability: Capability) -> RegistryResult<Vec<AccountId>> {
        self.read(|state| Ok(state.roles.members(capability)))
    }

    pub fn capabilities_of(&self, account: &AccountId) -> RegistryResult<Vec<Capability>> {
        self.read(|state| Ok(state.roles.capabilities_of(account)))
    }

    pub fn get_votes(&self, account: &AccountId) -> RegistryResult<u64> {
        self.read(|state| Ok(state.votes.get_votes(account)))
    }

    pub fn get_total_supply(&self) -> RegistryResult<u64> {
        self.read(|state| Ok(state.votes.get_total_supply()))
    }

    /// Votes of `account` at a timepoint strictly before now.
    pub fn get_past_votes(&self, account: &AccountId, timepoint: Timepoint) -> RegistryResult<u64> {
        self.read(|state| {
            Ok(state
                .votes
                .get_past_votes(account, timepoint, self.clock.now())?)
        })
    }

    pub fn get_past_total_supply(&self, timepoint: Timepoint) -> RegistryResult<u64> {
        self.read(|state| {
            Ok(state
                .votes
                .get_past_total_supply(timepoint, self.clock.now())?)
        })
    }

    pub fn delegates(&self, account: &AccountId) -> RegistryResult<AccountId> {
        self.read(|state| Ok(state.votes.delegates(account)))
    }

    pub fn num_checkpoints(&self, account: &AccountId) -> RegistryResult<usize> {
        self.read(|state| Ok(state.votes.num_checkpoints(account)))
    }

    pub fn checkpoint_at(
        &self,
        account: &AccountId,
        position: usize,
    ) -> RegistryResult<Option<Checkpoint>> {
        self.read(|state| Ok(state.votes.checkpoint_at(account, position)))
    }

    /// Next delegation-voucher nonce expected from `account`.
    pub fn nonces(&self, account: &AccountId) -> RegistryResult<u64> {
        self.read(|state| Ok(state.nonce_of(account)))
    }

    /// Current timepoint. Available before initialization.
    pub fn clock(&self) -> Timepoint {
        self.clock.now()
    }

    pub fn clock_mode(&self) -> &'static str {
        Timepoint::CLOCK_MODE
    }

    pub fn events(&self) -> RegistryResult<Vec<EventRecord>> {
        self.read(|state| Ok(state.events.records().to_vec()))
    }

    /// Records with a sequence number greater than `seq`.
    pub fn events_since(&self, seq: u64) -> RegistryResult<Vec<EventRecord>> {
        self.read(|state| Ok(state.events.since(seq).to_vec()))
    }

    pub fn verify_events(&self) -> RegistryResult<()> {
        self.read(|state| Ok(state.events.verify()?))
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn read<T>(&self, f: impl FnOnce(&RegistryState) -> RegistryResult<T>) -> RegistryResult<T> {
        let guard = self.state.read().map_err(|_| RegistryError::LockPoisoned)?;
        let state = guard.as_ref().ok_or(RegistryError::NotInitialized)?;
        f(state)
    }

    /// Run one mutation under the write lock and append its events.
    ///
    /// `f` must validate before it mutates: nothing is rolled back on error.
    fn mutate<T>(
        &self,
        op: &'static str,
        f: impl FnOnce(&mut RegistryState, Timepoint, &mut Vec<RegistryEvent>) -> RegistryResult<T>,
    ) -> RegistryResult<T> {
        let mut guard = self.state.write().map_err(|_| RegistryError::LockPoisoned)?;
        let state = guard.as_mut().ok_or(RegistryError::NotInitialized)?;

        let now = self.clock.now();
        let last = state
            .events
            .records()
            .last()
            .map(|record| record.timepoint)
            .max(state.votes.last_write());
        if let Some(last) = last.filter(|last| now < *last) {
            warn!(op, %now, %last, "clock regression");
            return Err(RegistryError::ClockRegression { now, last });
        }

        let mut events = Vec::new();
        let output = f(state, now, &mut events).inspect_err(|err| {
            if err.is_unauthorized() {
                warn!(op, %err, "authorization rejected");
            } else {
                debug!(op, %err, "mutation rejected");
            }
        })?;

        debug!(op, %now, events = events.len(), "mutation applied");
        state.events.append(now, events)?;
        Ok(output)
    }

    /// Checkpoint writes cannot fail here: `mutate` has already checked the
    /// clock against the last write.
    fn record_transfer(
        state: &mut RegistryState,
        transfer: Transfer,
        now: Timepoint,
        events: &mut Vec<RegistryEvent>,
    ) -> RegistryResult<()> {
        let changes = state
            .votes
            .transfer_voting_units(transfer.from, transfer.to, 1, now)?;
        events.push(transfer.into());
        events.extend(changes.into_iter().map(RegistryEvent::from));
        Ok(())
    }

    fn apply_delegation(
        state: &mut RegistryState,
        account: AccountId,
        delegatee: AccountId,
        now: Timepoint,
        events: &mut Vec<RegistryEvent>,
    ) -> RegistryResult<()> {
        let units = state.ownership.balance_of(&account)?;
        let (change, weights) = state.votes.delegate(account, delegatee, units, now)?;
        events.push(change.into());
        events.extend(weights.into_iter().map(RegistryEvent::from));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use guild_crypto::{SignatureError, SigningKey};
    use guild_ledger::{LedgerError, WeightSubject};
    use std::sync::Arc;

    const START: Timepoint = Timepoint(1_000);

    fn account(label: &str) -> AccountId {
        AccountId::from_label(label)
    }

    fn admin() -> AccountId {
        account("admin")
    }

    fn timelock() -> AccountId {
        account("timelock")
    }

    fn setup() -> (MembershipRegistry<Arc<ManualClock>>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(START));
        let registry = MembershipRegistry::new(Arc::clone(&clock));
        registry
            .initialize(admin(), timelock(), "Guild", "GLD")
            .unwrap();
        (registry, clock)
    }

    fn snapshot_json(registry: &MembershipRegistry<Arc<ManualClock>>) -> serde_json::Value {
        let state = registry.snapshot().unwrap();
        serde_json::from_str(&state.to_json().unwrap()).unwrap()
    }

    fn restore(json: serde_json::Value) -> RegistryResult<MembershipRegistry<ManualClock>> {
        let state = RegistryState::from_json(&json.to_string()).unwrap();
        MembershipRegistry::from_snapshot(ManualClock::new(START), state)
    }

    fn assert_balances_match_supply(registry: &MembershipRegistry<Arc<ManualClock>>) {
        let state = registry.snapshot().unwrap();
        let sum: u64 = state.ownership.holders().map(|(_, count)| count).sum();
        assert_eq!(sum, registry.total_supply().unwrap());
    }

    #[test]
    fn operations_before_initialize_fail() {
        let registry = MembershipRegistry::new(ManualClock::new(START));
        assert!(!registry.is_initialized().unwrap());
        assert!(matches!(
            registry.mint(admin(), &[account("a")]),
            Err(RegistryError::NotInitialized)
        ));
        assert!(matches!(
            registry.balance_of(&account("a")),
            Err(RegistryError::NotInitialized)
        ));
        assert!(matches!(registry.name(), Err(RegistryError::NotInitialized)));
    }

    #[test]
    fn initialize_seeds_roles_once() {
        let (registry, _) = setup();
        assert_eq!(registry.name().unwrap(), "Guild");
        assert_eq!(registry.symbol().unwrap(), "GLD");

        for capability in Capability::ALL {
            assert!(registry.has_capability(&admin(), capability).unwrap());
        }
        assert!(registry.has_capability(&timelock(), Capability::Revoke).unwrap());
        assert!(!registry.has_capability(&timelock(), Capability::Issue).unwrap());

        assert!(matches!(
            registry.initialize(admin(), timelock(), "Again", "AGN"),
            Err(RegistryError::AlreadyInitialized)
        ));
        assert_eq!(registry.name().unwrap(), "Guild");

        let events = registry.events().unwrap();
        assert_eq!(events[0].event.kind(), "Initialized");
        assert_eq!(events.len(), 6);
    }

    #[test]
    fn initialize_rejects_null_timelock_without_side_effects() {
        let registry = MembershipRegistry::new(ManualClock::new(START));
        assert!(matches!(
            registry.initialize(admin(), AccountId::NULL, "Guild", "GLD"),
            Err(RegistryError::Roles(RoleError::InvalidAccount))
        ));
        assert!(!registry.is_initialized().unwrap());
    }

    #[test]
    fn contiguous_ids_across_mints() {
        let (registry, _) = setup();
        let (a, b, c, d) = (account("a"), account("b"), account("c"), account("d"));

        assert_eq!(
            registry.mint(admin(), &[a, b, c]).unwrap(),
            vec![CredentialId(0), CredentialId(1), CredentialId(2)]
        );
        assert_eq!(registry.mint(admin(), &[d]).unwrap(), vec![CredentialId(3)]);
        assert_eq!(registry.owner_of(CredentialId(0)).unwrap(), a);
        assert_eq!(registry.owner_of(CredentialId(2)).unwrap(), c);
        assert_eq!(registry.owner_of(CredentialId(3)).unwrap(), d);
        assert_balances_match_supply(&registry);
    }

    #[test]
    fn mint_then_burn_round_trip_and_no_remint() {
        let (registry, _) = setup();
        let a = account("a");
        let id = registry.mint(admin(), &[a]).unwrap()[0];

        registry.burn(admin(), id).unwrap();
        assert_eq!(registry.balance_of(&a).unwrap(), 0);
        assert!(matches!(
            registry.owner_of(id),
            Err(RegistryError::Ledger(LedgerError::NonexistentCredential(x))) if x == id
        ));

        registry.mint(admin(), &[a, a]).unwrap();
        assert!(registry.owner_of(id).is_err());
        assert_eq!(registry.next_credential_id().unwrap(), CredentialId(3));
        assert_balances_match_supply(&registry);
    }

    #[test]
    fn unauthorized_mint_changes_nothing() {
        let (registry, _) = setup();
        let (a, outsider) = (account("a"), account("outsider"));
        registry.mint(admin(), &[a]).unwrap();
        let before = registry.snapshot().unwrap();

        let err = registry.mint(outsider, &[a]).unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(registry.next_credential_id().unwrap(), CredentialId(1));
        assert_eq!(registry.balance_of(&a).unwrap(), 1);
        assert_eq!(registry.snapshot().unwrap(), before);
    }

    #[test]
    fn mint_to_null_recipient_is_atomic() {
        let (registry, _) = setup();
        let a = account("a");
        let before = registry.snapshot().unwrap();

        assert!(matches!(
            registry.mint(admin(), &[a, AccountId::NULL]),
            Err(RegistryError::Ledger(LedgerError::InvalidReceiver))
        ));
        assert_eq!(registry.snapshot().unwrap(), before);
        assert_eq!(registry.get_votes(&a).unwrap(), 0);
    }

    #[test]
    fn voting_accounting_with_delegation() {
        let (registry, clock) = setup();
        let (a, b) = (account("a"), account("b"));

        registry.mint(admin(), &[a]).unwrap();
        assert_eq!(registry.get_votes(&a).unwrap(), 1);
        assert_eq!(registry.delegates(&a).unwrap(), a);

        clock.advance(10);
        assert_eq!(registry.get_past_votes(&a, Timepoint(999)).unwrap(), 0);
        assert_eq!(registry.get_past_votes(&a, START).unwrap(), 1);

        registry.mint(admin(), &[a]).unwrap();
        assert_eq!(registry.get_votes(&a).unwrap(), 2);

        registry.delegate(a, b).unwrap();
        assert_eq!(registry.get_votes(&a).unwrap(), 0);
        assert_eq!(registry.get_votes(&b).unwrap(), 2);
        assert_eq!(registry.get_total_supply().unwrap(), 2);

        clock.advance(1);
        assert_eq!(registry.get_past_total_supply(START).unwrap(), 1);
        assert_eq!(registry.get_past_total_supply(Timepoint(1_010)).unwrap(), 2);
    }

    #[test]
    fn future_lookup_is_rejected() {
        let (registry, _) = setup();
        let now = registry.clock();
        assert!(matches!(
            registry.get_past_votes(&account("a"), now),
            Err(RegistryError::Ledger(LedgerError::FutureLookup { .. }))
        ));
        assert!(matches!(
            registry.get_past_total_supply(now.saturating_add(5)),
            Err(RegistryError::Ledger(LedgerError::FutureLookup { .. }))
        ));
    }

    #[test]
    fn burn_moves_weight_from_the_delegatee() {
        let (registry, _) = setup();
        let (a, b) = (account("a"), account("b"));
        let ids = registry.mint(admin(), &[a, a]).unwrap();
        registry.delegate(a, b).unwrap();

        registry.burn(a, ids[0]).unwrap();
        assert_eq!(registry.get_votes(&b).unwrap(), 1);
        assert_eq!(registry.get_total_supply().unwrap(), 1);
    }

    #[test]
    fn delegating_to_null_abstains() {
        let (registry, _) = setup();
        let a = account("a");
        registry.mint(admin(), &[a, a]).unwrap();

        registry.delegate(a, AccountId::NULL).unwrap();
        assert_eq!(registry.get_votes(&a).unwrap(), 0);
        assert_eq!(registry.get_total_supply().unwrap(), 2);

        registry.mint(admin(), &[a]).unwrap();
        assert_eq!(registry.get_votes(&a).unwrap(), 0);
        assert_eq!(registry.get_total_supply().unwrap(), 3);
    }

    #[test]
    fn burn_batch_is_all_or_nothing() {
        let (registry, _) = setup();
        let a = account("a");
        let ids = registry.mint(admin(), &[a]).unwrap();
        let before = registry.snapshot().unwrap();

        assert!(matches!(
            registry.burn_batch(admin(), &[ids[0], CredentialId(42)]),
            Err(RegistryError::Ledger(LedgerError::NonexistentCredential(CredentialId(42))))
        ));
        assert_eq!(registry.owner_of(ids[0]).unwrap(), a);
        assert_eq!(registry.balance_of(&a).unwrap(), 1);
        assert_eq!(registry.snapshot().unwrap(), before);
    }

    #[test]
    fn burn_batch_requires_revoke() {
        let (registry, _) = setup();
        let a = account("a");
        let ids = registry.mint(admin(), &[a]).unwrap();

        assert!(registry.burn_batch(a, &ids).unwrap_err().is_unauthorized());
        registry.burn_batch(timelock(), &ids).unwrap();
        assert_eq!(registry.total_supply().unwrap(), 0);
    }

    #[test]
    fn owner_may_burn_own_credential() {
        let (registry, _) = setup();
        let a = account("a");
        let id = registry.mint(admin(), &[a]).unwrap()[0];
        registry.burn(a, id).unwrap();
        assert_eq!(registry.balance_of(&a).unwrap(), 0);
    }

    #[test]
    fn burn_of_unknown_id_by_outsider_is_nonexistent() {
        let (registry, _) = setup();
        assert!(matches!(
            registry.burn(account("outsider"), CredentialId(7)),
            Err(RegistryError::Ledger(LedgerError::NonexistentCredential(_)))
        ));
    }

    #[test]
    fn guild_scenario() {
        let (registry, _) = setup();
        let (a, b, third) = (account("a"), account("b"), account("third"));

        assert_eq!(
            registry.mint(admin(), &[a, b]).unwrap(),
            vec![CredentialId(0), CredentialId(1)]
        );
        registry.burn(timelock(), CredentialId(0)).unwrap();

        let err = registry.burn(third, CredentialId(1)).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Roles(RoleError::Unauthorized {
                capability: Capability::Revoke,
                ..
            })
        ));
        assert_eq!(registry.balance_of(&b).unwrap(), 1);
        assert_balances_match_supply(&registry);
    }

    #[test]
    fn role_management_emits_events_only_on_change() {
        let (registry, _) = setup();
        let issuer = account("issuer");
        let before = registry.events().unwrap().len();

        assert!(registry.grant(admin(), Capability::Issue, issuer).unwrap());
        assert!(!registry.grant(admin(), Capability::Issue, issuer).unwrap());
        assert_eq!(registry.events().unwrap().len(), before + 1);

        registry.mint(issuer, &[account("a")]).unwrap();

        assert!(registry.grant(issuer, Capability::Issue, issuer).unwrap_err().is_unauthorized());
        assert!(registry.revoke(admin(), Capability::Issue, issuer).unwrap());
        assert!(registry.mint(issuer, &[account("a")]).unwrap_err().is_unauthorized());

        assert!(matches!(
            registry.renounce(admin(), Capability::Issue, issuer),
            Err(RegistryError::Roles(RoleError::BadConfirmation))
        ));
        assert!(registry.renounce(admin(), Capability::Issue, admin()).unwrap());
        assert!(!registry.has_capability(&admin(), Capability::Issue).unwrap());
        assert_eq!(registry.members(Capability::Revoke).unwrap().len(), 2);
    }

    #[test]
    fn token_uri_uses_base_uri() {
        let clock = ManualClock::new(START);
        let config = RegistryConfig::new("Guild", "GLD", admin(), timelock())
            .with_base_uri("https://guild.example/c/");
        let registry = MembershipRegistry::from_config(clock, &config).unwrap();
        let id = registry.mint(admin(), &[account("a"), account("b")]).unwrap()[1];

        assert_eq!(registry.token_uri(id).unwrap(), "https://guild.example/c/1");
        assert!(matches!(
            registry.token_uri(CredentialId(9)),
            Err(RegistryError::Ledger(LedgerError::NonexistentCredential(_)))
        ));

        let (plain, _) = setup();
        let id = plain.mint(admin(), &[account("a")]).unwrap()[0];
        assert_eq!(plain.token_uri(id).unwrap(), "");
    }

    #[test]
    fn clock_regression_is_rejected_before_mutation() {
        let (registry, clock) = setup();
        let a = account("a");
        registry.mint(admin(), &[a]).unwrap();
        let before = registry.snapshot().unwrap();

        clock.set(Timepoint(500));
        assert!(matches!(
            registry.mint(admin(), &[a]),
            Err(RegistryError::ClockRegression { .. })
        ));
        assert_eq!(registry.snapshot().unwrap(), before);
    }

    #[test]
    fn same_timepoint_writes_coalesce() {
        let (registry, _) = setup();
        let a = account("a");
        registry.mint(admin(), &[a]).unwrap();
        registry.mint(admin(), &[a, a]).unwrap();

        assert_eq!(registry.num_checkpoints(&a).unwrap(), 1);
        let checkpoint = registry.checkpoint_at(&a, 0).unwrap().unwrap();
        assert_eq!(checkpoint.timepoint, START);
        assert_eq!(checkpoint.value, 3);
    }

    #[test]
    fn delegate_by_signature_checks_expiry_signature_and_nonce() {
        let (registry, clock) = setup();
        let key = SigningKey::generate();
        let signer = key.account_id();
        let delegatee = account("delegatee");
        registry.mint(admin(), &[signer, signer]).unwrap();

        let voucher = DelegationVoucher::new(delegatee, 0, Timepoint(1_100));
        let sig = voucher.sign("Guild", &key).unwrap();

        let wrong_key = SigningKey::generate().verifying_key();
        assert!(matches!(
            registry.delegate_by_signature(&voucher, &wrong_key, &sig),
            Err(RegistryError::Signature(SignatureError::InvalidSignature))
        ));

        let stale = DelegationVoucher::new(delegatee, 5, Timepoint(1_100));
        let stale_sig = stale.sign("Guild", &key).unwrap();
        assert!(matches!(
            registry.delegate_by_signature(&stale, &key.verifying_key(), &stale_sig),
            Err(RegistryError::InvalidNonce { expected: 0, actual: 5, .. })
        ));

        assert_eq!(
            registry
                .delegate_by_signature(&voucher, &key.verifying_key(), &sig)
                .unwrap(),
            signer
        );
        assert_eq!(registry.get_votes(&delegatee).unwrap(), 2);
        assert_eq!(registry.nonces(&signer).unwrap(), 1);

        assert!(matches!(
            registry.delegate_by_signature(&voucher, &key.verifying_key(), &sig),
            Err(RegistryError::InvalidNonce { expected: 1, actual: 0, .. })
        ));

        clock.set(Timepoint(1_101));
        let late = DelegationVoucher::new(signer, 1, Timepoint(1_100));
        let late_sig = late.sign("Guild", &key).unwrap();
        assert!(matches!(
            registry.delegate_by_signature(&late, &key.verifying_key(), &late_sig),
            Err(RegistryError::ExpiredSignature { .. })
        ));
        assert_eq!(registry.nonces(&signer).unwrap(), 1);
    }

    #[test]
    fn authorize_upgrade_requires_upgrade_admin() {
        let (registry, _) = setup();
        registry.authorize_upgrade(admin()).unwrap();
        assert!(registry.authorize_upgrade(timelock()).unwrap_err().is_unauthorized());
    }

    #[test]
    fn events_record_transfers_and_weights_in_order() {
        let (registry, _) = setup();
        let a = account("a");
        let seq = registry.events().unwrap().len() as u64;
        registry.mint(admin(), &[a]).unwrap();

        let fresh = registry.events_since(seq).unwrap();
        let kinds: Vec<_> = fresh.iter().map(|r| r.event.kind()).collect();
        assert_eq!(kinds, ["Transfer", "WeightCheckpointed", "WeightCheckpointed"]);
        assert!(matches!(
            fresh[1].event,
            RegistryEvent::WeightCheckpointed {
                subject: WeightSubject::Total,
                previous: 0,
                current: 1,
            }
        ));
        assert!(fresh.iter().all(|r| r.timepoint == START));
        registry.verify_events().unwrap();
    }

    #[test]
    fn snapshot_round_trip_through_file() {
        let (registry, _) = setup();
        let a = account("a");
        registry.mint(admin(), &[a, a]).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guild.json");
        registry.save_snapshot(&path).unwrap();

        let restored =
            MembershipRegistry::load_snapshot(ManualClock::new(Timepoint(2_000)), &path).unwrap();
        assert_eq!(restored.snapshot().unwrap(), registry.snapshot().unwrap());
        assert_eq!(restored.get_votes(&a).unwrap(), 2);
        restored.mint(admin(), &[a]).unwrap();
        assert_eq!(restored.next_credential_id().unwrap(), CredentialId(3));
    }

    #[test]
    fn tampered_event_log_is_rejected() {
        let (registry, _) = setup();
        registry.mint(admin(), &[account("a")]).unwrap();
        let mut json = snapshot_json(&registry);
        json["events"][0]["event"]["Initialized"]["name"] = "Forged".into();

        assert!(matches!(restore(json), Err(RegistryError::Chain(_))));
    }

    #[test]
    fn forged_balance_is_rejected() {
        let (registry, _) = setup();
        let a = account("a");
        registry.mint(admin(), &[a]).unwrap();
        let mut json = snapshot_json(&registry);
        json["ownership"]["balances"][a.to_hex()] = 50.into();

        assert!(matches!(
            restore(json),
            Err(RegistryError::Ledger(LedgerError::Inconsistent(_)))
        ));
    }

    #[test]
    fn forged_voting_weight_is_rejected() {
        let (registry, _) = setup();
        let a = account("a");
        registry.mint(admin(), &[a]).unwrap();
        registry.delegate(a, a).unwrap();
        let mut json = snapshot_json(&registry);
        json["votes"]["accounts"][a.to_hex()][0]["value"] = 9.into();

        assert!(matches!(
            restore(json),
            Err(RegistryError::Ledger(LedgerError::Inconsistent(_)))
        ));
    }

    #[test]
    fn untouched_snapshot_restores() {
        let (registry, _) = setup();
        let a = account("a");
        registry.mint(admin(), &[a, a]).unwrap();
        registry.delegate(a, account("b")).unwrap();
        let restored = restore(snapshot_json(&registry)).unwrap();
        assert_eq!(restored.get_votes(&account("b")).unwrap(), 2);
    }

    #[test]
    fn concurrent_mints_keep_invariants() {
        let (registry, _) = setup();
        let registry = Arc::new(registry);
        let handles: Vec<_> = (0..4)
            .map(|n| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for _ in 0..5 {
                        registry
                            .mint(admin(), &[account(&format!("member-{n}"))])
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.next_credential_id().unwrap(), CredentialId(20));
        assert_eq!(registry.get_total_supply().unwrap(), 20);
        assert_balances_match_supply(&registry);
    }
}
