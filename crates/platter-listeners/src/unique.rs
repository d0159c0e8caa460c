//! Listener ledger keyed by unique token ids.
//!
//! Each id carries exactly one share and listens to at most one turntable
//! at a time. Listening to a different turntable settles and removes the
//! old listening first; listening twice to the same turntable errors.
//! Claim rights follow the token: whoever holds the id claims its accrual,
//! regardless of who was holding it while the accrual built up.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use platter_core::constants::{BPS_PRECISION, DEFAULT_TURNTABLE_FEE_BPS, POINTS_PRECISION};
use platter_core::error::ListenerError;
use platter_core::ledger::CurrencyLedger;
use platter_core::tokens::UniqueToken;
use platter_core::types::AccountId;
use platter_emitter::EmissionSchedule;
use platter_turntables::TurntableRegistry;

use crate::accrual::{SharePool, distribute, ensure_live};

/// Per-token listening state.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct UniqueEntry {
    /// The turntable this id listens to.
    pub turntable_id: u64,
    /// Accumulator value at the last settlement.
    pub point_snapshot: u128,
    /// Lifetime net amount claimed through this id.
    pub total_claimed: u64,
    /// Position in the turntable's enumeration array.
    index: usize,
}

/// Ledger events for off-chain indexing only.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum UniqueListenerEvent {
    Listened { turntable_id: u64, token_id: u64 },
    Unlistened { turntable_id: u64, token_id: u64 },
    Claimed {
        turntable_id: u64,
        token_id: u64,
        net: u64,
        fee: u64,
    },
    FeeSet { fee_bps: u64 },
}

/// Secondary distribution ledger over unique token ids.
///
/// Single writer per transaction; wrap in a lock for concurrent use.
pub struct UniqueListenerLedger {
    admin: AccountId,
    fee_bps: u64,
    pool: SharePool,
    entries: HashMap<u64, UniqueEntry>,
    /// Per-turntable listening ids, swap-and-pop on removal. Enumeration
    /// order is not stable across removals.
    enumeration: HashMap<u64, Vec<u64>>,
    events: Vec<UniqueListenerEvent>,
}

impl UniqueListenerLedger {
    /// Create a ledger administered by `admin`, holding funds under
    /// `account`, registered as pool `pool_id` of the emission schedule.
    pub fn new(admin: AccountId, account: AccountId, pool_id: usize) -> Self {
        Self {
            admin,
            fee_bps: DEFAULT_TURNTABLE_FEE_BPS,
            pool: SharePool::new(account, pool_id),
            entries: HashMap::new(),
            enumeration: HashMap::new(),
            events: Vec::new(),
        }
    }

    fn ensure_admin(&self, caller: AccountId) -> Result<(), ListenerError> {
        if caller != self.admin {
            return Err(ListenerError::NotAdmin);
        }
        Ok(())
    }

    /// Change the owner-fee rate. Admin only; must stay below 100%.
    pub fn set_turntable_fee(
        &mut self,
        caller: AccountId,
        fee_bps: u64,
    ) -> Result<(), ListenerError> {
        self.ensure_admin(caller)?;
        if fee_bps >= BPS_PRECISION {
            return Err(ListenerError::FeeTooHigh(fee_bps));
        }
        self.fee_bps = fee_bps;
        self.events.push(UniqueListenerEvent::FeeSet { fee_bps });
        info!(fee_bps, "unique-listeners: fee changed");
        Ok(())
    }

    /// Settle one entry against the current accumulator, routing the fee
    /// to the turntable's live owner (or burning it if destroyed) and the
    /// remainder to `claimant`. Assumes a prior pull. Returns `(net, fee)`.
    fn settle_entry(
        &mut self,
        ledger: &mut dyn CurrencyLedger,
        registry: &TurntableRegistry,
        claimant: AccountId,
        id: u64,
        turntable_id: u64,
    ) -> Result<(u64, u64), ListenerError> {
        let points = self.pool.points_per_share;
        let gross = {
            let entry = self
                .entries
                .get_mut(&id)
                .ok_or(ListenerError::NotListening(turntable_id))?;
            let gross = self.pool.pending_of(1, entry.point_snapshot)?;
            entry.point_snapshot = points;
            gross
        };
        let (net, fee) = distribute(
            ledger,
            registry,
            self.pool.account,
            claimant,
            turntable_id,
            gross,
            self.fee_bps,
        )?;
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.total_claimed = entry
                .total_claimed
                .checked_add(net)
                .ok_or(ListenerError::ArithmeticOverflow)?;
        }
        self.pool.sync(ledger);
        Ok((net, fee))
    }

    /// Remove an entry: swap-with-last-and-pop in the enumeration array,
    /// patch the moved id's index, decrement the share total.
    fn remove_entry(&mut self, id: u64, turntable_id: u64) -> Result<(), ListenerError> {
        let entry = self
            .entries
            .remove(&id)
            .ok_or(ListenerError::NotListening(turntable_id))?;
        let list = self
            .enumeration
            .get_mut(&turntable_id)
            .ok_or(ListenerError::NotListening(turntable_id))?;
        list.swap_remove(entry.index);
        if entry.index < list.len() {
            let moved = list[entry.index];
            if let Some(moved_entry) = self.entries.get_mut(&moved) {
                moved_entry.index = entry.index;
            }
        }
        self.pool.total_shares = self
            .pool
            .total_shares
            .checked_sub(1)
            .ok_or(ListenerError::ArithmeticOverflow)?;
        Ok(())
    }

    /// Start listening to `turntable_id` with each of `ids`.
    ///
    /// The caller must hold every id; the turntable must be live. An id
    /// already listening elsewhere is settled and migrated; an id already
    /// listening to this turntable errors. New shares snapshot the
    /// post-pull accumulator, so backlog (burned on the pull when the
    /// ledger had no shares) is never inherited.
    #[allow(clippy::too_many_arguments)]
    pub fn listen(
        &mut self,
        caller: AccountId,
        ledger: &mut dyn CurrencyLedger,
        emitter: &mut EmissionSchedule,
        registry: &TurntableRegistry,
        token: &dyn UniqueToken,
        now: u64,
        turntable_id: u64,
        ids: &[u64],
    ) -> Result<(), ListenerError> {
        ensure_live(registry, turntable_id)?;
        for (i, &id) in ids.iter().enumerate() {
            if ids[..i].contains(&id) {
                return Err(ListenerError::AlreadyListening(turntable_id));
            }
            if token.owner_of(id) != Some(caller) {
                return Err(ListenerError::NotKeyHolder);
            }
            if self
                .entries
                .get(&id)
                .is_some_and(|e| e.turntable_id == turntable_id)
            {
                return Err(ListenerError::AlreadyListening(turntable_id));
            }
        }
        self.pool.pull(ledger, emitter, now)?;
        for &id in ids {
            if let Some(entry) = self.entries.get(&id) {
                let old_table = entry.turntable_id;
                self.settle_entry(ledger, registry, caller, id, old_table)?;
                self.remove_entry(id, old_table)?;
                self.events.push(UniqueListenerEvent::Unlistened {
                    turntable_id: old_table,
                    token_id: id,
                });
            }
            let list = self.enumeration.entry(turntable_id).or_default();
            let index = list.len();
            list.push(id);
            self.entries.insert(
                id,
                UniqueEntry {
                    turntable_id,
                    point_snapshot: self.pool.points_per_share,
                    total_claimed: 0,
                    index,
                },
            );
            self.pool.total_shares = self
                .pool
                .total_shares
                .checked_add(1)
                .ok_or(ListenerError::ArithmeticOverflow)?;
            self.events.push(UniqueListenerEvent::Listened {
                turntable_id,
                token_id: id,
            });
        }
        debug!(turntable_id, count = ids.len(), "unique-listeners: listened");
        Ok(())
    }

    /// Claim pending rewards for each of `ids` on `turntable_id`. Returns
    /// the total net amount paid to the caller.
    #[allow(clippy::too_many_arguments)]
    pub fn claim(
        &mut self,
        caller: AccountId,
        ledger: &mut dyn CurrencyLedger,
        emitter: &mut EmissionSchedule,
        registry: &TurntableRegistry,
        token: &dyn UniqueToken,
        now: u64,
        turntable_id: u64,
        ids: &[u64],
    ) -> Result<u64, ListenerError> {
        for &id in ids {
            let entry = self
                .entries
                .get(&id)
                .ok_or(ListenerError::NotListening(turntable_id))?;
            if entry.turntable_id != turntable_id {
                return Err(ListenerError::NotListening(turntable_id));
            }
            if token.owner_of(id) != Some(caller) {
                return Err(ListenerError::NotKeyHolder);
            }
        }
        self.pool.pull(ledger, emitter, now)?;
        let mut total = 0u64;
        for &id in ids {
            let (net, fee) = self.settle_entry(ledger, registry, caller, id, turntable_id)?;
            if net > 0 || fee > 0 {
                self.events.push(UniqueListenerEvent::Claimed {
                    turntable_id,
                    token_id: id,
                    net,
                    fee,
                });
            }
            total = total
                .checked_add(net)
                .ok_or(ListenerError::ArithmeticOverflow)?;
        }
        Ok(total)
    }

    /// Stop listening with each of `ids`, settling pending rewards on the
    /// way out.
    #[allow(clippy::too_many_arguments)]
    pub fn unlisten(
        &mut self,
        caller: AccountId,
        ledger: &mut dyn CurrencyLedger,
        emitter: &mut EmissionSchedule,
        registry: &TurntableRegistry,
        token: &dyn UniqueToken,
        now: u64,
        turntable_id: u64,
        ids: &[u64],
    ) -> Result<(), ListenerError> {
        for (i, &id) in ids.iter().enumerate() {
            if ids[..i].contains(&id) {
                return Err(ListenerError::NotListening(turntable_id));
            }
            let entry = self
                .entries
                .get(&id)
                .ok_or(ListenerError::NotListening(turntable_id))?;
            if entry.turntable_id != turntable_id {
                return Err(ListenerError::NotListening(turntable_id));
            }
            if token.owner_of(id) != Some(caller) {
                return Err(ListenerError::NotKeyHolder);
            }
        }
        self.pool.pull(ledger, emitter, now)?;
        for &id in ids {
            self.settle_entry(ledger, registry, caller, id, turntable_id)?;
            self.remove_entry(id, turntable_id)?;
            self.events.push(UniqueListenerEvent::Unlistened {
                turntable_id,
                token_id: id,
            });
        }
        debug!(turntable_id, count = ids.len(), "unique-listeners: unlistened");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------

    /// Whether `id` is currently listening anywhere.
    pub fn listening(&self, id: u64) -> bool {
        self.entries.contains_key(&id)
    }

    /// The entry for `id`, if listening.
    pub fn entry(&self, id: u64) -> Option<&UniqueEntry> {
        self.entries.get(&id)
    }

    /// Number of ids listening to `turntable_id`.
    pub fn listener_count(&self, turntable_id: u64) -> usize {
        self.enumeration
            .get(&turntable_id)
            .map_or(0, |list| list.len())
    }

    /// Enumerate listening ids. Order changes on removal (swap-and-pop).
    pub fn listeners(&self, turntable_id: u64, index: usize) -> Option<u64> {
        self.enumeration
            .get(&turntable_id)
            .and_then(|list| list.get(index))
            .copied()
    }

    /// Share total of a turntable (one per listening id).
    pub fn table_shares(&self, turntable_id: u64) -> u64 {
        self.listener_count(turntable_id) as u64
    }

    /// Σ shares across all turntables.
    pub fn total_shares(&self) -> u64 {
        self.pool.total_shares
    }

    /// Lifetime net amount claimed through `id` on `turntable_id`.
    pub fn claimed_of(&self, turntable_id: u64, id: u64) -> Result<u64, ListenerError> {
        let entry = self
            .entries
            .get(&id)
            .ok_or(ListenerError::NotListening(turntable_id))?;
        if entry.turntable_id != turntable_id {
            return Err(ListenerError::NotListening(turntable_id));
        }
        Ok(entry.total_claimed)
    }

    /// Gross (pre-fee) reward a claim at block `now` would settle for
    /// `id`. Read-only.
    pub fn claimable_of(
        &self,
        ledger: &dyn CurrencyLedger,
        emitter: &EmissionSchedule,
        now: u64,
        turntable_id: u64,
        id: u64,
    ) -> Result<u64, ListenerError> {
        let entry = self
            .entries
            .get(&id)
            .ok_or(ListenerError::NotListening(turntable_id))?;
        if entry.turntable_id != turntable_id {
            return Err(ListenerError::NotListening(turntable_id));
        }
        let points = self.pool.projected_points(ledger, emitter, now)?;
        let diff = points
            .checked_sub(entry.point_snapshot)
            .ok_or(ListenerError::ArithmeticOverflow)?;
        u64::try_from(diff / POINTS_PRECISION).map_err(|_| ListenerError::ArithmeticOverflow)
    }

    /// Current owner-fee rate in basis points.
    pub fn turntable_fee(&self) -> u64 {
        self.fee_bps
    }

    /// The ledger's own currency account.
    pub fn account(&self) -> AccountId {
        self.pool.account
    }

    /// Drain the event journal.
    pub fn take_events(&mut self) -> Vec<UniqueListenerEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platter_core::ledger::MemoryLedger;
    use platter_core::tokens::MemoryNft;

    const EMISSION: u64 = 1_000_000;
    /// Listener pool weight 100 of 1000 total.
    const REWARD_PER_BLOCK: u64 = EMISSION / 10;

    fn acct(seed: u8) -> AccountId {
        AccountId::from_seed(seed)
    }

    fn admin() -> AccountId {
        acct(0xAD)
    }

    fn alice() -> AccountId {
        acct(1)
    }

    fn bob() -> AccountId {
        acct(2)
    }

    fn erin() -> AccountId {
        acct(5)
    }

    struct Fixture {
        listeners: UniqueListenerLedger,
        registry: TurntableRegistry,
        emitter: EmissionSchedule,
        ledger: MemoryLedger,
        nft: MemoryNft,
    }

    /// Emitter with a forwarder pool (500), the registry (400), and the
    /// listener ledger (100); erin owns turntable 0 bought at block 0.
    fn setup() -> Fixture {
        let mut ledger = MemoryLedger::new(acct(0xFE));
        ledger.set_minter(acct(0xE0));
        let mut emitter = EmissionSchedule::new(admin(), acct(0xE0), EMISSION);
        let mut registry = TurntableRegistry::new(admin(), acct(0xC0), 1, 1);
        let listeners = UniqueListenerLedger::new(admin(), acct(0xD0), 2);

        emitter.add_pool(admin(), 0, acct(0xA0), 500).unwrap();
        emitter.add_pool(admin(), 0, registry.account(), 400).unwrap();
        emitter.add_pool(admin(), 0, listeners.account(), 100).unwrap();
        emitter.start(admin(), 0).unwrap();

        let type_id = registry.add_type(admin(), 1_000, 500, 10, 300).unwrap();
        registry.allow_type(admin(), type_id).unwrap();
        ledger.issue(erin(), 1_000_000);
        registry.buy(erin(), &mut ledger, &mut emitter, 0, type_id).unwrap();

        let mut nft = MemoryNft::new();
        for _ in 0..3 {
            nft.mint(alice()); // ids 0, 1, 2
        }
        for _ in 0..2 {
            nft.mint(bob()); // ids 3, 4
        }

        Fixture {
            listeners,
            registry,
            emitter,
            ledger,
            nft,
        }
    }

    // ------------------------------------------------------------------
    // Fee configuration
    // ------------------------------------------------------------------

    #[test]
    fn fee_defaults_and_set() {
        let mut f = setup();
        assert_eq!(f.listeners.turntable_fee(), 300);

        assert_eq!(
            f.listeners.set_turntable_fee(alice(), 100),
            Err(ListenerError::NotAdmin)
        );
        f.listeners.set_turntable_fee(admin(), 100).unwrap();
        assert_eq!(f.listeners.turntable_fee(), 100);

        assert_eq!(
            f.listeners.set_turntable_fee(admin(), 10_000),
            Err(ListenerError::FeeTooHigh(10_000))
        );
    }

    // ------------------------------------------------------------------
    // Backlog burn
    // ------------------------------------------------------------------

    #[test]
    fn backlog_before_first_listener_is_burned() {
        let mut f = setup();

        // 50 blocks of emission accrued with zero listeners.
        let backlog = REWARD_PER_BLOCK * 50;
        let sink = f.ledger.balance_of(f.ledger.fee_sink());
        f.listeners
            .listen(bob(), &mut f.ledger, &mut f.emitter, &f.registry, &f.nft, 50, 0, &[3])
            .unwrap();

        assert_eq!(f.ledger.balance_of(bob()), 0);
        assert_eq!(
            f.ledger.balance_of(f.ledger.fee_sink()),
            sink + backlog * 30 / 10_000
        );

        // The first listener starts clean from the post-burn accumulator.
        let net = f
            .listeners
            .claim(bob(), &mut f.ledger, &mut f.emitter, &f.registry, &f.nft, 51, 0, &[3])
            .unwrap();
        assert_eq!(net, REWARD_PER_BLOCK * 97 / 100);
        assert_eq!(
            f.ledger.balance_of(erin()),
            REWARD_PER_BLOCK * 3 / 100
        );
    }

    // ------------------------------------------------------------------
    // Listen validation
    // ------------------------------------------------------------------

    #[test]
    fn listen_requires_live_turntable() {
        let mut f = setup();
        assert_eq!(
            f.listeners
                .listen(bob(), &mut f.ledger, &mut f.emitter, &f.registry, &f.nft, 10, 9, &[3]),
            Err(ListenerError::Turntable(
                platter_core::error::TurntableError::UnknownTurntable(9)
            ))
        );

        f.registry
            .destroy(erin(), &mut f.ledger, &mut f.emitter, 10, 0)
            .unwrap();
        assert_eq!(
            f.listeners
                .listen(bob(), &mut f.ledger, &mut f.emitter, &f.registry, &f.nft, 11, 0, &[3]),
            Err(ListenerError::Turntable(
                platter_core::error::TurntableError::TurntableDestroyed(0)
            ))
        );
    }

    #[test]
    fn listen_requires_key_ownership() {
        let mut f = setup();
        assert_eq!(
            f.listeners
                .listen(alice(), &mut f.ledger, &mut f.emitter, &f.registry, &f.nft, 10, 0, &[3]),
            Err(ListenerError::NotKeyHolder)
        );
        // A batch with one foreign id fails entirely.
        assert_eq!(
            f.listeners
                .listen(alice(), &mut f.ledger, &mut f.emitter, &f.registry, &f.nft, 10, 0, &[1, 3]),
            Err(ListenerError::NotKeyHolder)
        );
        assert!(!f.listeners.listening(1));

        f.listeners
            .listen(alice(), &mut f.ledger, &mut f.emitter, &f.registry, &f.nft, 10, 0, &[1, 2])
            .unwrap();
        assert!(f.listeners.listening(1));
        assert!(f.listeners.listening(2));
    }

    #[test]
    fn double_listen_same_turntable_rejected() {
        let mut f = setup();
        f.listeners
            .listen(alice(), &mut f.ledger, &mut f.emitter, &f.registry, &f.nft, 10, 0, &[0])
            .unwrap();
        assert_eq!(
            f.listeners
                .listen(alice(), &mut f.ledger, &mut f.emitter, &f.registry, &f.nft, 11, 0, &[0]),
            Err(ListenerError::AlreadyListening(0))
        );
        // A duplicate inside one batch is the same violation.
        assert_eq!(
            f.listeners
                .listen(alice(), &mut f.ledger, &mut f.emitter, &f.registry, &f.nft, 11, 0, &[1, 1]),
            Err(ListenerError::AlreadyListening(0))
        );
    }

    #[test]
    fn listen_elsewhere_migrates_with_auto_claim() {
        let mut f = setup();
        let type_id = 0;
        f.registry
            .buy(erin(), &mut f.ledger, &mut f.emitter, 0, type_id)
            .unwrap(); // turntable 1

        f.listeners
            .listen(alice(), &mut f.ledger, &mut f.emitter, &f.registry, &f.nft, 100, 0, &[0])
            .unwrap();

        // Migrating to turntable 1 pays out the accrual on turntable 0.
        let before = f.ledger.balance_of(alice());
        f.listeners
            .listen(alice(), &mut f.ledger, &mut f.emitter, &f.registry, &f.nft, 110, 1, &[0])
            .unwrap();
        assert_eq!(
            f.ledger.balance_of(alice()),
            before + REWARD_PER_BLOCK * 10 * 97 / 100
        );
        assert_eq!(f.listeners.entry(0).unwrap().turntable_id, 1);
        assert_eq!(f.listeners.listener_count(0), 0);
        assert_eq!(f.listeners.listener_count(1), 1);

        // And back again is allowed.
        f.listeners
            .listen(alice(), &mut f.ledger, &mut f.emitter, &f.registry, &f.nft, 120, 0, &[0])
            .unwrap();
        assert_eq!(f.listeners.entry(0).unwrap().turntable_id, 0);
    }

    // ------------------------------------------------------------------
    // Claim
    // ------------------------------------------------------------------

    #[test]
    fn fee_split_matches_schedule() {
        // One listener holding all shares; 10 blocks at 100_000 accrue
        // 1_000_000: the claim pays 970_000 net and 30_000 to the owner.
        let mut f = setup();
        f.listeners
            .listen(alice(), &mut f.ledger, &mut f.emitter, &f.registry, &f.nft, 100, 0, &[0])
            .unwrap();

        let erin_before = f.ledger.balance_of(erin());
        let net = f
            .listeners
            .claim(alice(), &mut f.ledger, &mut f.emitter, &f.registry, &f.nft, 110, 0, &[0])
            .unwrap();
        assert_eq!(net, 970_000);
        assert_eq!(f.ledger.balance_of(alice()), 970_000);
        assert_eq!(f.ledger.balance_of(erin()), erin_before + 30_000);
    }

    #[test]
    fn claim_is_idempotent_within_a_block() {
        let mut f = setup();
        f.listeners
            .listen(alice(), &mut f.ledger, &mut f.emitter, &f.registry, &f.nft, 100, 0, &[0])
            .unwrap();
        f.listeners
            .claim(alice(), &mut f.ledger, &mut f.emitter, &f.registry, &f.nft, 110, 0, &[0])
            .unwrap();

        let alice_before = f.ledger.balance_of(alice());
        let erin_before = f.ledger.balance_of(erin());
        let net = f
            .listeners
            .claim(alice(), &mut f.ledger, &mut f.emitter, &f.registry, &f.nft, 110, 0, &[0])
            .unwrap();
        assert_eq!(net, 0);
        assert_eq!(f.ledger.balance_of(alice()), alice_before);
        assert_eq!(f.ledger.balance_of(erin()), erin_before);
    }

    #[test]
    fn claim_requires_listening_and_key() {
        let mut f = setup();
        assert_eq!(
            f.listeners
                .claim(bob(), &mut f.ledger, &mut f.emitter, &f.registry, &f.nft, 10, 0, &[3]),
            Err(ListenerError::NotListening(0))
        );

        f.listeners
            .listen(bob(), &mut f.ledger, &mut f.emitter, &f.registry, &f.nft, 10, 0, &[3])
            .unwrap();
        assert_eq!(
            f.listeners
                .claim(alice(), &mut f.ledger, &mut f.emitter, &f.registry, &f.nft, 11, 0, &[3]),
            Err(ListenerError::NotKeyHolder)
        );
    }

    #[test]
    fn transferred_key_moves_claim_rights() {
        let mut f = setup();
        f.listeners
            .listen(alice(), &mut f.ledger, &mut f.emitter, &f.registry, &f.nft, 100, 0, &[0])
            .unwrap();

        f.nft.transfer(alice(), bob(), 0).unwrap();
        assert!(f.listeners.listening(0));

        assert_eq!(
            f.listeners
                .claim(alice(), &mut f.ledger, &mut f.emitter, &f.registry, &f.nft, 103, 0, &[0]),
            Err(ListenerError::NotKeyHolder)
        );
        let net = f
            .listeners
            .claim(bob(), &mut f.ledger, &mut f.emitter, &f.registry, &f.nft, 103, 0, &[0])
            .unwrap();
        // The full three-block accrual follows the key to its new holder.
        assert_eq!(net, REWARD_PER_BLOCK * 3 * 97 / 100);
    }

    #[test]
    fn destroyed_turntable_burns_fee_but_pays_listener() {
        let mut f = setup();
        f.listeners
            .listen(bob(), &mut f.ledger, &mut f.emitter, &f.registry, &f.nft, 100, 0, &[3])
            .unwrap();

        f.registry
            .destroy(erin(), &mut f.ledger, &mut f.emitter, 102, 0)
            .unwrap();
        let erin_before = f.ledger.balance_of(erin());
        let sink_before = f.ledger.balance_of(f.ledger.fee_sink());

        let gross = REWARD_PER_BLOCK * 4;
        let fee = gross * 300 / 10_000;
        let net = f
            .listeners
            .claim(bob(), &mut f.ledger, &mut f.emitter, &f.registry, &f.nft, 104, 0, &[3])
            .unwrap();
        assert_eq!(net, gross - fee);
        // Fee burned, not paid to the last owner; the sink takes the tax.
        assert_eq!(f.ledger.balance_of(erin()), erin_before);
        assert_eq!(
            f.ledger.balance_of(f.ledger.fee_sink()),
            sink_before + fee * 30 / 10_000
        );
    }

    #[test]
    fn fee_goes_to_owner_even_after_expiry() {
        let mut f = setup();
        // Short-lived type: turntable 1 expires at block 50.
        let type_id = f.registry.add_type(admin(), 1_000, 500, 10, 50).unwrap();
        f.registry.allow_type(admin(), type_id).unwrap();
        f.registry
            .buy(erin(), &mut f.ledger, &mut f.emitter, 0, type_id)
            .unwrap(); // turntable 1

        f.listeners
            .listen(bob(), &mut f.ledger, &mut f.emitter, &f.registry, &f.nft, 100, 1, &[3])
            .unwrap();
        let erin_before = f.ledger.balance_of(erin());

        let net = f
            .listeners
            .claim(bob(), &mut f.ledger, &mut f.emitter, &f.registry, &f.nft, 110, 1, &[3])
            .unwrap();
        let gross = REWARD_PER_BLOCK * 10;
        assert_eq!(net, gross * 97 / 100);
        // Expired but not destroyed: the owner still takes the fee.
        assert_eq!(f.ledger.balance_of(erin()), erin_before + gross * 3 / 100);
    }

    #[test]
    fn owner_listening_to_own_turntable_keeps_the_fee() {
        let mut f = setup();
        let id = f.nft.mint(erin());
        f.listeners
            .listen(erin(), &mut f.ledger, &mut f.emitter, &f.registry, &f.nft, 100, 0, &[id])
            .unwrap();

        let before = f.ledger.balance_of(erin());
        f.listeners
            .claim(erin(), &mut f.ledger, &mut f.emitter, &f.registry, &f.nft, 110, 0, &[id])
            .unwrap();
        // Fee and remainder both land on erin: the full gross.
        assert_eq!(f.ledger.balance_of(erin()), before + REWARD_PER_BLOCK * 10);
    }

    // ------------------------------------------------------------------
    // Unlisten
    // ------------------------------------------------------------------

    #[test]
    fn unlisten_settles_and_removes() {
        let mut f = setup();
        f.listeners
            .listen(alice(), &mut f.ledger, &mut f.emitter, &f.registry, &f.nft, 100, 0, &[0])
            .unwrap();

        f.listeners
            .unlisten(alice(), &mut f.ledger, &mut f.emitter, &f.registry, &f.nft, 110, 0, &[0])
            .unwrap();
        assert_eq!(
            f.ledger.balance_of(alice()),
            REWARD_PER_BLOCK * 10 * 97 / 100
        );
        assert!(!f.listeners.listening(0));
        assert_eq!(f.listeners.listener_count(0), 0);
        assert_eq!(f.listeners.total_shares(), 0);
    }

    #[test]
    fn unlisten_requires_listening_to_that_turntable() {
        let mut f = setup();
        assert_eq!(
            f.listeners
                .unlisten(alice(), &mut f.ledger, &mut f.emitter, &f.registry, &f.nft, 10, 0, &[2]),
            Err(ListenerError::NotListening(0))
        );
    }

    #[test]
    fn enumeration_swap_pops() {
        let mut f = setup();
        f.listeners
            .listen(alice(), &mut f.ledger, &mut f.emitter, &f.registry, &f.nft, 10, 0, &[0, 1, 2])
            .unwrap();
        assert_eq!(f.listeners.listener_count(0), 3);
        assert_eq!(f.listeners.listeners(0, 0), Some(0));
        assert_eq!(f.listeners.listeners(0, 2), Some(2));

        f.listeners
            .unlisten(alice(), &mut f.ledger, &mut f.emitter, &f.registry, &f.nft, 11, 0, &[0])
            .unwrap();
        // Last element swapped into the removed slot.
        assert_eq!(f.listeners.listener_count(0), 2);
        assert_eq!(f.listeners.listeners(0, 0), Some(2));
        assert_eq!(f.listeners.listeners(0, 1), Some(1));
        assert_eq!(f.listeners.listeners(0, 2), None);

        // The moved id's slot stays consistent for later removal.
        f.listeners
            .unlisten(alice(), &mut f.ledger, &mut f.emitter, &f.registry, &f.nft, 12, 0, &[2])
            .unwrap();
        assert_eq!(f.listeners.listeners(0, 0), Some(1));
        assert_eq!(f.listeners.total_shares(), 1);
    }

    // ------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------

    #[test]
    fn claimable_matches_claim() {
        let mut f = setup();
        f.listeners
            .listen(alice(), &mut f.ledger, &mut f.emitter, &f.registry, &f.nft, 100, 0, &[0])
            .unwrap();

        let projected = f
            .listeners
            .claimable_of(&f.ledger, &f.emitter, 110, 0, 0)
            .unwrap();
        assert_eq!(projected, REWARD_PER_BLOCK * 10);

        let net = f
            .listeners
            .claim(alice(), &mut f.ledger, &mut f.emitter, &f.registry, &f.nft, 110, 0, &[0])
            .unwrap();
        // claimable_of reports gross; claim pays net of the fee.
        assert_eq!(net, projected * 97 / 100);
        assert_eq!(
            f.listeners.claimed_of(0, 0).unwrap(),
            projected * 97 / 100
        );
    }

    #[test]
    fn shares_accounting() {
        let mut f = setup();
        f.listeners
            .listen(alice(), &mut f.ledger, &mut f.emitter, &f.registry, &f.nft, 10, 0, &[0, 1])
            .unwrap();
        f.listeners
            .listen(bob(), &mut f.ledger, &mut f.emitter, &f.registry, &f.nft, 10, 0, &[3])
            .unwrap();
        assert_eq!(f.listeners.table_shares(0), 3);
        assert_eq!(f.listeners.total_shares(), 3);
    }
}
