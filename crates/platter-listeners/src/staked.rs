//! Listener ledger keyed by staker account, with fungible stake amounts.
//!
//! Same semantics as the unique-id variant, with the staked amount as the
//! share unit: an account listens to at most one turntable, staking a
//! token amount that is held by the ledger and returned in full on
//! unlisten (or on migration to another turntable).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use platter_core::constants::{BPS_PRECISION, DEFAULT_TURNTABLE_FEE_BPS, POINTS_PRECISION};
use platter_core::error::{ListenerError, TokenError};
use platter_core::ledger::CurrencyLedger;
use platter_core::tokens::StakeToken;
use platter_core::types::AccountId;
use platter_emitter::EmissionSchedule;
use platter_turntables::TurntableRegistry;

use crate::accrual::{SharePool, distribute, ensure_live};

/// Per-account staking state.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct StakedEntry {
    /// The turntable this account listens to.
    pub turntable_id: u64,
    /// Staked amount, held by the ledger until unlisten.
    pub shares: u64,
    /// Accumulator value at the last settlement.
    pub point_snapshot: u128,
    /// Lifetime net amount claimed by this account.
    pub total_claimed: u64,
    /// Position in the turntable's enumeration array.
    index: usize,
}

/// Ledger events for off-chain indexing only.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum StakedListenerEvent {
    Listened {
        turntable_id: u64,
        account: AccountId,
        shares: u64,
    },
    Unlistened {
        turntable_id: u64,
        account: AccountId,
        shares: u64,
    },
    Claimed {
        turntable_id: u64,
        account: AccountId,
        net: u64,
        fee: u64,
    },
    FeeSet {
        fee_bps: u64,
    },
}

/// Secondary distribution ledger over fungible stake.
///
/// Single writer per transaction; wrap in a lock for concurrent use.
pub struct StakedListenerLedger {
    admin: AccountId,
    fee_bps: u64,
    pool: SharePool,
    entries: HashMap<AccountId, StakedEntry>,
    /// Per-turntable staker accounts, swap-and-pop on removal.
    /// Enumeration order is not stable across removals.
    enumeration: HashMap<u64, Vec<AccountId>>,
    /// Σ entry shares per turntable.
    table_shares: HashMap<u64, u64>,
    events: Vec<StakedListenerEvent>,
}

impl StakedListenerLedger {
    /// Create a ledger administered by `admin`, holding funds under
    /// `account`, registered as pool `pool_id` of the emission schedule.
    pub fn new(admin: AccountId, account: AccountId, pool_id: usize) -> Self {
        Self {
            admin,
            fee_bps: DEFAULT_TURNTABLE_FEE_BPS,
            pool: SharePool::new(account, pool_id),
            entries: HashMap::new(),
            enumeration: HashMap::new(),
            table_shares: HashMap::new(),
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
        self.events.push(StakedListenerEvent::FeeSet { fee_bps });
        info!(fee_bps, "staked-listeners: fee changed");
        Ok(())
    }

    /// Settle one entry against the current accumulator. Assumes a prior
    /// pull. Returns `(net, fee)`.
    fn settle_entry(
        &mut self,
        ledger: &mut dyn CurrencyLedger,
        registry: &TurntableRegistry,
        account: AccountId,
        turntable_id: u64,
    ) -> Result<(u64, u64), ListenerError> {
        let points = self.pool.points_per_share;
        let gross = {
            let entry = self
                .entries
                .get_mut(&account)
                .ok_or(ListenerError::NotListening(turntable_id))?;
            let gross = self.pool.pending_of(entry.shares, entry.point_snapshot)?;
            entry.point_snapshot = points;
            gross
        };
        let (net, fee) = distribute(
            ledger,
            registry,
            self.pool.account,
            account,
            turntable_id,
            gross,
            self.fee_bps,
        )?;
        if let Some(entry) = self.entries.get_mut(&account) {
            entry.total_claimed = entry
                .total_claimed
                .checked_add(net)
                .ok_or(ListenerError::ArithmeticOverflow)?;
        }
        self.pool.sync(ledger);
        Ok((net, fee))
    }

    /// Remove an entry and return its share amount for the stake refund.
    fn remove_entry(
        &mut self,
        account: AccountId,
        turntable_id: u64,
    ) -> Result<u64, ListenerError> {
        let entry = self
            .entries
            .remove(&account)
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
        let table_total = self.table_shares.entry(turntable_id).or_insert(0);
        *table_total = table_total
            .checked_sub(entry.shares)
            .ok_or(ListenerError::ArithmeticOverflow)?;
        self.pool.total_shares = self
            .pool
            .total_shares
            .checked_sub(entry.shares)
            .ok_or(ListenerError::ArithmeticOverflow)?;
        Ok(entry.shares)
    }

    /// Stake `amount` against `turntable_id`.
    ///
    /// The turntable must be live and the amount non-zero. An account
    /// already listening elsewhere is settled, refunded its old stake, and
    /// migrated; listening again to the same turntable errors. The new
    /// shares snapshot the post-pull accumulator.
    #[allow(clippy::too_many_arguments)]
    pub fn listen(
        &mut self,
        caller: AccountId,
        ledger: &mut dyn CurrencyLedger,
        emitter: &mut EmissionSchedule,
        registry: &TurntableRegistry,
        stake: &mut dyn StakeToken,
        now: u64,
        turntable_id: u64,
        amount: u64,
    ) -> Result<(), ListenerError> {
        if amount == 0 {
            return Err(ListenerError::ZeroShares);
        }
        ensure_live(registry, turntable_id)?;
        let prior = match self.entries.get(&caller) {
            Some(entry) if entry.turntable_id == turntable_id => {
                return Err(ListenerError::AlreadyListening(turntable_id));
            }
            Some(entry) => Some((entry.turntable_id, entry.shares)),
            None => None,
        };
        // The old stake comes back before the new one goes in, so it
        // counts toward the new amount.
        let available = stake
            .balance_of(caller)
            .checked_add(prior.map_or(0, |(_, shares)| shares))
            .ok_or(ListenerError::ArithmeticOverflow)?;
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                have: available,
                need: amount,
            }
            .into());
        }

        self.pool.pull(ledger, emitter, now)?;
        if let Some((old_table, _)) = prior {
            self.settle_entry(ledger, registry, caller, old_table)?;
            let shares = self.remove_entry(caller, old_table)?;
            stake.transfer(self.pool.account, caller, shares)?;
            self.events.push(StakedListenerEvent::Unlistened {
                turntable_id: old_table,
                account: caller,
                shares,
            });
        }
        stake.transfer(caller, self.pool.account, amount)?;

        let list = self.enumeration.entry(turntable_id).or_default();
        let index = list.len();
        list.push(caller);
        self.entries.insert(
            caller,
            StakedEntry {
                turntable_id,
                shares: amount,
                point_snapshot: self.pool.points_per_share,
                total_claimed: 0,
                index,
            },
        );
        let table_total = self.table_shares.entry(turntable_id).or_insert(0);
        *table_total = table_total
            .checked_add(amount)
            .ok_or(ListenerError::ArithmeticOverflow)?;
        self.pool.total_shares = self
            .pool
            .total_shares
            .checked_add(amount)
            .ok_or(ListenerError::ArithmeticOverflow)?;
        self.events.push(StakedListenerEvent::Listened {
            turntable_id,
            account: caller,
            shares: amount,
        });
        debug!(turntable_id, amount, "staked-listeners: listened");
        Ok(())
    }

    /// Claim the caller's pending reward on `turntable_id`. Returns the
    /// net amount paid.
    pub fn claim(
        &mut self,
        caller: AccountId,
        ledger: &mut dyn CurrencyLedger,
        emitter: &mut EmissionSchedule,
        registry: &TurntableRegistry,
        now: u64,
        turntable_id: u64,
    ) -> Result<u64, ListenerError> {
        match self.entries.get(&caller) {
            Some(entry) if entry.turntable_id == turntable_id => {}
            _ => return Err(ListenerError::NotListening(turntable_id)),
        }
        self.pool.pull(ledger, emitter, now)?;
        let (net, fee) = self.settle_entry(ledger, registry, caller, turntable_id)?;
        if net > 0 || fee > 0 {
            self.events.push(StakedListenerEvent::Claimed {
                turntable_id,
                account: caller,
                net,
                fee,
            });
        }
        Ok(net)
    }

    /// Stop listening: settle pending reward and return the full stake.
    #[allow(clippy::too_many_arguments)]
    pub fn unlisten(
        &mut self,
        caller: AccountId,
        ledger: &mut dyn CurrencyLedger,
        emitter: &mut EmissionSchedule,
        registry: &TurntableRegistry,
        stake: &mut dyn StakeToken,
        now: u64,
        turntable_id: u64,
    ) -> Result<(), ListenerError> {
        match self.entries.get(&caller) {
            Some(entry) if entry.turntable_id == turntable_id => {}
            _ => return Err(ListenerError::NotListening(turntable_id)),
        }
        self.pool.pull(ledger, emitter, now)?;
        self.settle_entry(ledger, registry, caller, turntable_id)?;
        let shares = self.remove_entry(caller, turntable_id)?;
        stake.transfer(self.pool.account, caller, shares)?;
        self.events.push(StakedListenerEvent::Unlistened {
            turntable_id,
            account: caller,
            shares,
        });
        debug!(turntable_id, shares, "staked-listeners: unlistened");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------

    /// The turntable `account` is listening to, if any.
    pub fn listening_to(&self, account: AccountId) -> Option<u64> {
        self.entries.get(&account).map(|e| e.turntable_id)
    }

    /// Stake of `account` on `turntable_id` (zero when not listening
    /// there).
    pub fn shares(&self, turntable_id: u64, account: AccountId) -> u64 {
        self.entries
            .get(&account)
            .filter(|e| e.turntable_id == turntable_id)
            .map_or(0, |e| e.shares)
    }

    /// Number of accounts listening to `turntable_id`.
    pub fn listener_count(&self, turntable_id: u64) -> usize {
        self.enumeration
            .get(&turntable_id)
            .map_or(0, |list| list.len())
    }

    /// Enumerate staker accounts. Order changes on removal (swap-and-pop).
    pub fn listeners(&self, turntable_id: u64, index: usize) -> Option<AccountId> {
        self.enumeration
            .get(&turntable_id)
            .and_then(|list| list.get(index))
            .copied()
    }

    /// Σ stake on a turntable.
    pub fn table_shares(&self, turntable_id: u64) -> u64 {
        self.table_shares.get(&turntable_id).copied().unwrap_or(0)
    }

    /// Σ stake across all turntables.
    pub fn total_shares(&self) -> u64 {
        self.pool.total_shares
    }

    /// Lifetime net amount claimed by `account` on `turntable_id`.
    pub fn claimed_of(&self, turntable_id: u64, account: AccountId) -> Result<u64, ListenerError> {
        let entry = self
            .entries
            .get(&account)
            .ok_or(ListenerError::NotListening(turntable_id))?;
        if entry.turntable_id != turntable_id {
            return Err(ListenerError::NotListening(turntable_id));
        }
        Ok(entry.total_claimed)
    }

    /// Gross (pre-fee) reward a claim at block `now` would settle for
    /// `account`. Read-only.
    pub fn claimable_of(
        &self,
        ledger: &dyn CurrencyLedger,
        emitter: &EmissionSchedule,
        now: u64,
        turntable_id: u64,
        account: AccountId,
    ) -> Result<u64, ListenerError> {
        let entry = self
            .entries
            .get(&account)
            .ok_or(ListenerError::NotListening(turntable_id))?;
        if entry.turntable_id != turntable_id {
            return Err(ListenerError::NotListening(turntable_id));
        }
        let points = self.pool.projected_points(ledger, emitter, now)?;
        let diff = points
            .checked_sub(entry.point_snapshot)
            .ok_or(ListenerError::ArithmeticOverflow)?;
        u64::try_from(
            (entry.shares as u128)
                .checked_mul(diff)
                .ok_or(ListenerError::ArithmeticOverflow)?
                / POINTS_PRECISION,
        )
        .map_err(|_| ListenerError::ArithmeticOverflow)
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
    pub fn take_events(&mut self) -> Vec<StakedListenerEvent> {
        std::mem::take(&mut self.events)
    }
}
