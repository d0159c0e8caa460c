//! Turntable catalog, sales, expiry accounting, and owner settlement.
//!
//! The registry is one weighted pool of the emission schedule. Income it
//! receives is shared across live turntables pro rata by type volume,
//! tracked with a running reward-per-unit-volume accumulator (updated on
//! every pull, and always in the same operation that changes
//! `total_volume`). Per-turntable settlement splits the accrued amount at
//! the turntable's `end_block`: blocks lived before expiry pay the owner,
//! blocks after expiry burn.
//!
//! Sale proceeds are escrowed in the registry's own account and never enter
//! the reward accumulator; `destroy` disburses exactly `destroy_return`
//! back to the owner and burns the rest of the original price.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use platter_core::constants::POINTS_PRECISION;
use platter_core::error::{LedgerError, TurntableError};
use platter_core::ledger::CurrencyLedger;
use platter_core::types::AccountId;
use platter_emitter::EmissionSchedule;

/// An immutable turntable model. Only the whitelist flag ever changes.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TurntableType {
    /// Purchase price, escrowed by the registry.
    pub price: u64,
    /// Refund on destruction. Never exceeds `price`.
    pub destroy_return: u64,
    /// Reward weight each turntable of this type contributes to
    /// `total_volume`.
    pub volume: u64,
    /// Lifetime in blocks granted at purchase.
    pub lifetime: u64,
    /// Whether the type is currently purchasable.
    pub whitelisted: bool,
}

/// A sold turntable. Ids are monotonic and never reused; a destroyed
/// turntable keeps its slot with `owner == None` and is permanently inert.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Turntable {
    /// Current owner; `None` once destroyed.
    pub owner: Option<AccountId>,
    /// Index into the type catalog.
    pub type_id: usize,
    /// Accrual past this block burns instead of paying the owner.
    pub end_block: u64,
    /// Block of the last settlement.
    pub last_claimed_block: u64,
    /// Accumulator value at the last settlement.
    pub points_snapshot: u128,
    /// Lifetime sum paid to owners of this turntable.
    pub total_claimed: u64,
}

/// Registry events for off-chain indexing only.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum TurntableEvent {
    TypeAdded {
        type_id: usize,
        price: u64,
        destroy_return: u64,
        volume: u64,
        lifetime: u64,
    },
    TypeAllowed {
        type_id: usize,
    },
    TypeDenied {
        type_id: usize,
    },
    Bought {
        id: u64,
        owner: AccountId,
        type_id: usize,
    },
    Claimed {
        id: u64,
        paid: u64,
        burned: u64,
    },
    Charged {
        id: u64,
        amount: u64,
        new_end_block: u64,
    },
    Destroyed {
        id: u64,
        owner: AccountId,
    },
}

/// The decaying asset registry.
///
/// Single writer per transaction; wrap in a lock for concurrent use.
pub struct TurntableRegistry {
    admin: AccountId,
    /// The registry's own currency account (emission income and escrow).
    account: AccountId,
    /// This registry's pool id in the emission schedule.
    pool_id: usize,
    /// Multiplier in the charge-extension formula. Zero disables charging.
    charging_efficiency: u64,
    types: Vec<TurntableType>,
    turntables: Vec<Turntable>,
    /// Σ type volume over live turntables.
    total_volume: u64,
    /// Reward per unit volume, scaled by `POINTS_PRECISION`.
    points_per_volume: u128,
    /// Own balance at the last accounting point; the delta above it on the
    /// next pull is new reward income.
    tracked_balance: u64,
    events: Vec<TurntableEvent>,
}

impl TurntableRegistry {
    /// Create a registry administered by `admin`, holding funds under
    /// `account`, registered as pool `pool_id` of the emission schedule.
    pub fn new(
        admin: AccountId,
        account: AccountId,
        pool_id: usize,
        charging_efficiency: u64,
    ) -> Self {
        Self {
            admin,
            account,
            pool_id,
            charging_efficiency,
            types: Vec::new(),
            turntables: Vec::new(),
            total_volume: 0,
            points_per_volume: 0,
            tracked_balance: 0,
            events: Vec::new(),
        }
    }

    fn ensure_admin(&self, caller: AccountId) -> Result<(), TurntableError> {
        if caller != self.admin {
            return Err(TurntableError::NotAdmin);
        }
        Ok(())
    }

    fn ensure_funds(
        ledger: &dyn CurrencyLedger,
        who: AccountId,
        amount: u64,
    ) -> Result<(), TurntableError> {
        let have = ledger.balance_of(who);
        if have < amount {
            return Err(LedgerError::InsufficientBalance { have, need: amount }.into());
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Catalog
    // ------------------------------------------------------------------

    /// Add a type to the catalog (not yet whitelisted). Admin only.
    pub fn add_type(
        &mut self,
        caller: AccountId,
        price: u64,
        destroy_return: u64,
        volume: u64,
        lifetime: u64,
    ) -> Result<usize, TurntableError> {
        self.ensure_admin(caller)?;
        if destroy_return > price {
            return Err(TurntableError::DestroyReturnExceedsPrice {
                destroy_return,
                price,
            });
        }
        let type_id = self.types.len();
        self.types.push(TurntableType {
            price,
            destroy_return,
            volume,
            lifetime,
            whitelisted: false,
        });
        self.events.push(TurntableEvent::TypeAdded {
            type_id,
            price,
            destroy_return,
            volume,
            lifetime,
        });
        debug!(type_id, price, volume, lifetime, "turntables: type added");
        Ok(type_id)
    }

    /// Whitelist a type for purchase. Admin only.
    pub fn allow_type(&mut self, caller: AccountId, type_id: usize) -> Result<(), TurntableError> {
        self.ensure_admin(caller)?;
        self.types
            .get_mut(type_id)
            .ok_or(TurntableError::UnknownType(type_id))?
            .whitelisted = true;
        self.events.push(TurntableEvent::TypeAllowed { type_id });
        Ok(())
    }

    /// Remove a type from the whitelist. Admin only.
    pub fn deny_type(&mut self, caller: AccountId, type_id: usize) -> Result<(), TurntableError> {
        self.ensure_admin(caller)?;
        self.types
            .get_mut(type_id)
            .ok_or(TurntableError::UnknownType(type_id))?
            .whitelisted = false;
        self.events.push(TurntableEvent::TypeDenied { type_id });
        Ok(())
    }

    /// Adjust the charge-extension multiplier. Admin only. Zero disables
    /// charging.
    pub fn set_charging_efficiency(
        &mut self,
        caller: AccountId,
        efficiency: u64,
    ) -> Result<(), TurntableError> {
        self.ensure_admin(caller)?;
        self.charging_efficiency = efficiency;
        info!(efficiency, "turntables: charging efficiency changed");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Accrual
    // ------------------------------------------------------------------

    /// Settle this registry's emission pool and fold any new income into
    /// the accumulator. While no volume exists the delta stays untracked
    /// (absorbed into escrow on the next balance sync, never distributed).
    fn pull(
        &mut self,
        ledger: &mut dyn CurrencyLedger,
        emitter: &mut EmissionSchedule,
        now: u64,
    ) -> Result<(), TurntableError> {
        emitter.settle(ledger, now, self.pool_id)?;
        let balance = ledger.balance_of(self.account);
        let delta = balance.saturating_sub(self.tracked_balance);
        if delta > 0 && self.total_volume > 0 {
            let points = (delta as u128)
                .checked_mul(POINTS_PRECISION)
                .ok_or(TurntableError::ArithmeticOverflow)?
                / self.total_volume as u128;
            self.points_per_volume = self
                .points_per_volume
                .checked_add(points)
                .ok_or(TurntableError::ArithmeticOverflow)?;
            self.tracked_balance = balance;
        }
        Ok(())
    }

    fn sync_balance(&mut self, ledger: &dyn CurrencyLedger) {
        self.tracked_balance = ledger.balance_of(self.account);
    }

    /// Earned/expired split of an accrued amount over `last..now` with
    /// expiry at `end`. Returns the earned (owner-paid) part.
    fn earned_part(accrued: u64, last: u64, end: u64, now: u64) -> u64 {
        if accrued == 0 || end <= last {
            0
        } else if now <= end {
            accrued
        } else {
            // Floor division; the truncated remainder burns with the
            // expired part.
            ((accrued as u128) * ((end - last) as u128) / ((now - last) as u128)) as u64
        }
    }

    /// Settle one turntable against the current accumulator. Assumes the
    /// caller has validated ownership and already pulled. Returns the
    /// amount paid to the owner.
    fn settle_one(
        &mut self,
        ledger: &mut dyn CurrencyLedger,
        now: u64,
        id: u64,
    ) -> Result<u64, TurntableError> {
        let points = self.points_per_volume;
        let (owner, accrued, paid, burned) = {
            let table = self
                .turntables
                .get_mut(id as usize)
                .ok_or(TurntableError::UnknownTurntable(id))?;
            let owner = table.owner.ok_or(TurntableError::TurntableDestroyed(id))?;
            let volume = self.types[table.type_id].volume;
            let diff = points
                .checked_sub(table.points_snapshot)
                .ok_or(TurntableError::ArithmeticOverflow)?;
            let accrued = u64::try_from(
                (volume as u128)
                    .checked_mul(diff)
                    .ok_or(TurntableError::ArithmeticOverflow)?
                    / POINTS_PRECISION,
            )
            .map_err(|_| TurntableError::ArithmeticOverflow)?;
            let paid = Self::earned_part(accrued, table.last_claimed_block, table.end_block, now);
            table.points_snapshot = points;
            table.last_claimed_block = now;
            table.total_claimed = table
                .total_claimed
                .checked_add(paid)
                .ok_or(TurntableError::ArithmeticOverflow)?;
            (owner, accrued, paid, accrued - paid)
        };
        if paid > 0 {
            ledger.transfer(self.account, owner, paid)?;
        }
        if burned > 0 {
            ledger.burn(self.account, burned)?;
        }
        if accrued > 0 {
            self.sync_balance(ledger);
            self.events.push(TurntableEvent::Claimed { id, paid, burned });
            debug!(id, paid, burned, "turntables: settled");
        }
        Ok(paid)
    }

    fn ensure_owned(&self, caller: AccountId, id: u64) -> Result<&Turntable, TurntableError> {
        let table = self
            .turntables
            .get(id as usize)
            .ok_or(TurntableError::UnknownTurntable(id))?;
        match table.owner {
            None => Err(TurntableError::TurntableDestroyed(id)),
            Some(owner) if owner != caller => Err(TurntableError::NotTurntableOwner(id)),
            Some(_) => Ok(table),
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Buy a turntable of a whitelisted type. The price moves from the
    /// caller into the registry's escrow. Returns the new id.
    pub fn buy(
        &mut self,
        caller: AccountId,
        ledger: &mut dyn CurrencyLedger,
        emitter: &mut EmissionSchedule,
        now: u64,
        type_id: usize,
    ) -> Result<u64, TurntableError> {
        let ty = self
            .types
            .get(type_id)
            .ok_or(TurntableError::UnknownType(type_id))?;
        if !ty.whitelisted {
            return Err(TurntableError::TypeNotWhitelisted(type_id));
        }
        let (price, volume, lifetime) = (ty.price, ty.volume, ty.lifetime);
        Self::ensure_funds(ledger, caller, price)?;
        let end_block = now
            .checked_add(lifetime)
            .ok_or(TurntableError::ArithmeticOverflow)?;
        let new_volume = self
            .total_volume
            .checked_add(volume)
            .ok_or(TurntableError::ArithmeticOverflow)?;

        // Checkpoint the accumulator before the volume changes.
        self.pull(ledger, emitter, now)?;
        ledger.transfer(caller, self.account, price)?;
        self.sync_balance(ledger);

        let id = self.turntables.len() as u64;
        self.turntables.push(Turntable {
            owner: Some(caller),
            type_id,
            end_block,
            last_claimed_block: now,
            points_snapshot: self.points_per_volume,
            total_claimed: 0,
        });
        self.total_volume = new_volume;
        self.events.push(TurntableEvent::Bought {
            id,
            owner: caller,
            type_id,
        });
        debug!(id, type_id, end_block, "turntables: bought");
        Ok(id)
    }

    /// Settle the listed turntables to their owner (the caller). Every id
    /// must exist, be live, and be owned by the caller. Returns the total
    /// paid out.
    pub fn claim(
        &mut self,
        caller: AccountId,
        ledger: &mut dyn CurrencyLedger,
        emitter: &mut EmissionSchedule,
        now: u64,
        ids: &[u64],
    ) -> Result<u64, TurntableError> {
        for &id in ids {
            self.ensure_owned(caller, id)?;
        }
        self.pull(ledger, emitter, now)?;
        let mut total = 0u64;
        for &id in ids {
            let paid = self.settle_one(ledger, now, id)?;
            total = total
                .checked_add(paid)
                .ok_or(TurntableError::ArithmeticOverflow)?;
        }
        Ok(total)
    }

    /// Extend a turntable's life by burning currency from the caller.
    ///
    /// `extension = amount × lifetime × efficiency ÷ price` blocks. An
    /// already expired turntable restarts from the current block; a live
    /// one extends its existing `end_block`. The payment is consumed
    /// through the currency's burn primitive (no mint, no registry fee).
    pub fn charge(
        &mut self,
        caller: AccountId,
        ledger: &mut dyn CurrencyLedger,
        emitter: &mut EmissionSchedule,
        now: u64,
        id: u64,
        amount: u64,
    ) -> Result<(), TurntableError> {
        if self.charging_efficiency == 0 {
            return Err(TurntableError::ChargingDisabled);
        }
        let table = self.ensure_owned(caller, id)?;
        let ty = &self.types[table.type_id];
        let extension = u64::try_from(
            (amount as u128)
                .checked_mul(ty.lifetime as u128)
                .and_then(|v| v.checked_mul(self.charging_efficiency as u128))
                .and_then(|v| v.checked_div(ty.price as u128))
                .ok_or(TurntableError::ArithmeticOverflow)?,
        )
        .map_err(|_| TurntableError::ArithmeticOverflow)?;
        Self::ensure_funds(ledger, caller, amount)?;

        // Settle before extending so the expired span is priced against
        // the old end block.
        self.pull(ledger, emitter, now)?;
        self.settle_one(ledger, now, id)?;
        ledger.burn(caller, amount)?;

        let table = &mut self.turntables[id as usize];
        table.end_block = if table.end_block < now {
            now.checked_add(extension)
        } else {
            table.end_block.checked_add(extension)
        }
        .ok_or(TurntableError::ArithmeticOverflow)?;
        let new_end_block = table.end_block;
        self.events.push(TurntableEvent::Charged {
            id,
            amount,
            new_end_block,
        });
        debug!(id, amount, new_end_block, "turntables: charged");
        Ok(())
    }

    /// Destroy a turntable: settle it, refund `destroy_return`, burn the
    /// rest of the escrowed price, and retire the id for good.
    pub fn destroy(
        &mut self,
        caller: AccountId,
        ledger: &mut dyn CurrencyLedger,
        emitter: &mut EmissionSchedule,
        now: u64,
        id: u64,
    ) -> Result<(), TurntableError> {
        let table = self.ensure_owned(caller, id)?;
        let ty = &self.types[table.type_id];
        let (volume, destroy_return) = (ty.volume, ty.destroy_return);
        let burn_amount = ty.price - ty.destroy_return;

        // Checkpoint the accumulator before the volume changes.
        self.pull(ledger, emitter, now)?;
        self.settle_one(ledger, now, id)?;

        self.total_volume = self
            .total_volume
            .checked_sub(volume)
            .ok_or(TurntableError::ArithmeticOverflow)?;
        let table = &mut self.turntables[id as usize];
        table.owner = None;
        table.end_block = 0;

        if destroy_return > 0 {
            ledger.transfer(self.account, caller, destroy_return)?;
        }
        if burn_amount > 0 {
            ledger.burn(self.account, burn_amount)?;
        }
        self.sync_balance(ledger);
        self.events.push(TurntableEvent::Destroyed { id, owner: caller });
        info!(id, "turntables: destroyed");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------

    /// Amount a claim at block `now` would pay the owner. Read-only:
    /// projects the accumulator over the pool's pending emission without
    /// mutating anything. `Ok(0)` for destroyed ids; unknown ids error.
    pub fn claimable_of(
        &self,
        ledger: &dyn CurrencyLedger,
        emitter: &EmissionSchedule,
        now: u64,
        id: u64,
    ) -> Result<u64, TurntableError> {
        let table = self
            .turntables
            .get(id as usize)
            .ok_or(TurntableError::UnknownTurntable(id))?;
        if table.owner.is_none() {
            return Ok(0);
        }
        let mut points = self.points_per_volume;
        if self.total_volume > 0 {
            let unaccounted = ledger
                .balance_of(self.account)
                .saturating_sub(self.tracked_balance);
            let incoming = emitter
                .pending(now, self.pool_id)?
                .checked_add(unaccounted)
                .ok_or(TurntableError::ArithmeticOverflow)?;
            if incoming > 0 {
                points = points
                    .checked_add(
                        (incoming as u128)
                            .checked_mul(POINTS_PRECISION)
                            .ok_or(TurntableError::ArithmeticOverflow)?
                            / self.total_volume as u128,
                    )
                    .ok_or(TurntableError::ArithmeticOverflow)?;
            }
        }
        let volume = self.types[table.type_id].volume;
        let diff = points
            .checked_sub(table.points_snapshot)
            .ok_or(TurntableError::ArithmeticOverflow)?;
        let accrued = u64::try_from(
            (volume as u128)
                .checked_mul(diff)
                .ok_or(TurntableError::ArithmeticOverflow)?
                / POINTS_PRECISION,
        )
        .map_err(|_| TurntableError::ArithmeticOverflow)?;
        Ok(Self::earned_part(
            accrued,
            table.last_claimed_block,
            table.end_block,
            now,
        ))
    }

    /// Whether `id` refers to a live (not destroyed) turntable.
    pub fn exists(&self, id: u64) -> bool {
        self.turntables
            .get(id as usize)
            .is_some_and(|t| t.owner.is_some())
    }

    /// Current owner of `id`. `Ok(None)` once destroyed; unknown ids error.
    pub fn owner_of(&self, id: u64) -> Result<Option<AccountId>, TurntableError> {
        self.turntables
            .get(id as usize)
            .map(|t| t.owner)
            .ok_or(TurntableError::UnknownTurntable(id))
    }

    /// Turntable state by id.
    pub fn turntable(&self, id: u64) -> Result<&Turntable, TurntableError> {
        self.turntables
            .get(id as usize)
            .ok_or(TurntableError::UnknownTurntable(id))
    }

    /// Type by id.
    pub fn turntable_type(&self, type_id: usize) -> Result<&TurntableType, TurntableError> {
        self.types
            .get(type_id)
            .ok_or(TurntableError::UnknownType(type_id))
    }

    /// Number of turntables ever sold (including destroyed ones).
    pub fn turntable_count(&self) -> usize {
        self.turntables.len()
    }

    /// Number of catalog types.
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// Σ type volume over live turntables.
    pub fn total_volume(&self) -> u64 {
        self.total_volume
    }

    /// Current charge-extension multiplier.
    pub fn charging_efficiency(&self) -> u64 {
        self.charging_efficiency
    }

    /// The registry's own currency account.
    pub fn account(&self) -> AccountId {
        self.account
    }

    /// Drain the event journal.
    pub fn take_events(&mut self) -> Vec<TurntableEvent> {
        std::mem::take(&mut self.events)
    }
}
