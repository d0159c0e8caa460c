//! Weighted emission pools with lazy, checkpoint-based settlement.
//!
//! Every pool carries a `last_settled_block` checkpoint; the pending amount
//! is `emission_per_block × elapsed × weight ÷ total_weight`, floor
//! division, computed on demand rather than per block. Settlement advances
//! the checkpoint first and mints second, so a second settle in the same
//! block is a no-op.
//!
//! Weight changes do NOT flush the affected pool: the whole unsettled
//! interval is priced at whichever weight is in effect when the pool is
//! eventually settled. Changing the emission rate, by contrast, settles
//! every pool at the old rate before switching. Downstream accounting
//! relies on this asymmetry.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use platter_core::error::EmitterError;
use platter_core::ledger::CurrencyLedger;
use platter_core::types::AccountId;

/// A weighted emission recipient.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PoolInfo {
    /// Account credited on settlement.
    pub recipient: AccountId,
    /// Relative share of emission. Zero is allowed (the pool earns nothing
    /// but keeps its slot; pools are never deleted).
    pub weight: u64,
    /// Block of the last settlement. `None` until the schedule starts.
    pub last_settled_block: Option<u64>,
}

/// Emission events for off-chain indexing only; nothing reads them
/// internally.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum EmitterEvent {
    PoolAdded {
        pool_id: usize,
        recipient: AccountId,
        weight: u64,
    },
    WeightSet {
        pool_id: usize,
        weight: u64,
    },
    Started {
        block: u64,
    },
    EmissionRateSet {
        emission_per_block: u64,
    },
}

/// The emission scheduler.
///
/// Mints each pool's pro-rata share of newly created currency on demand.
/// Single writer per transaction; wrap in a lock for concurrent use.
pub struct EmissionSchedule {
    admin: AccountId,
    /// Account this schedule mints under; must be registered as the
    /// currency ledger's authorized minter.
    account: AccountId,
    emission_per_block: u64,
    started: bool,
    pools: Vec<PoolInfo>,
    total_weight: u64,
    events: Vec<EmitterEvent>,
}

impl EmissionSchedule {
    /// Create a schedule administered by `admin`, minting as `account`.
    pub fn new(admin: AccountId, account: AccountId, emission_per_block: u64) -> Self {
        Self {
            admin,
            account,
            emission_per_block,
            started: false,
            pools: Vec::new(),
            total_weight: 0,
            events: Vec::new(),
        }
    }

    fn ensure_admin(&self, caller: AccountId) -> Result<(), EmitterError> {
        if caller != self.admin {
            return Err(EmitterError::NotAdmin);
        }
        Ok(())
    }

    /// Append a pool. Admin only.
    ///
    /// Pools added after [`start`](Self::start) are stamped with the
    /// current block; earlier pools wait for the start stamp.
    pub fn add_pool(
        &mut self,
        caller: AccountId,
        now: u64,
        recipient: AccountId,
        weight: u64,
    ) -> Result<usize, EmitterError> {
        self.ensure_admin(caller)?;
        self.total_weight = self
            .total_weight
            .checked_add(weight)
            .ok_or(EmitterError::ArithmeticOverflow)?;
        let pool_id = self.pools.len();
        self.pools.push(PoolInfo {
            recipient,
            weight,
            last_settled_block: self.started.then_some(now),
        });
        self.events.push(EmitterEvent::PoolAdded {
            pool_id,
            recipient,
            weight,
        });
        debug!(pool_id, weight, "emitter: pool added");
        Ok(pool_id)
    }

    /// Change a pool's weight. Admin only.
    ///
    /// Does not settle the pool: the entire unsettled interval will be
    /// priced at the new weight when the pool next settles.
    pub fn set_weight(
        &mut self,
        caller: AccountId,
        pool_id: usize,
        weight: u64,
    ) -> Result<(), EmitterError> {
        self.ensure_admin(caller)?;
        let old = self
            .pools
            .get(pool_id)
            .ok_or(EmitterError::UnknownPool(pool_id))?
            .weight;
        self.total_weight = self
            .total_weight
            .checked_sub(old)
            .and_then(|w| w.checked_add(weight))
            .ok_or(EmitterError::ArithmeticOverflow)?;
        self.pools[pool_id].weight = weight;
        self.events.push(EmitterEvent::WeightSet { pool_id, weight });
        debug!(pool_id, weight, "emitter: weight set");
        Ok(())
    }

    /// Begin emission. Admin only, one-shot.
    ///
    /// Stamps every existing pool's checkpoint with the current block.
    pub fn start(&mut self, caller: AccountId, now: u64) -> Result<(), EmitterError> {
        self.ensure_admin(caller)?;
        if self.started {
            return Err(EmitterError::AlreadyStarted);
        }
        self.started = true;
        for pool in &mut self.pools {
            pool.last_settled_block = Some(now);
        }
        self.events.push(EmitterEvent::Started { block: now });
        info!(block = now, "emitter: started");
        Ok(())
    }

    /// Amount a settle at block `now` would mint to `pool_id`. Pure view.
    pub fn pending(&self, now: u64, pool_id: usize) -> Result<u64, EmitterError> {
        let pool = self
            .pools
            .get(pool_id)
            .ok_or(EmitterError::UnknownPool(pool_id))?;
        let Some(last) = pool.last_settled_block else {
            return Ok(0);
        };
        if now <= last || self.total_weight == 0 {
            return Ok(0);
        }
        let amount = (self.emission_per_block as u128)
            .checked_mul((now - last) as u128)
            .and_then(|v| v.checked_mul(pool.weight as u128))
            .ok_or(EmitterError::ArithmeticOverflow)?
            / self.total_weight as u128;
        u64::try_from(amount).map_err(|_| EmitterError::ArithmeticOverflow)
    }

    /// Mint the pending amount to the pool's recipient and advance its
    /// checkpoint. Callable by anyone; a repeat call in the same block
    /// mints nothing. Returns the minted amount.
    pub fn settle(
        &mut self,
        ledger: &mut dyn CurrencyLedger,
        now: u64,
        pool_id: usize,
    ) -> Result<u64, EmitterError> {
        let amount = self.pending(now, pool_id)?;
        let pool = &mut self.pools[pool_id];
        let Some(last) = pool.last_settled_block else {
            return Ok(0);
        };
        if now <= last {
            return Ok(0);
        }
        // Checkpoint before the mint call.
        pool.last_settled_block = Some(now);
        if amount > 0 {
            let recipient = pool.recipient;
            ledger.mint(self.account, recipient, amount)?;
            debug!(pool_id, amount, "emitter: pool settled");
        }
        Ok(amount)
    }

    /// Change the per-block emission rate. Admin only.
    ///
    /// Settles every pool at the old rate first, so no interval is ever
    /// priced across two rates.
    pub fn set_emission_per_block(
        &mut self,
        caller: AccountId,
        ledger: &mut dyn CurrencyLedger,
        now: u64,
        emission_per_block: u64,
    ) -> Result<(), EmitterError> {
        self.ensure_admin(caller)?;
        for pool_id in 0..self.pools.len() {
            self.settle(ledger, now, pool_id)?;
        }
        self.emission_per_block = emission_per_block;
        self.events
            .push(EmitterEvent::EmissionRateSet { emission_per_block });
        info!(emission_per_block, "emitter: emission rate changed");
        Ok(())
    }

    /// Number of pools ever added.
    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    /// Pool state by id.
    pub fn pool(&self, pool_id: usize) -> Result<&PoolInfo, EmitterError> {
        self.pools
            .get(pool_id)
            .ok_or(EmitterError::UnknownPool(pool_id))
    }

    /// Sum of all pool weights.
    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }

    /// Whether [`start`](Self::start) has run.
    pub fn started(&self) -> bool {
        self.started
    }

    /// Current per-block emission rate.
    pub fn emission_per_block(&self) -> u64 {
        self.emission_per_block
    }

    /// The account this schedule mints under.
    pub fn account(&self) -> AccountId {
        self.account
    }

    /// Drain the event journal.
    pub fn take_events(&mut self) -> Vec<EmitterEvent> {
        std::mem::take(&mut self.events)
    }
}
