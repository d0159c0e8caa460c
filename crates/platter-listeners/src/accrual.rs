//! Shared accrual machinery for the listener ledgers.
//!
//! Each ledger is one pool of the emission schedule. Income lands in the
//! ledger's own account; [`SharePool::pull`] detects it as a balance delta
//! and folds it into a running points-per-share accumulator. Income that
//! arrives while the ledger has zero shares is backlog and burns on the
//! spot — the first listener never inherits it.

use platter_core::constants::{BPS_PRECISION, POINTS_PRECISION};
use platter_core::error::ListenerError;
use platter_core::ledger::CurrencyLedger;
use platter_core::types::AccountId;
use platter_emitter::EmissionSchedule;
use platter_turntables::TurntableRegistry;

/// Accumulator state shared by both listener ledger variants.
pub(crate) struct SharePool {
    /// The ledger's own currency account.
    pub account: AccountId,
    /// The ledger's pool id in the emission schedule.
    pub pool_id: usize,
    /// Σ shares over all active entries.
    pub total_shares: u64,
    /// Reward per share, scaled by `POINTS_PRECISION`.
    pub points_per_share: u128,
    /// Own balance at the last accounting point.
    pub tracked_balance: u64,
}

impl SharePool {
    pub fn new(account: AccountId, pool_id: usize) -> Self {
        Self {
            account,
            pool_id,
            total_shares: 0,
            points_per_share: 0,
            tracked_balance: 0,
        }
    }

    /// Settle the ledger's emission pool and account for new income:
    /// distributed over current shares, or burned as backlog when no
    /// shares exist yet.
    pub fn pull(
        &mut self,
        ledger: &mut dyn CurrencyLedger,
        emitter: &mut EmissionSchedule,
        now: u64,
    ) -> Result<(), ListenerError> {
        emitter.settle(ledger, now, self.pool_id)?;
        let balance = ledger.balance_of(self.account);
        let delta = balance.saturating_sub(self.tracked_balance);
        if delta == 0 {
            return Ok(());
        }
        if self.total_shares == 0 {
            ledger.burn(self.account, delta)?;
            self.tracked_balance = ledger.balance_of(self.account);
        } else {
            self.points_per_share = self
                .points_per_share
                .checked_add(
                    (delta as u128)
                        .checked_mul(POINTS_PRECISION)
                        .ok_or(ListenerError::ArithmeticOverflow)?
                        / self.total_shares as u128,
                )
                .ok_or(ListenerError::ArithmeticOverflow)?;
            self.tracked_balance = balance;
        }
        Ok(())
    }

    /// Re-read the true balance after an outflow.
    pub fn sync(&mut self, ledger: &dyn CurrencyLedger) {
        self.tracked_balance = ledger.balance_of(self.account);
    }

    /// Gross pending reward for `shares` against a snapshot.
    pub fn pending_of(&self, shares: u64, snapshot: u128) -> Result<u64, ListenerError> {
        let diff = self
            .points_per_share
            .checked_sub(snapshot)
            .ok_or(ListenerError::ArithmeticOverflow)?;
        u64::try_from(
            (shares as u128)
                .checked_mul(diff)
                .ok_or(ListenerError::ArithmeticOverflow)?
                / POINTS_PRECISION,
        )
        .map_err(|_| ListenerError::ArithmeticOverflow)
    }

    /// Accumulator value a pull at block `now` would produce. Read-only.
    pub fn projected_points(
        &self,
        ledger: &dyn CurrencyLedger,
        emitter: &EmissionSchedule,
        now: u64,
    ) -> Result<u128, ListenerError> {
        if self.total_shares == 0 {
            return Ok(self.points_per_share);
        }
        let unaccounted = ledger
            .balance_of(self.account)
            .saturating_sub(self.tracked_balance);
        let incoming = emitter
            .pending(now, self.pool_id)?
            .checked_add(unaccounted)
            .ok_or(ListenerError::ArithmeticOverflow)?;
        if incoming == 0 {
            return Ok(self.points_per_share);
        }
        self.points_per_share
            .checked_add(
                (incoming as u128)
                    .checked_mul(POINTS_PRECISION)
                    .ok_or(ListenerError::ArithmeticOverflow)?
                    / self.total_shares as u128,
            )
            .ok_or(ListenerError::ArithmeticOverflow)
    }
}

/// Split a gross reward into fee and remainder and move both: the fee goes
/// to the turntable's current owner, or burns if the turntable has been
/// destroyed; the remainder goes to the claimant. Returns `(net, fee)`.
pub(crate) fn distribute(
    ledger: &mut dyn CurrencyLedger,
    registry: &TurntableRegistry,
    pool_account: AccountId,
    claimant: AccountId,
    turntable_id: u64,
    gross: u64,
    fee_bps: u64,
) -> Result<(u64, u64), ListenerError> {
    let fee = u64::try_from((gross as u128) * (fee_bps as u128) / (BPS_PRECISION as u128))
        .map_err(|_| ListenerError::ArithmeticOverflow)?;
    let net = gross - fee;
    if fee > 0 {
        // Live lookup: the fee follows current ownership, never a cached
        // owner.
        match registry.owner_of(turntable_id)? {
            Some(owner) => ledger.transfer(pool_account, owner, fee)?,
            None => ledger.burn(pool_account, fee)?,
        }
    }
    if net > 0 {
        ledger.transfer(pool_account, claimant, net)?;
    }
    Ok((net, fee))
}

/// A turntable must exist and be live to accept new listeners.
pub(crate) fn ensure_live(
    registry: &TurntableRegistry,
    turntable_id: u64,
) -> Result<(), ListenerError> {
    use platter_core::error::TurntableError;
    match registry.owner_of(turntable_id)? {
        Some(_) => Ok(()),
        None => Err(TurntableError::TurntableDestroyed(turntable_id).into()),
    }
}
