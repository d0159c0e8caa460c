//! Currency ledger interface and in-memory implementation.
//!
//! The currency is an external collaborator: the Platter ledgers consume it
//! through [`CurrencyLedger`] and never reimplement its mechanics. The one
//! behaviour the core depends on is the burn tax: every burn redirects a
//! fixed basis-point fraction of the burned amount to a designated fee sink
//! instead of destroying it.
//!
//! [`MemoryLedger`] is suitable for testing; a production deployment binds
//! this trait to the real currency contract.
//!
//! Authorization model: callers of the Platter ledgers are identified by an
//! explicit `AccountId` argument, and a component invokes `transfer`/`burn`
//! on the caller's behalf only inside an operation that caller initiated.
//! `approve`/`transfer_from` complete the standard fungible surface and are
//! available to external holders.

use std::collections::HashMap;

use crate::constants::{BPS_PRECISION, BURN_TAX_BPS};
use crate::error::LedgerError;
use crate::types::AccountId;

/// Mutable fungible-currency interface.
///
/// Not thread-safe — callers should wrap in a `Mutex` or `RwLock` if
/// concurrent access is needed.
pub trait CurrencyLedger {
    /// Mint `amount` to `to`. Only the authorized minter account may mint.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::NotMinter`] if `minter` is not the authorized minter
    /// - [`LedgerError::ValueOverflow`] if total supply would overflow
    fn mint(&mut self, minter: AccountId, to: AccountId, amount: u64) -> Result<(), LedgerError>;

    /// Burn `amount` from `holder`.
    ///
    /// A `BURN_TAX_BPS / BPS_PRECISION` fraction of `amount` is credited to
    /// the fee sink; the remainder leaves total supply.
    fn burn(&mut self, holder: AccountId, amount: u64) -> Result<(), LedgerError>;

    /// Burn `amount` from `holder` on behalf of `spender`, consuming
    /// allowance. Same tax semantics as [`burn`](Self::burn).
    fn burn_from(
        &mut self,
        spender: AccountId,
        holder: AccountId,
        amount: u64,
    ) -> Result<(), LedgerError>;

    /// Move `amount` from `from` to `to`.
    fn transfer(&mut self, from: AccountId, to: AccountId, amount: u64)
    -> Result<(), LedgerError>;

    /// Move `amount` from `from` to `to` on behalf of `spender`, consuming
    /// allowance.
    fn transfer_from(
        &mut self,
        spender: AccountId,
        from: AccountId,
        to: AccountId,
        amount: u64,
    ) -> Result<(), LedgerError>;

    /// Set `spender`'s allowance over `holder`'s balance.
    fn approve(&mut self, holder: AccountId, spender: AccountId, amount: u64);

    /// Remaining allowance of `spender` over `holder`'s balance.
    fn allowance(&self, holder: AccountId, spender: AccountId) -> u64;

    /// Current balance of `who`. Unknown accounts hold zero.
    fn balance_of(&self, who: AccountId) -> u64;

    /// Total circulating supply.
    fn total_supply(&self) -> u64;
}

/// In-memory currency ledger for testing.
///
/// Stores balances and allowances in `HashMap`s with no persistence.
pub struct MemoryLedger {
    balances: HashMap<AccountId, u64>,
    allowances: HashMap<(AccountId, AccountId), u64>,
    /// The only account allowed to mint. `None` until assigned.
    minter: Option<AccountId>,
    /// Receives the burn tax.
    fee_sink: AccountId,
    total_supply: u64,
}

impl MemoryLedger {
    /// Create an empty ledger taxing burns to `fee_sink`.
    pub fn new(fee_sink: AccountId) -> Self {
        Self {
            balances: HashMap::new(),
            allowances: HashMap::new(),
            minter: None,
            fee_sink,
            total_supply: 0,
        }
    }

    /// Assign the authorized minter (the emission schedule's account).
    pub fn set_minter(&mut self, minter: AccountId) {
        self.minter = Some(minter);
    }

    /// The fee-sink account receiving the burn tax.
    pub fn fee_sink(&self) -> AccountId {
        self.fee_sink
    }

    /// Genesis issuance outside the minter role. Test and deployment setup
    /// only; the emission schedule mints everything else.
    pub fn issue(&mut self, to: AccountId, amount: u64) {
        *self.balances.entry(to).or_insert(0) += amount;
        self.total_supply += amount;
    }

    fn debit(&mut self, from: AccountId, amount: u64) -> Result<(), LedgerError> {
        let balance = self.balances.entry(from).or_insert(0);
        if *balance < amount {
            return Err(LedgerError::InsufficientBalance {
                have: *balance,
                need: amount,
            });
        }
        *balance -= amount;
        Ok(())
    }

    fn credit(&mut self, to: AccountId, amount: u64) -> Result<(), LedgerError> {
        let balance = self.balances.entry(to).or_insert(0);
        *balance = balance.checked_add(amount).ok_or(LedgerError::ValueOverflow)?;
        Ok(())
    }

    fn spend_allowance(
        &mut self,
        holder: AccountId,
        spender: AccountId,
        amount: u64,
    ) -> Result<(), LedgerError> {
        let allowance = self.allowances.entry((holder, spender)).or_insert(0);
        if *allowance < amount {
            return Err(LedgerError::InsufficientAllowance {
                have: *allowance,
                need: amount,
            });
        }
        *allowance -= amount;
        Ok(())
    }

    /// Burn with the fee-sink tax applied. `amount` must already be debited.
    fn burn_debited(&mut self, amount: u64) -> Result<(), LedgerError> {
        let tax = ((amount as u128) * (BURN_TAX_BPS as u128) / (BPS_PRECISION as u128)) as u64;
        self.credit(self.fee_sink, tax)?;
        self.total_supply -= amount - tax;
        Ok(())
    }
}

impl CurrencyLedger for MemoryLedger {
    fn mint(&mut self, minter: AccountId, to: AccountId, amount: u64) -> Result<(), LedgerError> {
        if self.minter != Some(minter) {
            return Err(LedgerError::NotMinter);
        }
        self.total_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(LedgerError::ValueOverflow)?;
        self.credit(to, amount)
    }

    fn burn(&mut self, holder: AccountId, amount: u64) -> Result<(), LedgerError> {
        self.debit(holder, amount)?;
        self.burn_debited(amount)
    }

    fn burn_from(
        &mut self,
        spender: AccountId,
        holder: AccountId,
        amount: u64,
    ) -> Result<(), LedgerError> {
        self.spend_allowance(holder, spender, amount)?;
        self.burn(holder, amount)
    }

    fn transfer(
        &mut self,
        from: AccountId,
        to: AccountId,
        amount: u64,
    ) -> Result<(), LedgerError> {
        self.debit(from, amount)?;
        self.credit(to, amount)
    }

    fn transfer_from(
        &mut self,
        spender: AccountId,
        from: AccountId,
        to: AccountId,
        amount: u64,
    ) -> Result<(), LedgerError> {
        self.spend_allowance(from, spender, amount)?;
        self.transfer(from, to, amount)
    }

    fn approve(&mut self, holder: AccountId, spender: AccountId, amount: u64) {
        self.allowances.insert((holder, spender), amount);
    }

    fn allowance(&self, holder: AccountId, spender: AccountId) -> u64 {
        self.allowances.get(&(holder, spender)).copied().unwrap_or(0)
    }

    fn balance_of(&self, who: AccountId) -> u64 {
        self.balances.get(&who).copied().unwrap_or(0)
    }

    fn total_supply(&self) -> u64 {
        self.total_supply
    }
}
