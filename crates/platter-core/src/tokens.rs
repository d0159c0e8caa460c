//! Staking-token interfaces for the listener ledgers.
//!
//! Listeners stake either a unique-id token (one share per id) or a
//! fungible stake token (shares equal to the staked amount). Both are
//! external collaborators consumed through minimal traits, with in-memory
//! implementations for testing.

use std::collections::HashMap;

use crate::error::TokenError;
use crate::types::AccountId;

/// Ownership lookup for a unique-id token collection.
pub trait UniqueToken {
    /// Current holder of `id`, or `None` if the id does not exist or has
    /// been burned.
    fn owner_of(&self, id: u64) -> Option<AccountId>;
}

/// Minimal fungible stake-token surface.
pub trait StakeToken {
    /// Current balance of `who`. Unknown accounts hold zero.
    fn balance_of(&self, who: AccountId) -> u64;

    /// Move `amount` from `from` to `to`.
    fn transfer(&mut self, from: AccountId, to: AccountId, amount: u64) -> Result<(), TokenError>;
}

/// In-memory unique-id token for testing.
pub struct MemoryNft {
    owners: HashMap<u64, AccountId>,
    next_id: u64,
}

impl MemoryNft {
    pub fn new() -> Self {
        Self {
            owners: HashMap::new(),
            next_id: 0,
        }
    }

    /// Mint a fresh id to `to`. Ids are monotonic and never reused.
    pub fn mint(&mut self, to: AccountId) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.owners.insert(id, to);
        id
    }

    /// Transfer `id` from its current holder.
    pub fn transfer(
        &mut self,
        from: AccountId,
        to: AccountId,
        id: u64,
    ) -> Result<(), TokenError> {
        match self.owners.get_mut(&id) {
            Some(owner) if *owner == from => {
                *owner = to;
                Ok(())
            }
            Some(_) => Err(TokenError::NotTokenHolder(id)),
            None => Err(TokenError::UnknownToken(id)),
        }
    }

    /// Burn `id` permanently.
    pub fn burn(&mut self, id: u64) -> Result<(), TokenError> {
        self.owners
            .remove(&id)
            .map(|_| ())
            .ok_or(TokenError::UnknownToken(id))
    }
}

impl Default for MemoryNft {
    fn default() -> Self {
        Self::new()
    }
}

impl UniqueToken for MemoryNft {
    fn owner_of(&self, id: u64) -> Option<AccountId> {
        self.owners.get(&id).copied()
    }
}

/// In-memory fungible stake token for testing.
pub struct MemoryStakeToken {
    balances: HashMap<AccountId, u64>,
}

impl MemoryStakeToken {
    pub fn new() -> Self {
        Self {
            balances: HashMap::new(),
        }
    }

    /// Credit `amount` to `to` out of thin air. Test setup only.
    pub fn mint(&mut self, to: AccountId, amount: u64) {
        *self.balances.entry(to).or_insert(0) += amount;
    }
}

impl Default for MemoryStakeToken {
    fn default() -> Self {
        Self::new()
    }
}

impl StakeToken for MemoryStakeToken {
    fn balance_of(&self, who: AccountId) -> u64 {
        self.balances.get(&who).copied().unwrap_or(0)
    }

    fn transfer(&mut self, from: AccountId, to: AccountId, amount: u64) -> Result<(), TokenError> {
        let balance = self.balances.entry(from).or_insert(0);
        if *balance < amount {
            return Err(TokenError::InsufficientBalance {
                have: *balance,
                need: amount,
            });
        }
        *balance -= amount;
        let target = self.balances.entry(to).or_insert(0);
        *target = target.checked_add(amount).ok_or(TokenError::ValueOverflow)?;
        Ok(())
    }
}
