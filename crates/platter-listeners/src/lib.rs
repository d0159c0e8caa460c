//! # platter-listeners
//! Secondary distribution ledgers: claimants stake a key against a
//! turntable and share the ledger's emission income pro rata, with a fee
//! skimmed to the turntable's live owner on every claim.
//!
//! Two variants with identical semantics, differing only in the share
//! unit: [`UniqueListenerLedger`] stakes unique token ids (one share
//! each), [`StakedListenerLedger`] stakes a fungible token amount.

mod accrual;
pub mod staked;
pub mod unique;

pub use staked::{StakedEntry, StakedListenerEvent, StakedListenerLedger};
pub use unique::{UniqueEntry, UniqueListenerEvent, UniqueListenerLedger};
