//! # platter-core
//! Shared types, constants, and error enums for the Platter ledgers, plus
//! the external token interfaces the ledgers consume (currency, unique-id
//! tokens, fungible stake tokens) and in-memory implementations for testing.

pub mod constants;
pub mod error;
pub mod ledger;
pub mod tokens;
pub mod types;
