//! Core identifier types.
//!
//! All monetary values are `u64` units (1 PLAT = 10^8 units); all block
//! heights are `u64`. Accounts are opaque 32-byte identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 32-byte account identifier.
///
/// Components (the emission schedule, the turntable registry, the listener
/// ledgers) hold balances under their own `AccountId` exactly like user
/// accounts do.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
)]
pub struct AccountId(pub [u8; 32]);

impl AccountId {
    /// Create an AccountId from a byte array.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// An account filled with a single repeated byte. Handy for tests and
    /// fixtures; real deployments derive accounts elsewhere.
    pub fn from_seed(seed: u8) -> Self {
        Self([seed; 32])
    }

    /// Return the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl From<[u8; 32]> for AccountId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for AccountId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
