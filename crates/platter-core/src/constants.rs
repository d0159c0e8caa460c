//! Protocol constants. All monetary values in units (1 PLAT = 10^8 units).

pub const COIN: u64 = 100_000_000;

/// Basis-point denominator shared by every bps-scaled parameter.
pub const BPS_PRECISION: u64 = 10_000;

/// Fraction of any burned amount redirected to the fee sink by the currency
/// ledger itself, in basis points (0.30%).
pub const BURN_TAX_BPS: u64 = 30;

/// Fixed-point denominator for the reward-per-share / reward-per-volume
/// accumulators. Accumulators are `u128`; a `u64` reward delta times this
/// precision always fits.
pub const POINTS_PRECISION: u128 = 1_000_000_000_000;

/// Default listener-claim fee paid to a turntable's owner (3.00%).
pub const DEFAULT_TURNTABLE_FEE_BPS: u64 = 300;
