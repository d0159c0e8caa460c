//! Error types for the Platter ledgers.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("caller is not the authorized minter")] NotMinter,
    #[error("insufficient balance: have {have}, need {need}")] InsufficientBalance { have: u64, need: u64 },
    #[error("insufficient allowance: have {have}, need {need}")] InsufficientAllowance { have: u64, need: u64 },
    #[error("value overflow")] ValueOverflow,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("unknown token: {0}")] UnknownToken(u64),
    #[error("caller does not hold token {0}")] NotTokenHolder(u64),
    #[error("insufficient stake balance: have {have}, need {need}")] InsufficientBalance { have: u64, need: u64 },
    #[error("value overflow")] ValueOverflow,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EmitterError {
    #[error("caller is not the admin")] NotAdmin,
    #[error("unknown pool: {0}")] UnknownPool(usize),
    #[error("emission already started")] AlreadyStarted,
    #[error("arithmetic overflow")] ArithmeticOverflow,
    #[error(transparent)] Ledger(#[from] LedgerError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TurntableError {
    #[error("caller is not the admin")] NotAdmin,
    #[error("unknown type: {0}")] UnknownType(usize),
    #[error("type {0} is not whitelisted")] TypeNotWhitelisted(usize),
    #[error("destroy return {destroy_return} exceeds price {price}")] DestroyReturnExceedsPrice { destroy_return: u64, price: u64 },
    #[error("unknown turntable: {0}")] UnknownTurntable(u64),
    #[error("turntable {0} is destroyed")] TurntableDestroyed(u64),
    #[error("caller does not own turntable {0}")] NotTurntableOwner(u64),
    #[error("charging is disabled")] ChargingDisabled,
    #[error("arithmetic overflow")] ArithmeticOverflow,
    #[error(transparent)] Ledger(#[from] LedgerError),
    #[error(transparent)] Emitter(#[from] EmitterError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ListenerError {
    #[error("caller is not the admin")] NotAdmin,
    #[error("turntable fee too high: {0} bps")] FeeTooHigh(u64),
    #[error("caller does not control the listening key")] NotKeyHolder,
    #[error("key already listening to turntable {0}")] AlreadyListening(u64),
    #[error("key is not listening to turntable {0}")] NotListening(u64),
    #[error("zero shares")] ZeroShares,
    #[error("arithmetic overflow")] ArithmeticOverflow,
    #[error(transparent)] Ledger(#[from] LedgerError),
    #[error(transparent)] Token(#[from] TokenError),
    #[error(transparent)] Emitter(#[from] EmitterError),
    #[error(transparent)] Turntable(#[from] TurntableError),
}

#[derive(Error, Debug)]
pub enum PlatterError {
    #[error(transparent)] Ledger(#[from] LedgerError),
    #[error(transparent)] Token(#[from] TokenError),
    #[error(transparent)] Emitter(#[from] EmitterError),
    #[error(transparent)] Turntable(#[from] TurntableError),
    #[error(transparent)] Listener(#[from] ListenerError),
}
