//! # platter-emitter
//! The emission scheduler: a weighted list of recipient pools, each lazily
//! settled against the per-block emission rate.

pub mod schedule;

pub use schedule::{EmissionSchedule, EmitterEvent, PoolInfo};
