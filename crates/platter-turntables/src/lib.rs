//! # platter-turntables
//! The decaying asset registry: sells time-limited, rechargeable,
//! weight-bearing turntables whose accrued emission splits into an earned
//! part (paid to the owner) and an expired part (burned).

pub mod registry;

pub use registry::{Turntable, TurntableEvent, TurntableRegistry, TurntableType};
