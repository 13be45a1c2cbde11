//! Session domain module.
//!
//! - `model`: one running Power Hour and its final snapshot
//! - `rep_stats`: per-rep counters and the streak window

mod model;
mod rep_stats;

pub use model::{
    EventOutcome, Session, SessionRecord, SessionRules, SessionSnapshot, SessionStatus, StopReason,
};
pub use rep_stats::{RECENT_CAPACITY, RepStats};
