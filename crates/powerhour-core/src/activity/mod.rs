//! Activity domain module.
//!
//! - `model`: canonical activity events (`ActivityEvent`, `ActivityKind`)
//! - `roster`: case-insensitive rep allowlist
//! - `classifier`: telephony / CRM payload -> `ActivityEvent`

mod classifier;
mod model;
mod roster;

pub use classifier::{
    CALL_ANSWERED, CALL_CREATED, CALL_ENDED, CallData, CallUser, Classification, Classifier,
    DEAL_STAGE_PROPERTY, DealDetail, DealProperties, DealStageChange, IgnoreReason,
    TelephonyNotification,
};
pub use model::{Activity, ActivityEvent, ActivityKind};
pub use roster::Roster;
