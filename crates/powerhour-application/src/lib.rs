pub mod commands;
pub mod dedup;
pub mod engine;
pub mod registry;
pub mod render;
pub mod scheduler;

pub use engine::{Collaborators, IngestReport, PowerHourEngine};
pub use registry::{ActiveSession, SessionRegistry};
