pub mod activity;
pub mod clock;
pub mod commentary;
pub mod config;
pub mod digest;
pub mod error;
pub mod ports;
pub mod scoring;
pub mod session;

// Re-export common types
pub use config::PowerHourConfig;
pub use error::{PowerHourError, Result};
