//! Infrastructure adapters for the Power Hour engine.
//!
//! - `config_service`: TOML + environment configuration loading
//! - `owner_directory`: static and cached CRM owner lookup
//! - `results_log`: JSON-lines archive of finished sessions
//! - `offline`: stand-ins for CRM, GIF and reporting services
//! - `logging`: tracing subscriber setup

pub mod config_service;
pub mod logging;
pub mod offline;
pub mod owner_directory;
pub mod results_log;

pub use config_service::ConfigService;
pub use offline::{InMemoryDealLookup, NoopGifProvider, UnconfiguredDigestSource};
pub use owner_directory::{CachedOwnerDirectory, StaticOwnerDirectory};
pub use results_log::JsonlResultsSink;
