pub mod check_config;
pub mod replay;

use anyhow::{Context, Result};
use powerhour_core::config::PowerHourConfig;
use powerhour_infrastructure::ConfigService;
use powerhour_infrastructure::logging::init_tracing;
use std::path::PathBuf;

/// Loads the configuration and installs the tracing subscriber at its log
/// level.
pub fn load_config(path: Option<PathBuf>) -> Result<(ConfigService, PowerHourConfig)> {
    let service = match path {
        Some(path) => ConfigService::with_path(path),
        None => ConfigService::new(),
    };
    let config = service.get_config().with_context(|| match service.config_path() {
        Some(path) => format!("Failed to load config from {}", path.display()),
        None => "Failed to load config".to_string(),
    })?;
    init_tracing(&config.log_level);
    Ok((service, config))
}
