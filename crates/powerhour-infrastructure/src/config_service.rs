//! Configuration service implementation.
//!
//! Loads `PowerHourConfig` from a TOML file and layers environment overrides
//! on top. Path resolution order:
//!
//! 1. an explicit path handed to [`ConfigService::with_path`]
//! 2. the `POWERHOUR_CONFIG` environment variable
//! 3. `<config dir>/powerhour/config.toml`
//!
//! A missing file is not an error; the defaults are used instead.

use powerhour_core::config::PowerHourConfig;
use powerhour_core::error::{PowerHourError, Result};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

pub const CONFIG_PATH_ENV: &str = "POWERHOUR_CONFIG";
pub const ROSTER_ENV: &str = "POWERHOUR_ROSTER";
pub const DEFAULT_DURATION_ENV: &str = "POWERHOUR_DEFAULT_DURATION";
pub const TEAM_GOAL_REWARD_ENV: &str = "POWERHOUR_TEAM_GOAL_REWARD";
pub const LOG_LEVEL_ENV: &str = "POWERHOUR_LOG_LEVEL";

const APP_DIR: &str = "powerhour";
const CONFIG_FILE: &str = "config.toml";

/// Loads and caches the engine configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigService {
    path: Option<PathBuf>,
    /// Populated on first successful load
    config: Arc<RwLock<Option<PowerHourConfig>>>,
}

impl ConfigService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pins the config file, bypassing `POWERHOUR_CONFIG` and the default
    /// location.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            config: Arc::default(),
        }
    }

    /// The file this service reads, if one can be determined.
    pub fn config_path(&self) -> Option<PathBuf> {
        resolve_path(self.path.as_deref(), |key| std::env::var(key).ok())
    }

    /// Returns the validated configuration, loading it on first use.
    pub fn get_config(&self) -> Result<PowerHourConfig> {
        {
            let cached = self.config.read().unwrap_or_else(|e| e.into_inner());
            if let Some(config) = cached.as_ref() {
                return Ok(config.clone());
            }
        }

        let loaded = self.load()?;
        *self.config.write().unwrap_or_else(|e| e.into_inner()) = Some(loaded.clone());
        Ok(loaded)
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        *self.config.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    fn load(&self) -> Result<PowerHourConfig> {
        let mut config = match self.config_path() {
            Some(path) => load_file(&path)?,
            None => {
                tracing::debug!(target: "config", "[ConfigService] No config directory, using defaults");
                PowerHourConfig::default()
            }
        };
        apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }
}

/// Reads one TOML file. Missing files yield the defaults.
pub fn load_file(path: &Path) -> Result<PowerHourConfig> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            tracing::info!(target: "config", "[ConfigService] Loaded config from {}", path.display());
            Ok(toml::from_str(&content)?)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(
                target: "config",
                "[ConfigService] {} not found, using defaults",
                path.display()
            );
            Ok(PowerHourConfig::default())
        }
        Err(e) => Err(e.into()),
    }
}

pub(crate) fn resolve_path(
    explicit: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = env(CONFIG_PATH_ENV).filter(|p| !p.trim().is_empty()) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}

/// Layers `POWERHOUR_*` variables over a loaded config. Blank values are
/// ignored.
pub fn apply_env_overrides(
    config: &mut PowerHourConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    let var = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    if let Some(roster) = var(ROSTER_ENV) {
        config.roster = roster
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
    }
    if let Some(minutes) = var(DEFAULT_DURATION_ENV) {
        config.default_duration_minutes = minutes.parse().map_err(|_| {
            PowerHourError::config(format!("{DEFAULT_DURATION_ENV} must be a whole number, got '{minutes}'"))
        })?;
    }
    if let Some(reward) = var(TEAM_GOAL_REWARD_ENV) {
        config.team_goal.reward = Some(reward);
    }
    if let Some(level) = var(LOG_LEVEL_ENV) {
        config.log_level = level;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_explicit_path_wins() {
        let env = env_of(&[(CONFIG_PATH_ENV, "/from/env.toml")]);
        let path = resolve_path(Some(Path::new("/explicit.toml")), env);
        assert_eq!(path, Some(PathBuf::from("/explicit.toml")));
    }

    #[test]
    fn test_env_path_used_without_explicit() {
        let env = env_of(&[(CONFIG_PATH_ENV, "/from/env.toml")]);
        assert_eq!(resolve_path(None, env), Some(PathBuf::from("/from/env.toml")));
    }

    #[test]
    fn test_default_path_ends_with_app_dir() {
        if let Some(path) = resolve_path(None, env_of(&[])) {
            assert!(path.ends_with("powerhour/config.toml"));
        }
    }

    #[test]
    fn test_env_overrides() {
        let mut config = PowerHourConfig::default();
        let env = env_of(&[
            (ROSTER_ENV, "Alice, Bob ,,Cara"),
            (DEFAULT_DURATION_ENV, "45"),
            (TEAM_GOAL_REWARD_ENV, "Pizza"),
            (LOG_LEVEL_ENV, "debug"),
        ]);
        apply_env_overrides(&mut config, env).unwrap();

        assert_eq!(config.roster, vec!["Alice", "Bob", "Cara"]);
        assert_eq!(config.default_duration_minutes, 45);
        assert_eq!(config.team_goal.reward.as_deref(), Some("Pizza"));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_blank_override_is_ignored() {
        let mut config = PowerHourConfig {
            roster: vec!["Alice".to_string()],
            ..PowerHourConfig::default()
        };
        apply_env_overrides(&mut config, env_of(&[(ROSTER_ENV, "  ")])).unwrap();
        assert_eq!(config.roster, vec!["Alice"]);
    }

    #[test]
    fn test_bad_duration_override_is_config_error() {
        let mut config = PowerHourConfig::default();
        let err = apply_env_overrides(&mut config, env_of(&[(DEFAULT_DURATION_ENV, "soon")]))
            .unwrap_err();
        assert!(matches!(err, PowerHourError::Config(_)));
    }
}
