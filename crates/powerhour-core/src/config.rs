//! Configuration values consumed by the session engine.
//!
//! Every field has a default so a partial (or missing) config file still
//! produces a working engine. Loading from disk lives in the infrastructure
//! crate; this module only describes the shape and validates it.

use crate::error::{PowerHourError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// HubSpot stage id for "Demo Scheduled".
pub const DEFAULT_DEMO_STAGE_ID: &str = "098183b8-daf7-4145-b7af-17dd19c077f9";

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PowerHourConfig {
    /// Duration used when `start` is issued without minutes
    pub default_duration_minutes: u32,
    /// Allowlist of rep names; empty means everybody counts
    pub roster: Vec<String>,
    pub team_goal: TeamGoalConfig,
    pub demo_streak: StreakRule,
    pub conversation_streak: StreakRule,
    /// Calls at or above this length count as conversations
    pub conversation_min_seconds: u64,
    pub inactivity: InactivityConfig,
    pub refresh_interval_minutes: u32,
    /// How long before the end the final-push alert fires
    pub final_push_lead_minutes: u32,
    /// Gaps at or below this are announced as a close race
    pub close_race_gap: u32,
    /// CRM stage id that marks a deal as "demo scheduled"
    pub demo_stage_id: String,
    /// CRM owner id -> display name
    pub owners: HashMap<String, String>,
    /// Number of upstream event keys remembered for de-duplication
    pub dedup_capacity: usize,
    /// Post a call-out for every dial
    pub announce_dials: bool,
    /// Search term used for the demo celebration GIF
    pub celebration_query: String,
    pub log_level: String,
}

impl Default for PowerHourConfig {
    fn default() -> Self {
        Self {
            default_duration_minutes: 60,
            roster: Vec::new(),
            team_goal: TeamGoalConfig::default(),
            demo_streak: StreakRule::demos(),
            conversation_streak: StreakRule::conversations(),
            conversation_min_seconds: 120,
            inactivity: InactivityConfig::default(),
            refresh_interval_minutes: 10,
            final_push_lead_minutes: 10,
            close_race_gap: 5,
            demo_stage_id: DEFAULT_DEMO_STAGE_ID.to_string(),
            owners: HashMap::new(),
            dedup_capacity: 1024,
            announce_dials: true,
            celebration_query: "celebration".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl PowerHourConfig {
    /// Rejects values that would make the scheduler spin or the commentary
    /// fire on every event.
    pub fn validate(&self) -> Result<()> {
        if self.default_duration_minutes == 0 {
            return Err(PowerHourError::config(
                "default_duration_minutes must be at least 1",
            ));
        }
        if self.refresh_interval_minutes == 0 {
            return Err(PowerHourError::config(
                "refresh_interval_minutes must be at least 1",
            ));
        }
        if self.inactivity.sweep_interval_minutes == 0 {
            return Err(PowerHourError::config(
                "inactivity.sweep_interval_minutes must be at least 1",
            ));
        }
        for (name, rule) in [
            ("demo_streak", &self.demo_streak),
            ("conversation_streak", &self.conversation_streak),
        ] {
            if rule.threshold == 0 || rule.window_minutes == 0 {
                return Err(PowerHourError::config(format!(
                    "{name} needs a non-zero threshold and window"
                )));
            }
        }
        if self.team_goal.demo_threshold == 0 {
            return Err(PowerHourError::config(
                "team_goal.demo_threshold must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Team-wide demo goal. Only announced when a reward is configured.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct TeamGoalConfig {
    pub demo_threshold: u32,
    pub reward: Option<String>,
}

impl Default for TeamGoalConfig {
    fn default() -> Self {
        Self {
            demo_threshold: 12,
            reward: None,
        }
    }
}

/// `threshold` activities of one kind inside the trailing `window_minutes`
/// make a hot streak.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakRule {
    pub threshold: usize,
    pub window_minutes: u32,
}

impl StreakRule {
    pub const fn demos() -> Self {
        Self {
            threshold: 2,
            window_minutes: 20,
        }
    }

    pub const fn conversations() -> Self {
        Self {
            threshold: 5,
            window_minutes: 30,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct InactivityConfig {
    pub threshold_minutes: u32,
    pub sweep_interval_minutes: u32,
}

impl Default for InactivityConfig {
    fn default() -> Self {
        Self {
            threshold_minutes: 15,
            sweep_interval_minutes: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_behavior() {
        let config = PowerHourConfig::default();
        assert_eq!(config.default_duration_minutes, 60);
        assert_eq!(config.demo_streak, StreakRule { threshold: 2, window_minutes: 20 });
        assert_eq!(
            config.conversation_streak,
            StreakRule { threshold: 5, window_minutes: 30 }
        );
        assert_eq!(config.inactivity.threshold_minutes, 15);
        assert_eq!(config.inactivity.sweep_interval_minutes, 5);
        assert_eq!(config.refresh_interval_minutes, 10);
        assert_eq!(config.team_goal.demo_threshold, 12);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: PowerHourConfig = toml::from_str(
            r#"
            roster = ["Alice", "Bob"]

            [team_goal]
            reward = "Lunch"
            "#,
        )
        .unwrap();

        assert_eq!(config.roster, vec!["Alice", "Bob"]);
        assert_eq!(config.team_goal.reward.as_deref(), Some("Lunch"));
        assert_eq!(config.team_goal.demo_threshold, 12);
        assert_eq!(config.refresh_interval_minutes, 10);
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let config = PowerHourConfig {
            refresh_interval_minutes: 0,
            ..PowerHourConfig::default()
        };
        assert!(matches!(config.validate(), Err(PowerHourError::Config(_))));
    }
}
