//! Error types for the Power Hour engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for every Power Hour crate.
///
/// User-facing variants (`AlreadyActive`, `NoActiveSession`) are reported back
/// to whoever issued the command. Everything coming from an external
/// collaborator is folded into `UpstreamUnavailable` and logged at the
/// boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerHourError {
    /// A session is already running in the channel
    #[error("A Power Hour is already running in channel '{channel}'")]
    AlreadyActive { channel: String },

    /// No session is running in the channel
    #[error("There is no active Power Hour in channel '{channel}'")]
    NoActiveSession { channel: String },

    /// The classifier could not extract an actor or activity
    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    /// An external collaborator (chat, CRM, telephony, GIF, results log) failed
    #[error("Upstream '{service}' unavailable: {message}")]
    UpstreamUnavailable { service: String, message: String },

    /// A scheduled task ran after its session was removed
    #[error("Scheduled task fired for stopped session in channel '{channel}'")]
    StaleTaskFired { channel: String },

    /// Session duration must be at least one minute
    #[error("Invalid session duration: {0} minutes")]
    InvalidDuration(u32),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (results log, config file)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },
}

impl PowerHourError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    pub fn already_active(channel: impl Into<String>) -> Self {
        Self::AlreadyActive {
            channel: channel.into(),
        }
    }

    pub fn no_active_session(channel: impl Into<String>) -> Self {
        Self::NoActiveSession {
            channel: channel.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedEvent(message.into())
    }

    /// Creates an UpstreamUnavailable error for the named collaborator
    pub fn upstream(service: &str, message: impl Into<String>) -> Self {
        Self::UpstreamUnavailable {
            service: service.to_string(),
            message: message.into(),
        }
    }

    pub fn stale_task(channel: impl Into<String>) -> Self {
        Self::StaleTaskFired {
            channel: channel.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    pub fn is_already_active(&self) -> bool {
        matches!(self, Self::AlreadyActive { .. })
    }

    pub fn is_no_active_session(&self) -> bool {
        matches!(self, Self::NoActiveSession { .. })
    }

    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::UpstreamUnavailable { .. })
    }

    /// Check if this error should be shown to the user who issued a command.
    ///
    /// Everything else is an operator concern and only goes to the log.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::AlreadyActive { .. } | Self::NoActiveSession { .. } | Self::InvalidDuration(_)
        )
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for PowerHourError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for PowerHourError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for PowerHourError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for PowerHourError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, PowerHourError>`.
pub type Result<T> = std::result::Result<T, PowerHourError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_facing_variants() {
        assert!(PowerHourError::already_active("C1").is_user_facing());
        assert!(PowerHourError::no_active_session("C1").is_user_facing());
        assert!(!PowerHourError::upstream("chat", "timeout").is_user_facing());
        assert!(!PowerHourError::malformed("no actor").is_user_facing());
    }

    #[test]
    fn test_io_error_conversion_keeps_kind() {
        let err: PowerHourError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing").into();
        match err {
            PowerHourError::Io { message } => assert!(message.contains("NotFound")),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_display_names_channel() {
        let err = PowerHourError::already_active("C42");
        assert!(err.to_string().contains("C42"));
    }
}
