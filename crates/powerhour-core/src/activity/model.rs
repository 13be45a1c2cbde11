use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The four activity kinds the engine counts.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActivityKind {
    Dial,
    Connection,
    Conversation,
    Demo,
}

impl ActivityKind {
    /// Kinds that move the score (a bare dial does not).
    pub fn is_scoring(self) -> bool {
        !matches!(self, ActivityKind::Dial)
    }
}

/// Kind-specific payload of an activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Activity {
    Dial,
    Connection,
    Conversation { duration_secs: u64 },
    Demo { deal_name: String },
}

impl Activity {
    pub fn kind(&self) -> ActivityKind {
        match self {
            Activity::Dial => ActivityKind::Dial,
            Activity::Connection => ActivityKind::Connection,
            Activity::Conversation { .. } => ActivityKind::Conversation,
            Activity::Demo { .. } => ActivityKind::Demo,
        }
    }
}

/// Canonical, ephemeral activity record produced by the classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEvent {
    /// Rep name, already rewritten to the roster spelling
    pub actor: String,
    pub occurred_at: DateTime<Utc>,
    pub activity: Activity,
    /// Upstream call or deal id, used to drop redelivered notifications
    #[serde(default)]
    pub source_id: Option<String>,
}

impl ActivityEvent {
    pub fn new(actor: impl Into<String>, occurred_at: DateTime<Utc>, activity: Activity) -> Self {
        Self {
            actor: actor.into(),
            occurred_at,
            activity,
            source_id: None,
        }
    }

    pub fn dial(actor: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self::new(actor, at, Activity::Dial)
    }

    pub fn connection(actor: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self::new(actor, at, Activity::Connection)
    }

    pub fn conversation(actor: impl Into<String>, at: DateTime<Utc>, duration_secs: u64) -> Self {
        Self::new(actor, at, Activity::Conversation { duration_secs })
    }

    pub fn demo(actor: impl Into<String>, at: DateTime<Utc>, deal_name: impl Into<String>) -> Self {
        Self::new(
            actor,
            at,
            Activity::Demo {
                deal_name: deal_name.into(),
            },
        )
    }

    pub fn with_source_id(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    pub fn kind(&self) -> ActivityKind {
        self.activity.kind()
    }

    /// Key used by the idempotency cache: one activity kind per upstream object.
    pub fn dedup_key(&self) -> Option<String> {
        self.source_id
            .as_ref()
            .map(|id| format!("{}:{}", id, self.kind()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_dedup_key_includes_kind() {
        let at = Utc::now();
        let dial = ActivityEvent::dial("a", at).with_source_id("call-7");
        let connection = ActivityEvent::connection("a", at).with_source_id("call-7");
        assert_eq!(dial.dedup_key().as_deref(), Some("call-7:dial"));
        assert_ne!(dial.dedup_key(), connection.dedup_key());
        assert_eq!(ActivityEvent::dial("a", at).dedup_key(), None);
    }

    #[test]
    fn test_kind_parses_from_snake_case() {
        assert_eq!(ActivityKind::from_str("conversation").unwrap(), ActivityKind::Conversation);
        assert_eq!(ActivityKind::Demo.to_string(), "demo");
    }
}
