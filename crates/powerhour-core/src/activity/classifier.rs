//! Turns raw telephony and CRM notifications into [`ActivityEvent`]s.
//!
//! The classifier never fails loudly: malformed payloads come back as
//! `PowerHourError::MalformedEvent` for the caller to log and drop, and
//! payloads that are well-formed but irrelevant come back as
//! [`Classification::Ignored`].

use super::model::{Activity, ActivityEvent};
use super::roster::Roster;
use crate::config::PowerHourConfig;
use crate::error::{PowerHourError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const CALL_CREATED: &str = "call.created";
pub const CALL_ANSWERED: &str = "call.answered";
pub const CALL_ENDED: &str = "call.ended";
pub const DEAL_STAGE_PROPERTY: &str = "dealstage";

const DEFAULT_DEAL_NAME: &str = "a new client";

/// Telephony webhook body: `{event, data: {user: {name}, duration, ...}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct TelephonyNotification {
    pub event: String,
    #[serde(default)]
    pub data: CallData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallData {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub user: Option<CallUser>,
    #[serde(default)]
    pub duration: Option<Value>,
    #[serde(default)]
    pub started_at: Option<i64>,
    #[serde(default)]
    pub answered_at: Option<i64>,
    #[serde(default)]
    pub ended_at: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallUser {
    #[serde(default)]
    pub name: Option<String>,
}

/// One CRM property-change notification.
///
/// Accepts both the distilled field names (`dealId`, `newValue`) and the
/// HubSpot webhook ones (`objectId`, `propertyValue`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealStageChange {
    #[serde(alias = "objectId", deserialize_with = "id_string")]
    pub deal_id: String,
    pub property_name: String,
    #[serde(default, alias = "propertyValue")]
    pub new_value: Option<String>,
}

/// Deal detail as returned by the CRM lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealDetail {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub properties: DealProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealProperties {
    #[serde(default)]
    pub dealname: Option<String>,
    #[serde(default)]
    pub hubspot_owner_id: Option<String>,
    #[serde(default)]
    pub dealstage: Option<String>,
}

/// Why a well-formed notification produced no events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    UnhandledEvent(String),
    ShortCall { duration_secs: u64 },
    NotOnRoster(String),
    NotDemoStage(Option<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Events(Vec<ActivityEvent>),
    Ignored(IgnoreReason),
}

impl Classification {
    pub fn into_events(self) -> Vec<ActivityEvent> {
        match self {
            Classification::Events(events) => events,
            Classification::Ignored(_) => Vec::new(),
        }
    }
}

/// Stateless mapper from upstream payloads to activity events.
#[derive(Debug, Clone)]
pub struct Classifier {
    roster: Roster,
    conversation_min_seconds: u64,
    demo_stage_id: String,
}

impl Classifier {
    pub fn new(roster: Roster, conversation_min_seconds: u64, demo_stage_id: impl Into<String>) -> Self {
        Self {
            roster,
            conversation_min_seconds,
            demo_stage_id: demo_stage_id.into(),
        }
    }

    pub fn from_config(config: &PowerHourConfig) -> Self {
        Self::new(
            Roster::new(config.roster.iter().cloned()),
            config.conversation_min_seconds,
            config.demo_stage_id.clone(),
        )
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Classifies a telephony webhook body.
    ///
    /// - `call.created` -> dial (+ connection when already answered)
    /// - `call.answered` -> connection
    /// - `call.ended` at or above the conversation threshold -> conversation
    pub fn classify_call(&self, payload: &Value, received_at: DateTime<Utc>) -> Result<Classification> {
        let notification: TelephonyNotification = serde_json::from_value(payload.clone())
            .map_err(|e| PowerHourError::malformed(format!("telephony payload: {e}")))?;
        let data = &notification.data;

        let raw_name = data
            .user
            .as_ref()
            .and_then(|u| u.name.as_deref())
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| {
                PowerHourError::malformed(format!("{} without user name", notification.event))
            })?;

        let Some(actor) = self.roster.canonical(raw_name) else {
            return Ok(Classification::Ignored(IgnoreReason::NotOnRoster(
                raw_name.to_string(),
            )));
        };

        let call_id = data.id.as_ref().and_then(value_to_id);
        let stamp = |secs: Option<i64>| {
            secs.and_then(|s| DateTime::from_timestamp(s, 0))
                .unwrap_or(received_at)
        };
        let tag = |event: ActivityEvent| match &call_id {
            Some(id) => event.with_source_id(format!("call-{id}")),
            None => event,
        };

        let events = match notification.event.as_str() {
            CALL_CREATED => {
                let mut events = vec![tag(ActivityEvent::dial(&actor, stamp(data.started_at)))];
                if data.answered_at.is_some() {
                    events.push(tag(ActivityEvent::connection(
                        &actor,
                        stamp(data.answered_at),
                    )));
                }
                events
            }
            CALL_ANSWERED => vec![tag(ActivityEvent::connection(
                &actor,
                stamp(data.answered_at),
            ))],
            CALL_ENDED => {
                let duration_secs = parse_duration(data.duration.as_ref())?;
                if duration_secs < self.conversation_min_seconds {
                    return Ok(Classification::Ignored(IgnoreReason::ShortCall {
                        duration_secs,
                    }));
                }
                vec![tag(ActivityEvent::conversation(
                    &actor,
                    stamp(data.ended_at),
                    duration_secs,
                ))]
            }
            other => {
                return Ok(Classification::Ignored(IgnoreReason::UnhandledEvent(
                    other.to_string(),
                )));
            }
        };

        Ok(Classification::Events(events))
    }

    /// Parses a CRM webhook body, which is either one change or an array of them.
    pub fn parse_deal_changes(payload: &Value) -> Result<Vec<DealStageChange>> {
        let items: Vec<Value> = match payload {
            Value::Array(items) => items.clone(),
            Value::Object(_) => vec![payload.clone()],
            other => {
                return Err(PowerHourError::malformed(format!(
                    "CRM payload must be an object or array, got {other}"
                )));
            }
        };

        items
            .into_iter()
            .map(|item| {
                serde_json::from_value(item)
                    .map_err(|e| PowerHourError::malformed(format!("deal change: {e}")))
            })
            .collect()
    }

    /// Only stage changes are worth a deal lookup.
    pub fn is_stage_change(&self, change: &DealStageChange) -> bool {
        change.property_name == DEAL_STAGE_PROPERTY
    }

    /// Classifies a fetched deal. `owner_name` is the directory lookup result
    /// for the deal owner, if any.
    pub fn classify_deal(
        &self,
        detail: &DealDetail,
        owner_name: Option<&str>,
        received_at: DateTime<Utc>,
    ) -> Result<Classification> {
        let props = &detail.properties;
        if props.dealstage.as_deref() != Some(self.demo_stage_id.as_str()) {
            return Ok(Classification::Ignored(IgnoreReason::NotDemoStage(
                props.dealstage.clone(),
            )));
        }

        let owner_id = props
            .hubspot_owner_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| PowerHourError::malformed("demo deal without owner"))?;
        let raw_name = owner_name
            .map(str::to_string)
            .unwrap_or_else(|| format!("Owner {owner_id}"));

        let Some(actor) = self.roster.canonical(&raw_name) else {
            return Ok(Classification::Ignored(IgnoreReason::NotOnRoster(raw_name)));
        };

        let deal_name = props
            .dealname
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_DEAL_NAME);

        let mut event = ActivityEvent::new(
            actor,
            received_at,
            Activity::Demo {
                deal_name: deal_name.to_string(),
            },
        );
        if let Some(id) = &detail.id {
            event = event.with_source_id(format!("deal-{id}"));
        }
        Ok(Classification::Events(vec![event]))
    }
}

fn value_to_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_duration(value: Option<&Value>) -> Result<u64> {
    match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
            .ok_or_else(|| PowerHourError::malformed(format!("negative duration {n}"))),
        Some(other) => Err(PowerHourError::malformed(format!(
            "non-numeric duration {other}"
        ))),
        None => Err(PowerHourError::malformed("call.ended without duration")),
    }
}

fn id_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    value_to_id(&value).ok_or_else(|| serde::de::Error::custom("deal id must be a string or number"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::ActivityKind;
    use serde_json::json;

    fn classifier() -> Classifier {
        Classifier::new(Roster::new(["Alice", "Bob"]), 120, "demo-stage")
    }

    fn kinds(c: Classification) -> Vec<ActivityKind> {
        c.into_events().iter().map(|e| e.kind()).collect()
    }

    #[test]
    fn test_call_created_is_a_dial() {
        let payload = json!({"event": "call.created", "data": {"id": 1, "user": {"name": "alice"}}});
        let result = classifier().classify_call(&payload, Utc::now()).unwrap();
        let events = result.into_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind(), ActivityKind::Dial);
        assert_eq!(events[0].actor, "Alice");
        assert_eq!(events[0].source_id.as_deref(), Some("call-1"));
    }

    #[test]
    fn test_answered_call_created_adds_connection() {
        let payload = json!({
            "event": "call.created",
            "data": {"user": {"name": "Bob"}, "started_at": 1_700_000_000, "answered_at": 1_700_000_005}
        });
        let result = classifier().classify_call(&payload, Utc::now()).unwrap();
        assert_eq!(kinds(result), vec![ActivityKind::Dial, ActivityKind::Connection]);
    }

    #[test]
    fn test_call_answered_uses_payload_timestamp() {
        let payload = json!({
            "event": "call.answered",
            "data": {"user": {"name": "Bob"}, "answered_at": 1_700_000_000}
        });
        let events = classifier()
            .classify_call(&payload, Utc::now())
            .unwrap()
            .into_events();
        assert_eq!(events[0].occurred_at.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_call_ended_threshold() {
        let long = json!({"event": "call.ended", "data": {"user": {"name": "Alice"}, "duration": 120}});
        let short = json!({"event": "call.ended", "data": {"user": {"name": "Alice"}, "duration": 119}});

        let result = classifier().classify_call(&long, Utc::now()).unwrap();
        assert_eq!(kinds(result), vec![ActivityKind::Conversation]);

        let result = classifier().classify_call(&short, Utc::now()).unwrap();
        assert_eq!(
            result,
            Classification::Ignored(IgnoreReason::ShortCall { duration_secs: 119 })
        );
    }

    #[test]
    fn test_non_roster_actor_is_ignored() {
        let payload = json!({"event": "call.created", "data": {"user": {"name": "Mallory"}}});
        let result = classifier().classify_call(&payload, Utc::now()).unwrap();
        assert_eq!(
            result,
            Classification::Ignored(IgnoreReason::NotOnRoster("Mallory".to_string()))
        );
    }

    #[test]
    fn test_malformed_payloads_are_errors() {
        let c = classifier();
        let missing_user = json!({"event": "call.created", "data": {}});
        let bad_duration = json!({"event": "call.ended", "data": {"user": {"name": "Alice"}, "duration": "long"}});
        let not_an_object = json!("call.created");

        assert!(matches!(
            c.classify_call(&missing_user, Utc::now()),
            Err(PowerHourError::MalformedEvent(_))
        ));
        assert!(matches!(
            c.classify_call(&bad_duration, Utc::now()),
            Err(PowerHourError::MalformedEvent(_))
        ));
        assert!(c.classify_call(&not_an_object, Utc::now()).is_err());
    }

    #[test]
    fn test_parse_deal_changes_accepts_both_shapes() {
        let single = json!({"dealId": "42", "propertyName": "dealstage", "newValue": "demo-stage"});
        let hubspot = json!([{"objectId": 42, "propertyName": "dealstage", "propertyValue": "x"}]);

        let parsed = Classifier::parse_deal_changes(&single).unwrap();
        assert_eq!(parsed[0].deal_id, "42");
        assert_eq!(parsed[0].new_value.as_deref(), Some("demo-stage"));

        let parsed = Classifier::parse_deal_changes(&hubspot).unwrap();
        assert_eq!(parsed[0].deal_id, "42");
        assert!(classifier().is_stage_change(&parsed[0]));
    }

    #[test]
    fn test_classify_deal_requires_demo_stage() {
        let detail = DealDetail {
            id: Some("9".to_string()),
            properties: DealProperties {
                dealname: Some("Acme".to_string()),
                hubspot_owner_id: Some("77".to_string()),
                dealstage: Some("closed-won".to_string()),
            },
        };
        let result = classifier()
            .classify_deal(&detail, Some("Alice"), Utc::now())
            .unwrap();
        assert!(matches!(result, Classification::Ignored(IgnoreReason::NotDemoStage(_))));
    }

    #[test]
    fn test_classify_deal_emits_demo() {
        let detail = DealDetail {
            id: Some("9".to_string()),
            properties: DealProperties {
                dealname: None,
                hubspot_owner_id: Some("77".to_string()),
                dealstage: Some("demo-stage".to_string()),
            },
        };
        let events = classifier()
            .classify_deal(&detail, Some("bob"), Utc::now())
            .unwrap()
            .into_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].actor, "Bob");
        assert_eq!(
            events[0].activity,
            Activity::Demo {
                deal_name: "a new client".to_string()
            }
        );
        assert_eq!(events[0].dedup_key().as_deref(), Some("deal-9:demo"));
    }

    #[test]
    fn test_unknown_owner_falls_back_to_owner_id() {
        let open = Classifier::new(Roster::open(), 120, "demo-stage");
        let detail = DealDetail {
            id: None,
            properties: DealProperties {
                dealname: Some("Acme".to_string()),
                hubspot_owner_id: Some("77".to_string()),
                dealstage: Some("demo-stage".to_string()),
            },
        };
        let events = open.classify_deal(&detail, None, Utc::now()).unwrap().into_events();
        assert_eq!(events[0].actor, "Owner 77");
    }
}
